use serde::{Deserialize, Serialize};

use crate::coin::Coin;

/// Lifecycle of the shared market listing.
///
/// The list is replaced wholesale on every successful fetch and cleared
/// on failure. Overlapping refetches are not coordinated: whichever
/// response is applied last wins.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub enum MarketData {
    #[default]
    Loading,
    Ready(Vec<Coin>),
    Errored(String),
}

impl MarketData {
    pub fn is_loading(&self) -> bool {
        matches!(self, MarketData::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MarketData::Errored(message) => Some(message),
            _ => None,
        }
    }

    /// The fetched list, empty while loading or errored.
    pub fn coins(&self) -> &[Coin] {
        match self {
            MarketData::Ready(coins) => coins,
            _ => &[],
        }
    }

    pub fn find(&self, coin_id: &str) -> Option<&Coin> {
        self.coins().iter().find(|coin| coin.id == coin_id)
    }

    /// Re-enters the loading state ahead of a (re)fetch.
    pub fn begin_fetch(&mut self) {
        *self = MarketData::Loading;
    }

    pub fn apply(&mut self, result: Result<Vec<Coin>, String>) {
        *self = match result {
            Ok(coins) => MarketData::Ready(coins),
            Err(message) => MarketData::Errored(message),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: &str) -> Coin {
        Coin {
            id: id.to_string(),
            name: id.to_string(),
            symbol: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_loading_then_transitions() {
        let mut market = MarketData::default();
        assert!(market.is_loading());
        assert!(market.coins().is_empty());

        market.apply(Ok(vec![coin("bitcoin"), coin("ethereum")]));
        assert_eq!(market.coins().len(), 2);
        assert!(market.find("ethereum").is_some());
        assert!(market.error().is_none());

        market.begin_fetch();
        assert!(market.is_loading());

        market.apply(Err("cannot fetch data".to_string()));
        assert_eq!(market.error(), Some("cannot fetch data"));
        assert!(market.coins().is_empty());
    }

    #[test]
    fn test_last_applied_response_wins() {
        let mut market = MarketData::default();
        market.apply(Ok(vec![coin("bitcoin")]));
        market.apply(Ok(vec![coin("solana")]));
        assert!(market.find("bitcoin").is_none());
        assert!(market.find("solana").is_some());
    }
}
