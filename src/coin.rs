use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One market snapshot from the `/coins/markets` listing.
///
/// A snapshot is immutable once fetched; refetching replaces the whole
/// list rather than patching entries. Identifiers are unique within one
/// fetched list.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub current_price: Decimal,
    #[serde(default)]
    pub market_cap: Decimal,
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Decimal,
    #[serde(default)]
    pub high_24h: Decimal,
    #[serde(default)]
    pub low_24h: Decimal,
    #[serde(default)]
    pub price_change_24h: Decimal,
    #[serde(default)]
    pub price_change_percentage_24h: Decimal,
    #[serde(default)]
    pub market_cap_change_24h: Decimal,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Decimal,
    #[serde(default)]
    pub circulating_supply: Decimal,
    pub total_supply: Option<Decimal>,
    #[serde(default)]
    pub ath: Decimal,
    pub ath_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub atl: Decimal,
    pub atl_date: Option<DateTime<Utc>>,
}

impl Coin {
    /// Ticker symbol the way the tables print it.
    pub fn symbol_upper(&self) -> String {
        self.symbol.to_uppercase()
    }

    pub fn is_gaining(&self) -> bool {
        self.price_change_percentage_24h >= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn bitcoin_json() -> serde_json::Value {
        json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
            "current_price": 67342.0,
            "market_cap": 1325678901234_i64,
            "market_cap_rank": 1,
            "fully_diluted_valuation": 1413678901234_i64,
            "total_volume": 28765432109_i64,
            "high_24h": 68012.0,
            "low_24h": 66110.0,
            "price_change_24h": 812.34,
            "price_change_percentage_24h": 1.22,
            "market_cap_change_24h": 15678901234_i64,
            "market_cap_change_percentage_24h": 1.19,
            "circulating_supply": 19690000.0,
            "total_supply": 21000000.0,
            "max_supply": 21000000.0,
            "ath": 73738.0,
            "ath_change_percentage": -8.67,
            "ath_date": "2024-03-14T07:10:36.635Z",
            "atl": 67.81,
            "atl_change_percentage": 99217.47,
            "atl_date": "2013-07-06T00:00:00.000Z",
            "last_updated": "2024-05-21T09:00:00.000Z"
        })
    }

    #[test]
    fn test_coin_from_markets_payload() {
        let coin: Coin = serde_json::from_value(bitcoin_json()).unwrap();
        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.symbol_upper(), "BTC");
        assert_eq!(coin.current_price, dec!(67342.0));
        assert_eq!(coin.market_cap_rank, Some(1));
        assert_eq!(coin.total_supply, Some(dec!(21000000.0)));
        assert_eq!(coin.ath_date.unwrap().to_rfc3339(), "2024-03-14T07:10:36.635+00:00");
        assert!(coin.is_gaining());
    }

    #[test]
    fn test_coin_tolerates_null_optionals() {
        let mut value = bitcoin_json();
        value["market_cap_rank"] = json!(null);
        value["total_supply"] = json!(null);
        value["ath_date"] = json!(null);
        value["atl_date"] = json!(null);
        let coin: Coin = serde_json::from_value(value).unwrap();
        assert_eq!(coin.market_cap_rank, None);
        assert_eq!(coin.total_supply, None);
        assert!(coin.ath_date.is_none());
    }
}
