use itertools::Itertools;
use rust_decimal::Decimal;

use crate::coin::Coin;

/// Row count of the gainers table.
pub const TOP_GAINERS: usize = 5;

/// The coins with the largest positive 24h move, strongest first.
/// Coins that lost ground or moved not at all are excluded even when
/// fewer than five remain.
pub fn top_gainers(coins: &[Coin]) -> Vec<&Coin> {
    coins
        .iter()
        .filter(|coin| coin.price_change_percentage_24h > Decimal::ZERO)
        .sorted_by(|a, b| {
            b.price_change_percentage_24h
                .cmp(&a.price_change_percentage_24h)
        })
        .take(TOP_GAINERS)
        .collect()
}

/// Case-insensitive substring filter over name and symbol. An empty
/// query keeps everything.
pub fn filter_coins<'a>(coins: &'a [Coin], query: &str) -> Vec<&'a Coin> {
    let query = query.to_lowercase();
    coins
        .iter()
        .filter(|coin| {
            coin.name.to_lowercase().contains(&query)
                || coin.symbol.to_lowercase().contains(&query)
        })
        .collect()
}

/// Page window over a (possibly filtered) list. The pager never fetches;
/// it only slices what it is handed, so the list length is passed to
/// every navigation call for clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pager {
    pub page: usize,
    pub per_page: usize,
}

impl Pager {
    pub fn new(per_page: usize) -> Self {
        Self { page: 0, per_page }
    }

    /// Number of pages; an empty list still has one (empty) page.
    pub fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.per_page).max(1)
    }

    fn last_page(&self, len: usize) -> usize {
        self.page_count(len) - 1
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page * self.per_page).min(items.len());
        let end = (start + self.per_page).min(items.len());
        &items[start..end]
    }

    pub fn first(&mut self) {
        self.page = 0;
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn next(&mut self, len: usize) {
        self.page = (self.page + 1).min(self.last_page(len));
    }

    pub fn last(&mut self, len: usize) {
        self.page = self.last_page(len);
    }

    /// Search text changed: back to the first page.
    pub fn reset(&mut self) {
        self.page = 0;
    }

    /// Keeps the window valid after the underlying list shrank.
    pub fn clamp(&mut self, len: usize) {
        self.page = self.page.min(self.last_page(len));
    }
}
