use crate::coin::Coin;
use crate::history::MarketChart;

pub mod coin;
pub mod favorites;
pub mod gecko;
pub mod history;
pub mod store;
pub mod tui;
pub mod views;

/// Events flowing from the fetch tasks into the TUI event loop.
///
/// Errors cross the channel as strings: the loop only renders them,
/// the full cause chain is logged on the fetch side.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Markets(Result<Vec<Coin>, String>),
    Chart {
        coin_id: String,
        result: Result<MarketChart, String>,
    },
}

/// Requests flowing out of the TUI towards the fetch service task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCommand {
    Markets { page: u32, per_page: u32 },
    Chart { coin_id: String },
}
