use anyhow::{bail, Context, Result};
use reqwest::{Client, Url};
use tracing::debug;

use crate::coin::Coin;
use crate::history::MarketChart;

const ENDPOINT: &str = "https://api.coingecko.com/api/v3";

/// Every price in the app is quoted against this one currency.
pub const VS_CURRENCY: &str = "usd";
/// Lookback window for the price-history chart.
pub const LOOKBACK_DAYS: u32 = 7;
/// Environment variable holding the demo API credential.
pub const API_KEY_VAR: &str = "COINGECKO_API_KEY";

/// CoinGecko REST client. Single-attempt semantics throughout: no retry,
/// no backoff, failures are reported to the caller which degrades the UI.
#[derive(Default, Debug, Clone)]
pub struct Gecko {
    client: Client,
    api_key: Option<String>,
}

impl Gecko {
    /// Builds a client, picking the credential up from the environment.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_key: std::env::var(API_KEY_VAR).ok(),
        }
    }

    pub fn with_api_key(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Fetches one page of the market listing.
    ///
    /// The listing endpoint requires the demo credential; its absence is
    /// a hard error for this call only.
    pub async fn markets(&self, page: u32, per_page: u32) -> Result<Vec<Coin>> {
        let api_key = self
            .api_key
            .as_deref()
            .with_context(|| format!("{API_KEY_VAR} is not set"))?;

        let page = page.to_string();
        let per_page = per_page.to_string();
        let params = [
            ("vs_currency", VS_CURRENCY),
            ("page", page.as_str()),
            ("per_page", per_page.as_str()),
            ("x_cg_demo_api_key", api_key),
        ];
        let url = Url::parse_with_params(format!("{ENDPOINT}/coins/markets").as_str(), &params)
            .context("building markets url")?;

        debug!("GET /coins/markets page={page} per_page={per_page}");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            bail!("markets request failed with status {}", response.status());
        }
        response
            .json::<Vec<Coin>>()
            .await
            .context("decoding markets payload")
    }

    /// Fetches the daily price history of one coin over `days` days.
    pub async fn market_chart(&self, coin_id: &str, days: u32) -> Result<MarketChart> {
        let days = days.to_string();
        let params = [
            ("vs_currency", VS_CURRENCY),
            ("days", days.as_str()),
            ("interval", "daily"),
        ];
        let url = Url::parse_with_params(
            format!("{ENDPOINT}/coins/{coin_id}/market_chart").as_str(),
            &params,
        )
        .context("building market_chart url")?;

        debug!("GET /coins/{coin_id}/market_chart days={days}");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            bail!(
                "market_chart request for {} failed with status {}",
                coin_id,
                response.status()
            );
        }
        response
            .json::<MarketChart>()
            .await
            .context("decoding market_chart payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_markets_requires_credential() {
        let gecko = Gecko::with_api_key(None);
        let err = gecko.markets(1, 10).await.unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }
}
