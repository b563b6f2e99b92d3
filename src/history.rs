use chrono::DateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 7-day price history for one coin, as returned by the
/// `/coins/{id}/market_chart` endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MarketChart {
    pub prices: Vec<PricePoint>,
}

/// One sample of the series. On the wire this is a two-element array
/// `[unix_millis, price]`, not an object.
#[derive(Clone, Debug, PartialEq)]
pub struct PricePoint {
    pub time_ms: i64,
    pub price: Decimal,
}

impl<'de> Deserialize<'de> for PricePoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (time_ms, price) = <(i64, Decimal)>::deserialize(deserializer)?;
        Ok(Self { time_ms, price })
    }
}

impl Serialize for PricePoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (self.time_ms, self.price).serialize(serializer)
    }
}

/// Label/value pair of sequences shaped for the chart widget, in input
/// order. No resampling or gap filling; an empty series is the caller's
/// cue to render a "no data" placeholder instead of an empty chart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub points: Vec<f64>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl MarketChart {
    /// Shapes the raw series into short weekday labels and f64 prices.
    ///
    /// Timestamps outside the representable range and non-representable
    /// decimals degrade to placeholders rather than dropping samples, so
    /// both sequences stay parallel to the input.
    pub fn series(&self) -> ChartSeries {
        let labels = self
            .prices
            .iter()
            .map(|point| {
                DateTime::from_timestamp_millis(point.time_ms)
                    .map(|date| date.format("%a").to_string())
                    .unwrap_or_else(|| "?".to_string())
            })
            .collect();
        let points = self
            .prices
            .iter()
            .map(|point| point.price.to_f64().unwrap_or(0.0))
            .collect();
        ChartSeries { labels, points }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_market_chart_from_json() {
        let json = json!({
            "prices": [
                [1699920000000_i64, 36500.12],
                [1700006400000_i64, 37012.55],
                [1700092800000_i64, 36890.0]
            ],
            "market_caps": [[1699920000000_i64, 713000000000.0]],
            "total_volumes": [[1699920000000_i64, 21000000000.0]]
        });
        let chart: MarketChart = serde_json::from_value(json).unwrap();
        assert_eq!(chart.prices.len(), 3);
        assert_eq!(chart.prices[1].price, dec!(37012.55));
        assert_eq!(chart.prices[1].time_ms, 1700006400000);
    }

    #[test]
    fn test_series_is_parallel_and_in_order() {
        let chart = MarketChart {
            prices: vec![
                PricePoint { time_ms: 1699920000000, price: dec!(36500.12) },
                PricePoint { time_ms: 1700006400000, price: dec!(37012.55) },
            ],
        };
        let series = chart.series();
        assert_eq!(series.labels.len(), series.points.len());
        // 2023-11-14 and 2023-11-15
        assert_eq!(series.labels, vec!["Tue", "Wed"]);
        assert_eq!(series.points, vec![36500.12, 37012.55]);
    }

    #[test]
    fn test_empty_series() {
        let chart = MarketChart::default();
        assert!(chart.series().is_empty());
    }
}
