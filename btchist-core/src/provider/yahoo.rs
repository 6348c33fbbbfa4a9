//! Yahoo Finance data adapter.
//!
//! Fetches the full daily history from Yahoo's v8 chart API in a single
//! request (`period1=0` is clamped server-side to the instrument's listing
//! date; BTC-USD starts 2014-09-17). Yahoo Finance has no official API and
//! is subject to unannounced format changes, which is why it sits behind
//! the same adapter contract as the other sources.

use super::{build_client, status_from_rows, AdapterError, ProviderAdapter, ProviderResult};
use crate::series::PriceRow;
use chrono::Utc;
use serde::Deserialize;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
}

/// Yahoo Finance adapter.
pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    symbol: String,
}

impl YahooAdapter {
    /// `symbol` is a Yahoo pair symbol, e.g. `BTC-USD`.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            symbol: symbol.into(),
        }
    }

    fn chart_url(&self, end_ts: i64) -> String {
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{}\
             ?period1=0&period2={end_ts}&interval=1d",
            self.symbol
        )
    }

    /// Parse the chart API response into raw rows.
    fn parse_response(resp: ChartResponse) -> Result<Vec<PriceRow>, AdapterError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) => AdapterError::Provider(format!("{}: {}", err.code, err.description)),
            None => AdapterError::Schema("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::Schema("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| AdapterError::Schema("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::Schema("no quote data".into()))?;

        let mut rows = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| AdapterError::Schema(format!("invalid timestamp: {ts}")))?;

            // Entries with a missing price are non-trading gaps; drop them.
            let (Some(open), Some(close)) = (
                quote.open.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) else {
                continue;
            };

            rows.push(PriceRow { date, open, close });
        }

        Ok(rows)
    }

    fn fetch_rows(&self) -> Result<Vec<PriceRow>, AdapterError> {
        let url = self.chart_url(Utc::now().timestamp());
        let resp = self.client.get(&url).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!(
                "HTTP {status} for {}",
                self.symbol
            )));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            AdapterError::Schema(format!("failed to parse response for {}: {e}", self.symbol))
        })?;

        Self::parse_response(chart)
    }
}

impl ProviderAdapter for YahooAdapter {
    fn name(&self) -> &'static str {
        "yahoo_finance"
    }

    fn fetch(&self) -> ProviderResult {
        ProviderResult {
            source: self.name(),
            status: status_from_rows(self.fetch_rows(), Utc::now().date_naive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_chart_payload() {
        // 2021-01-01 and 2021-01-02, one gap entry in the middle
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1609459200, 1609502400, 1609545600],
                    "indicators": {
                        "quote": [{
                            "open": [29000.0, null, 29350.0],
                            "close": [29350.0, null, 32100.0]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let rows = YahooAdapter::parse_response(resp).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(rows[0].open, 29000.0);
        assert_eq!(rows[1].close, 32100.0);
    }

    #[test]
    fn provider_error_is_surfaced() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooAdapter::parse_response(resp).unwrap_err();
        assert!(matches!(err, AdapterError::Provider(_)));
    }

    #[test]
    fn missing_timestamps_is_schema_error() {
        let json = r#"{
            "chart": {
                "result": [{"timestamp": null, "indicators": {"quote": [{"open": [], "close": []}]}}],
                "error": null
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooAdapter::parse_response(resp).unwrap_err();
        assert!(matches!(err, AdapterError::Schema(_)));
    }
}
