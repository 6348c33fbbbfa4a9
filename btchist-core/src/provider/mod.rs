//! Provider adapter contract and structured error types.
//!
//! The [`ProviderAdapter`] trait abstracts over data sources (Yahoo Finance,
//! CryptoCompare, CoinGecko) so the acquisition pipeline can consume them
//! uniformly and tests can substitute scripted adapters. Adapters never let
//! an error cross their boundary: transport and parse failures are caught
//! and reported as a [`FetchStatus::Failed`] tag on the returned result.

pub mod coingecko;
pub mod cryptocompare;
pub mod yahoo;

use crate::series::{PriceRow, PriceSeries};
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

/// Failures local to a single adapter invocation.
///
/// These never abort the run while another adapter can still be tried.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network error, timeout, or non-2xx status from the provider.
    #[error("transport: {0}")]
    Transport(String),

    /// Payload did not match the provider's documented shape.
    #[error("unexpected payload shape: {0}")]
    Schema(String),

    /// Provider answered with its own non-success status.
    #[error("provider rejected request: {0}")]
    Provider(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Transport(e.to_string())
    }
}

/// Outcome tag of one acquisition attempt.
#[derive(Debug)]
pub enum FetchStatus {
    /// Non-empty normalized series.
    Success(PriceSeries),
    /// Well-formed response, but zero rows survived filtering.
    Empty,
    /// The attempt failed; the reason is informational only.
    Failed(AdapterError),
}

/// Result of one adapter invocation, consumed immediately by the pipeline.
#[derive(Debug)]
pub struct ProviderResult {
    pub source: &'static str,
    pub status: FetchStatus,
}

/// A single data source normalized to the canonical row schema.
///
/// `fetch` takes no parameters: symbol, quote currency, time window, and
/// page limits are fixed at construction. It must not panic and must not
/// return an error past its boundary.
pub trait ProviderAdapter {
    /// Stable name used in progress output and merge reports.
    fn name(&self) -> &'static str;

    /// Acquire and normalize this source's full history.
    fn fetch(&self) -> ProviderResult;
}

/// Progress callback for multi-source acquisition.
pub trait AcquireProgress {
    /// Called before an adapter is invoked.
    fn on_start(&self, source: &str, index: usize, total: usize);

    /// Called with the adapter's result.
    fn on_complete(&self, result: &ProviderResult);

    /// Called once every adapter the pipeline chose to run has finished.
    fn on_all_complete(&self, succeeded: usize, attempted: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl AcquireProgress for StdoutProgress {
    fn on_start(&self, source: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {source}...", index + 1, total);
    }

    fn on_complete(&self, result: &ProviderResult) {
        match &result.status {
            FetchStatus::Success(series) => println!(
                "  OK: {} ({} days, {} to {})",
                result.source,
                series.len(),
                series.first_date().unwrap_or_default(),
                series.last_date().unwrap_or_default(),
            ),
            FetchStatus::Empty => println!("  EMPTY: {}", result.source),
            FetchStatus::Failed(e) => println!("  FAIL: {}: {e}", result.source),
        }
    }

    fn on_all_complete(&self, succeeded: usize, attempted: usize) {
        println!("\nAcquisition complete: {succeeded}/{attempted} sources succeeded");
    }
}

/// Shared blocking HTTP client: explicit timeout, browser-ish user agent.
pub(crate) fn build_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .expect("failed to build HTTP client")
}

/// Convert an adapter's raw row harvest into a [`FetchStatus`].
///
/// Normalization (positive prices, unique dates, no future rows) happens
/// here so every adapter applies the same row filtering.
pub(crate) fn status_from_rows(
    rows: Result<Vec<PriceRow>, AdapterError>,
    today: NaiveDate,
) -> FetchStatus {
    match rows {
        Ok(raw) => {
            let series = PriceSeries::normalize(raw, today);
            if series.is_empty() {
                FetchStatus::Empty
            } else {
                FetchStatus::Success(series)
            }
        }
        Err(e) => FetchStatus::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_surviving_rows_is_empty_not_failed() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = vec![PriceRow {
            date: today,
            open: -1.0,
            close: 0.0,
        }];
        assert!(matches!(
            status_from_rows(Ok(rows), today),
            FetchStatus::Empty
        ));
    }

    #[test]
    fn adapter_error_becomes_failed() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let status = status_from_rows(Err(AdapterError::Transport("timeout".into())), today);
        assert!(matches!(
            status,
            FetchStatus::Failed(AdapterError::Transport(_))
        ));
    }
}
