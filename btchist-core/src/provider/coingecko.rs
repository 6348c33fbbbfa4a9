//! CoinGecko market-chart adapter.
//!
//! The free `coins/{id}/market_chart` endpoint serves at most the last 365
//! days as `[epoch_millis, price]` pairs, sometimes sub-daily or irregularly
//! spaced. Points are grouped by calendar date: the first point of a day is
//! its open, the last point its close, by timestamp order. This source only
//! fills the recent end of the merged history; the deeper past comes from
//! the higher-priority adapters.

use super::{build_client, status_from_rows, AdapterError, ProviderAdapter, ProviderResult};
use crate::series::PriceRow;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}

/// CoinGecko adapter.
pub struct CoinGeckoAdapter {
    client: reqwest::blocking::Client,
    coin_id: String,
    vs_currency: String,
    days: u32,
}

impl CoinGeckoAdapter {
    /// `coin_id` is a CoinGecko identifier (e.g. `bitcoin`), `vs_currency`
    /// a quote code (e.g. `usd`). The free endpoint caps `days` at 365.
    pub fn new(coin_id: impl Into<String>, vs_currency: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            coin_id: coin_id.into(),
            vs_currency: vs_currency.into(),
            days: 365,
        }
    }

    fn chart_url(&self) -> String {
        format!(
            "https://api.coingecko.com/api/v3/coins/{}/market_chart",
            self.coin_id
        )
    }

    fn fetch_rows(&self) -> Result<Vec<PriceRow>, AdapterError> {
        let days = self.days.to_string();
        let resp = self
            .client
            .get(self.chart_url())
            .query(&[
                ("vs_currency", self.vs_currency.as_str()),
                ("days", days.as_str()),
                ("interval", "daily"),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!("HTTP {status}")));
        }

        let chart: MarketChart = resp
            .json()
            .map_err(|e| AdapterError::Schema(format!("market_chart decode: {e}")))?;

        daily_rows(chart.prices)
    }
}

impl ProviderAdapter for CoinGeckoAdapter {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    fn fetch(&self) -> ProviderResult {
        ProviderResult {
            source: self.name(),
            status: status_from_rows(self.fetch_rows(), Utc::now().date_naive()),
        }
    }
}

/// Aggregate `[epoch_millis, price]` points into daily open/close rows.
fn daily_rows(mut points: Vec<(f64, f64)>) -> Result<Vec<PriceRow>, AdapterError> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut days: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for (ts_millis, price) in points {
        let date = chrono::DateTime::from_timestamp_millis(ts_millis as i64)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| AdapterError::Schema(format!("invalid timestamp: {ts_millis}")))?;

        days.entry(date)
            .and_modify(|(_, close)| *close = price)
            .or_insert((price, price));
    }

    Ok(days
        .into_iter()
        .map(|(date, (open, close))| PriceRow { date, open, close })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: f64 = 86_400_000.0;

    #[test]
    fn groups_subdaily_points_into_open_and_close() {
        // 2021-01-01: three points; 2021-01-02: one point
        let base = 1_609_459_200_000.0;
        let points = vec![
            (base, 29_000.0),
            (base + 3_600_000.0, 29_500.0),
            (base + 7_200_000.0, 29_350.0),
            (base + DAY_MS, 29_400.0),
        ];

        let rows = daily_rows(points).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(rows[0].open, 29_000.0);
        assert_eq!(rows[0].close, 29_350.0);
        assert_eq!(rows[1].open, rows[1].close);
    }

    #[test]
    fn unsorted_points_are_ordered_by_timestamp_first() {
        let base = 1_609_459_200_000.0;
        let points = vec![(base + 3_600_000.0, 2.0), (base, 1.0)];

        let rows = daily_rows(points).unwrap();
        assert_eq!(rows[0].open, 1.0);
        assert_eq!(rows[0].close, 2.0);
    }

    #[test]
    fn decodes_market_chart_payload() {
        let json = r#"{"prices": [[1609459200000, 29000.5], [1609545600000, 29350.25]],
                       "market_caps": [], "total_volumes": []}"#;
        let chart: MarketChart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(chart.prices[0].1, 29000.5);
    }

    #[test]
    fn empty_chart_yields_no_rows() {
        let rows = daily_rows(vec![]).unwrap();
        assert!(rows.is_empty());
    }
}
