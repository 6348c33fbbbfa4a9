//! CryptoCompare daily-history adapter.
//!
//! The `data/v2/histoday` endpoint caps each call at 2000 rows, so the full
//! history is acquired through [`HistodayPages`], an iterator over
//! successive `toTs` windows starting at the configured window start. Each
//! window advances to one day past the last returned timestamp; a fixed
//! inter-page delay keeps the request rate under the provider's per-IP
//! limit. Pagination stops when a page comes back empty or short, or when
//! the window reaches the present.

use super::{build_client, status_from_rows, AdapterError, ProviderAdapter, ProviderResult};
use crate::series::PriceRow;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

const HISTODAY_URL: &str = "https://min-api.cryptocompare.com/data/v2/histoday";
const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct HistodayResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Data", default)]
    data: HistodayData,
}

#[derive(Debug, Deserialize, Default)]
struct HistodayData {
    #[serde(rename = "Data", default)]
    data: Vec<HistodayRow>,
}

#[derive(Debug, Deserialize)]
struct HistodayRow {
    time: i64,
    open: f64,
    close: f64,
}

/// CryptoCompare adapter.
pub struct CryptoCompareAdapter {
    client: reqwest::blocking::Client,
    fsym: String,
    tsym: String,
    window_start: NaiveDate,
    page_days: i64,
    page_delay: Duration,
}

impl CryptoCompareAdapter {
    /// `fsym`/`tsym` are CryptoCompare symbol codes, e.g. `BTC` / `USD`.
    ///
    /// The window starts at 2010-01-01 (before BTC traded on any modern
    /// venue) so the first pages establish the earliest data the provider
    /// actually has.
    pub fn new(fsym: impl Into<String>, tsym: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            fsym: fsym.into(),
            tsym: tsym.into(),
            window_start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            page_days: 2000,
            page_delay: Duration::from_millis(500),
        }
    }

    /// Request a single page ending at `to_ts` (epoch seconds).
    fn request_page(&self, to_ts: i64) -> Result<Vec<HistodayRow>, AdapterError> {
        let limit = self.page_days.to_string();
        let to_ts = to_ts.to_string();
        let resp = self
            .client
            .get(HISTODAY_URL)
            .query(&[
                ("fsym", self.fsym.as_str()),
                ("tsym", self.tsym.as_str()),
                ("limit", limit.as_str()),
                ("toTs", to_ts.as_str()),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!("HTTP {status}")));
        }

        let body: HistodayResponse = resp
            .json()
            .map_err(|e| AdapterError::Schema(format!("histoday decode: {e}")))?;

        if body.response != "Success" {
            return Err(AdapterError::Provider(format!(
                "{}: {}",
                body.response, body.message
            )));
        }

        Ok(body.data.data)
    }

    fn fetch_rows(&self) -> Result<Vec<PriceRow>, AdapterError> {
        let start_ts = self
            .window_start
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();

        let mut rows = Vec::new();
        for page in HistodayPages::new(self, start_ts, Utc::now().timestamp()) {
            for item in page? {
                let date = chrono::DateTime::from_timestamp(item.time, 0)
                    .map(|dt| dt.date_naive())
                    .ok_or_else(|| {
                        AdapterError::Schema(format!("invalid timestamp: {}", item.time))
                    })?;
                rows.push(PriceRow {
                    date,
                    open: item.open,
                    close: item.close,
                });
            }
        }
        Ok(rows)
    }
}

impl ProviderAdapter for CryptoCompareAdapter {
    fn name(&self) -> &'static str {
        "cryptocompare"
    }

    fn fetch(&self) -> ProviderResult {
        ProviderResult {
            source: self.name(),
            status: status_from_rows(self.fetch_rows(), Utc::now().date_naive()),
        }
    }
}

/// Iterator over histoday pages.
///
/// Yields each page's rows in window order and terminates on: an error
/// (yielded once, then exhausted), an empty or short page, or the cursor
/// reaching `end`.
struct HistodayPages<'a> {
    adapter: &'a CryptoCompareAdapter,
    cursor: i64,
    end: i64,
    first: bool,
    done: bool,
}

impl<'a> HistodayPages<'a> {
    fn new(adapter: &'a CryptoCompareAdapter, start_ts: i64, end_ts: i64) -> Self {
        Self {
            adapter,
            cursor: start_ts,
            end: end_ts,
            first: true,
            done: false,
        }
    }
}

impl Iterator for HistodayPages<'_> {
    type Item = Result<Vec<HistodayRow>, AdapterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor >= self.end {
            return None;
        }

        if !self.first {
            std::thread::sleep(self.adapter.page_delay);
        }
        self.first = false;

        let to_ts = next_window_end(self.cursor, self.end, self.adapter.page_days);
        let page = match self.adapter.request_page(to_ts) {
            Ok(rows) => rows,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if page.is_empty() {
            self.done = true;
            return None;
        }

        // Advance to one day past the last returned timestamp. A short page
        // means the provider has nothing further.
        let last_ts = page.last().map(|r| r.time).unwrap_or(to_ts);
        self.cursor = advance_cursor(last_ts);
        if (page.len() as i64) < self.adapter.page_days {
            self.done = true;
        }

        Some(Ok(page))
    }
}

/// End of the window starting at `cursor`, clamped to `end`.
fn next_window_end(cursor: i64, end: i64, page_days: i64) -> i64 {
    (cursor + page_days * SECS_PER_DAY).min(end)
}

/// Next window starts one day past the last returned timestamp.
fn advance_cursor(last_ts: i64) -> i64 {
    last_ts + SECS_PER_DAY
}
