//! Canonical daily price series.
//!
//! Every adapter output and every merge result flows through [`PriceSeries`],
//! which owns the row invariants: positive prices, unique dates, ascending
//! order, nothing dated past the acquisition day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One daily open/close observation in quote-currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

/// Date-ordered sequence of [`PriceRow`] with unique dates.
///
/// Built through [`PriceSeries::normalize`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    rows: Vec<PriceRow>,
}

impl PriceSeries {
    /// Normalize raw adapter rows into a canonical series.
    ///
    /// - rows with non-positive or non-finite prices are dropped
    /// - rows dated after `today` are dropped
    /// - duplicate dates keep the first occurrence in input order
    /// - survivors are sorted ascending by date
    pub fn normalize(raw: Vec<PriceRow>, today: NaiveDate) -> Self {
        let mut seen = HashSet::new();
        let mut rows: Vec<PriceRow> = raw
            .into_iter()
            .filter(|r| {
                r.open.is_finite()
                    && r.close.is_finite()
                    && r.open > 0.0
                    && r.close > 0.0
                    && r.date <= today
            })
            .filter(|r| seen.insert(r.date))
            .collect();
        rows.sort_by_key(|r| r.date);
        Self { rows }
    }

    /// Wrap rows that are already sorted ascending with unique dates.
    ///
    /// Used by the reconciler, whose date-keyed merge guarantees both.
    pub(crate) fn from_sorted_unique(rows: Vec<PriceRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
        Self { rows }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Dates present in this series, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }
}
