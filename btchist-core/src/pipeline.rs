//! Acquisition pipeline: fallback chain and multi-source reconciler.
//!
//! Both entry points consume a declarative, priority-ordered adapter list.
//! [`acquire_first`] stops at the first success and is the mode for a
//! single authoritative source with pure fallbacks. [`acquire_and_merge`]
//! runs every adapter and unions their coverage, resolving overlapping
//! dates in favor of the higher-priority source. Adding a provider means
//! implementing [`ProviderAdapter`], not editing this module.

use crate::provider::{AcquireProgress, FetchStatus, ProviderAdapter};
use crate::series::{PriceRow, PriceSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

/// Fatal pipeline outcomes; the process must not proceed to persistence.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data available: every configured source failed or returned empty")]
    NoDataAvailable,
}

/// Per-source share of the merged series, for observability only.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceContribution {
    pub source: String,
    /// Dates in the final series whose retained row came from this source.
    pub rows: usize,
}

/// Summary of one merge run.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub total_rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// In adapter priority order.
    pub contributions: Vec<SourceContribution>,
}

/// Try adapters in priority order; return the first successful series
/// unmodified. Adapters after the first success are never invoked.
pub fn acquire_first(
    adapters: &[&dyn ProviderAdapter],
    progress: &dyn AcquireProgress,
) -> Result<PriceSeries, PipelineError> {
    let total = adapters.len();

    for (i, adapter) in adapters.iter().enumerate() {
        progress.on_start(adapter.name(), i, total);
        let result = adapter.fetch();
        progress.on_complete(&result);

        if let FetchStatus::Success(series) = result.status {
            progress.on_all_complete(1, i + 1);
            return Ok(series);
        }
    }

    progress.on_all_complete(0, total);
    Err(PipelineError::NoDataAvailable)
}

/// Invoke every adapter and merge all successful series.
///
/// Deduplication is a stable first-occurrence-wins pass over the
/// priority-ordered sources: no averaging, no consensus. Disjoint date
/// ranges are unioned, so the merged coverage is exactly the union of the
/// successful sources' coverage.
pub fn acquire_and_merge(
    adapters: &[&dyn ProviderAdapter],
    progress: &dyn AcquireProgress,
) -> Result<(PriceSeries, MergeReport), PipelineError> {
    let total = adapters.len();
    let mut successes: Vec<(String, PriceSeries)> = Vec::new();

    for (i, adapter) in adapters.iter().enumerate() {
        progress.on_start(adapter.name(), i, total);
        let result = adapter.fetch();
        progress.on_complete(&result);

        if let FetchStatus::Success(series) = result.status {
            successes.push((result.source.to_string(), series));
        }
    }
    progress.on_all_complete(successes.len(), total);

    merge_sources(successes)
}

/// Merge already-acquired series, priority given by input order.
fn merge_sources(
    sources: Vec<(String, PriceSeries)>,
) -> Result<(PriceSeries, MergeReport), PipelineError> {
    if sources.is_empty() {
        return Err(PipelineError::NoDataAvailable);
    }

    // Date-keyed keep-first over the priority-ordered concatenation.
    let mut by_date: BTreeMap<NaiveDate, (usize, PriceRow)> = BTreeMap::new();
    for (priority, (_, series)) in sources.iter().enumerate() {
        for row in series.rows() {
            by_date.entry(row.date).or_insert((priority, *row));
        }
    }

    let mut retained = vec![0usize; sources.len()];
    for (priority, _) in by_date.values() {
        retained[*priority] += 1;
    }

    let rows: Vec<PriceRow> = by_date.values().map(|(_, row)| *row).collect();
    let series = PriceSeries::from_sorted_unique(rows);

    let report = MergeReport {
        total_rows: series.len(),
        // series is non-empty: every source series held at least one row
        first_date: series.first_date().unwrap(),
        last_date: series.last_date().unwrap(),
        contributions: sources
            .into_iter()
            .zip(retained)
            .map(|((source, _), rows)| SourceContribution { source, rows })
            .collect(),
    };

    Ok((series, report))
}
