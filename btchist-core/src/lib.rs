//! btchist-core — multi-source acquisition of the BTC-USD daily series.
//!
//! Three independent provider adapters (Yahoo Finance, CryptoCompare,
//! CoinGecko) normalize their payloads into one canonical `{date, open,
//! close}` row schema. The pipeline either stops at the first successful
//! source ([`acquire_first`]) or merges every successful source
//! ([`acquire_and_merge`]), resolving overlapping dates by adapter
//! priority to maximize historical coverage. The result is persisted as a
//! CSV artifact with post-write read-back validation ([`CsvSink`]).

pub mod pipeline;
pub mod provider;
pub mod series;
pub mod sink;

pub use pipeline::{acquire_and_merge, acquire_first, MergeReport, PipelineError, SourceContribution};
pub use provider::{
    coingecko::CoinGeckoAdapter, cryptocompare::CryptoCompareAdapter, yahoo::YahooAdapter,
    AcquireProgress, AdapterError, FetchStatus, ProviderAdapter, ProviderResult, StdoutProgress,
};
pub use series::{PriceRow, PriceSeries};
pub use sink::{CsvSink, PersistReport, SinkError, DEFAULT_MIN_ROWS};
