//! btchist CLI — export the BTC-USD daily open/close history to CSV.
//!
//! Tries Yahoo Finance, CryptoCompare, and CoinGecko in priority order.
//! Default mode merges every successful source to maximize coverage;
//! `--mode fallback` stops at the first success instead. Exit code is
//! non-zero when no source yields data or the artifact fails validation.

use anyhow::{Context, Result};
use btchist_core::{
    acquire_and_merge, acquire_first, CoinGeckoAdapter, CryptoCompareAdapter, CsvSink,
    MergeReport, PersistReport, PriceSeries, ProviderAdapter, StdoutProgress, YahooAdapter,
    DEFAULT_MIN_ROWS,
};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "btchist",
    about = "Export the full BTC-USD daily open/close history to CSV"
)]
struct Cli {
    /// Output CSV path.
    #[arg(long, default_value = "btc_prices.csv")]
    out: PathBuf,

    /// Acquisition mode: merge all sources, or stop at the first success.
    #[arg(long, value_enum, default_value_t = Mode::Merge)]
    mode: Mode,

    /// Warn (without aborting) when the final series has fewer rows.
    #[arg(long, default_value_t = DEFAULT_MIN_ROWS)]
    min_rows: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Merge,
    Fallback,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let yahoo = YahooAdapter::new("BTC-USD");
    let cryptocompare = CryptoCompareAdapter::new("BTC", "USD");
    let coingecko = CoinGeckoAdapter::new("bitcoin", "usd");
    let adapters: [&dyn ProviderAdapter; 3] = [&yahoo, &cryptocompare, &coingecko];

    let progress = StdoutProgress;

    let series: PriceSeries = match cli.mode {
        Mode::Merge => {
            let (series, report) = acquire_and_merge(&adapters, &progress)?;
            print_merge_report(&report);
            series
        }
        Mode::Fallback => acquire_first(&adapters, &progress)?,
    };

    let report = sink_series(&cli.out, cli.min_rows, &series)?;
    print_persist_report(&report);

    Ok(())
}

fn sink_series(out: &Path, min_rows: usize, series: &PriceSeries) -> Result<PersistReport> {
    CsvSink::new(out, min_rows)
        .persist(series)
        .with_context(|| format!("failed to persist {}", out.display()))
}

fn print_merge_report(report: &MergeReport) {
    println!();
    println!("=== Merge Result ===");
    println!("Unique days:    {}", report.total_rows);
    println!(
        "Period:         {} to {}",
        report.first_date, report.last_date
    );
    for contribution in &report.contributions {
        println!(
            "  - {:<16} {} days retained",
            contribution.source, contribution.rows
        );
    }
}

fn print_persist_report(report: &PersistReport) {
    println!();
    println!("CSV saved: {}", report.path.display());
    println!("  Rows:      {}", report.rows);
    println!(
        "  Period:    {} to {}",
        report.first_date, report.last_date
    );
    println!("  Years:     {}", report.year_span);
    for warning in &report.warnings {
        println!("  WARNING: {warning}");
    }
}
