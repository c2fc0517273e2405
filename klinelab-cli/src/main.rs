//! KlineLab CLI — scrape, feature, and store management commands.
//!
//! Commands:
//! - `scrape` — page minute candles from Binance into per-day Parquet files
//! - `features` — load stored candles, compute the indicator matrix, and
//!   optionally append cross-sectional ranks and z-scores
//! - `store status` — report stored symbols, day counts, and date ranges

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use polars::prelude::ParquetWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use klinelab_core::data::{
    scrape_symbols, BinanceProvider, CandleStore, CircuitBreaker, ScrapeConfig,
    StdoutProgress, Universe,
};
use klinelab_core::features::{cross_section_features, FeatureEngine};

#[derive(Parser)]
#[command(
    name = "klinelab",
    about = "KlineLab — minute-candle scraping and feature engineering for crypto pairs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape minute candles from Binance into per-day Parquet files.
    Scrape {
        /// Symbols to scrape (e.g., BTC/USDT ETH/USDT). Overrides --symbols-file.
        symbols: Vec<String>,

        /// Plain-text symbol list, one pair per line.
        #[arg(long)]
        symbols_file: Option<PathBuf>,

        /// TOML scrape config. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Earliest day to fetch (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Root directory for Parquet output.
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Refetch days that already have a stored file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Compute the feature matrix over stored candles.
    Features {
        /// Symbols to load. Overrides --symbols-file.
        symbols: Vec<String>,

        /// Plain-text symbol list, one pair per line.
        #[arg(long)]
        symbols_file: Option<PathBuf>,

        /// Store root directory.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Exchange partition to read.
        #[arg(long, default_value = "binance")]
        exchange: String,

        /// Interval partition to read.
        #[arg(long, default_value = "1m")]
        interval: String,

        /// Output Parquet path for the feature matrix.
        #[arg(long, default_value = "features.parquet")]
        out: PathBuf,

        /// Append per-timestamp rank and z-score columns across symbols.
        #[arg(long, default_value_t = false)]
        cross_section: bool,
    },
    /// Store management commands.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Report stored symbols, day counts, and date ranges.
    Status {
        /// Symbols to report. Overrides --symbols-file.
        symbols: Vec<String>,

        /// Plain-text symbol list, one pair per line.
        #[arg(long)]
        symbols_file: Option<PathBuf>,

        /// Store root directory.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Exchange partition to read.
        #[arg(long, default_value = "binance")]
        exchange: String,

        /// Interval partition to read.
        #[arg(long, default_value = "1m")]
        interval: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            symbols,
            symbols_file,
            config,
            start,
            out_dir,
            force,
        } => run_scrape(symbols, symbols_file, config, start, out_dir, force),
        Commands::Features {
            symbols,
            symbols_file,
            data_dir,
            exchange,
            interval,
            out,
            cross_section,
        } => run_features(
            symbols,
            symbols_file,
            data_dir,
            exchange,
            interval,
            out,
            cross_section,
        ),
        Commands::Store { action } => match action {
            StoreAction::Status {
                symbols,
                symbols_file,
                data_dir,
                exchange,
                interval,
            } => run_store_status(symbols, symbols_file, data_dir, exchange, interval),
        },
    }
}

/// Positional symbols win over the symbol file; with neither, the majors.
fn resolve_universe(symbols: Vec<String>, symbols_file: Option<PathBuf>) -> Result<Universe> {
    if !symbols.is_empty() {
        return Ok(Universe { symbols });
    }
    if let Some(path) = symbols_file {
        return Universe::from_file(&path).map_err(|e| anyhow::anyhow!(e));
    }
    Ok(Universe::default_pairs())
}

fn run_scrape(
    symbols: Vec<String>,
    symbols_file: Option<PathBuf>,
    config_path: Option<PathBuf>,
    start: Option<String>,
    out_dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ScrapeConfig::from_file(&path).map_err(|e| anyhow::anyhow!(e))?,
        None => ScrapeConfig::default(),
    };
    if let Some(s) = start {
        config.start_date = NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("invalid --start date: {s}"))?;
    }
    if let Some(dir) = out_dir {
        config.out_dir = dir;
    }
    if force {
        config.force = true;
    }

    let universe = resolve_universe(symbols, symbols_file)?;
    if universe.is_empty() {
        bail!("no symbols to scrape");
    }

    let circuit_breaker = Arc::new(CircuitBreaker::default_exchange());
    let provider = BinanceProvider::new(circuit_breaker).with_retry_policy(
        config.max_retries,
        std::time::Duration::from_millis(config.retry_base_delay_ms),
    );
    let store = CandleStore::new(&config.out_dir, &config.exchange, &config.interval);
    let progress = StdoutProgress;

    let summary = scrape_symbols(
        &provider,
        &store,
        &universe.as_refs(),
        &config,
        &progress,
    );

    if !summary.all_succeeded() {
        for (symbol, err) in &summary.errors {
            eprintln!("Error for {symbol}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_features(
    symbols: Vec<String>,
    symbols_file: Option<PathBuf>,
    data_dir: PathBuf,
    exchange: String,
    interval: String,
    out: PathBuf,
    cross_section: bool,
) -> Result<()> {
    let universe = resolve_universe(symbols, symbols_file)?;
    if universe.is_empty() {
        bail!("no symbols to load");
    }

    let store = CandleStore::new(&data_dir, &exchange, &interval);
    let df = store.load_symbols(&universe.as_refs())?;
    if df.height() == 0 {
        bail!("no stored candles for the requested symbols under {}", data_dir.display());
    }
    println!("Loaded {} rows across {} symbol(s)", df.height(), universe.len());

    // Indicators always run per symbol; a window must never straddle pairs
    let engine = FeatureEngine::default_set();
    let computed = engine.compute_grouped(&df, "symbol")?;
    let mut features = if cross_section {
        cross_section_features(&computed, "timestamp")?
    } else {
        computed
    };

    println!(
        "Computed {} columns over {} rows",
        features.width(),
        features.height()
    );

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(&out)
        .with_context(|| format!("create output file {}", out.display()))?;
    ParquetWriter::new(file).finish(&mut features)?;
    println!("Feature matrix written to {}", out.display());

    Ok(())
}

fn run_store_status(
    symbols: Vec<String>,
    symbols_file: Option<PathBuf>,
    data_dir: PathBuf,
    exchange: String,
    interval: String,
) -> Result<()> {
    if !data_dir.exists() {
        println!("Store directory does not exist: {}", data_dir.display());
        return Ok(());
    }

    let universe = resolve_universe(symbols, symbols_file)?;
    let store = CandleStore::new(&data_dir, &exchange, &interval);
    let statuses = store.status(&universe.as_refs());

    let stored = statuses.iter().filter(|s| s.stored).count();
    println!("Store: {} ({exchange}/{interval})", data_dir.display());
    println!("Symbols stored: {stored}/{}", statuses.len());
    println!();
    println!(
        "{:<12} {:<24} {:>6} {:>10}",
        "Symbol", "Date Range", "Days", "Rows"
    );
    println!("{}", "-".repeat(56));
    for status in &statuses {
        let range = match (status.first_day, status.last_day) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "(not stored)".to_string(),
        };
        println!(
            "{:<12} {:<24} {:>6} {:>10}",
            status.symbol, range, status.day_count, status.row_count
        );
    }

    Ok(())
}
