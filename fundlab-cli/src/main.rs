//! FundLab CLI: query the cache-aside data layer from the shell.
//!
//! Commands:
//! - `prices`: daily bars for a date range (JSON, or a table with `--table`)
//! - `metrics`: financial metrics snapshots as of an end date
//! - `news`: company news within a window
//! - `insider-trades`, `line-items`: filings datasets
//! - `facts`: company profile (live lookup)
//! - `market-cap`: market capitalisation (live lookup)
//! - `cache status`: entries held in the cache snapshot
//! - `cache clear`: evict one entry, one ticker, or everything

mod logging;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fundlab_core::data::{parse_date, AccessPolicy, CacheStore, DataAccess, YahooProvider};
use fundlab_core::domain::{
    normalize_ticker, CompanyNewsResponse, DatasetKind, FinancialMetricsResponse,
    InsiderTradeResponse, LineItemResponse, Period, PriceResponse,
};
use fundlab_core::FundlabConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "fundlab",
    about = "FundLab CLI: cached access to prices, financial metrics, and company news"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache snapshot loaded before and saved after the command.
    /// Overrides `[cache] snapshot_path`.
    #[arg(long, global = true)]
    cache_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily price bars for a ticker.
    Prices {
        ticker: String,

        /// Start date (YYYY-MM-DD). Defaults to one year before --end.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Print a table instead of JSON.
        #[arg(long, default_value_t = false)]
        table: bool,
    },
    /// Financial metrics snapshots as of an end date.
    Metrics {
        ticker: String,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Reporting period: ttm, annual, or quarterly.
        #[arg(long, default_value = "ttm")]
        period: Period,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Company news within a date window.
    News {
        ticker: String,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Start date (YYYY-MM-DD). Unbounded when omitted.
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Insider trades within a date window.
    InsiderTrades {
        ticker: String,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Named statement line items (e.g. revenue free_cash_flow).
    LineItems {
        ticker: String,

        #[arg(required = true)]
        items: Vec<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long, default_value = "ttm")]
        period: Period,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Company profile (not cached).
    Facts { ticker: String },
    /// Market capitalisation (not cached).
    MarketCap {
        ticker: String,

        #[arg(long)]
        end: Option<String>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached entries and record counts.
    Status,
    /// Evict cached entries. With no ticker the whole cache is cleared.
    Clear {
        ticker: Option<String>,

        /// Only this dataset (e.g. prices, company-news).
        #[arg(long, requires = "ticker")]
        kind: Option<DatasetKind>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FundlabConfig::load_or_default(cli.config.as_deref())?;
    logging::init_logging(&config.logging.level)?;

    let snapshot = cli.cache_file.or_else(|| config.cache.snapshot_path.clone());
    let cache = Arc::new(match &snapshot {
        Some(path) => CacheStore::load_snapshot(path)?,
        None => CacheStore::new(),
    });

    let provider = YahooProvider::from_config(&config.provider)?;
    let access = DataAccess::new(Arc::new(provider), cache.clone())
        .with_policy(AccessPolicy::from(&config.cache));

    run_command(&access, cli.command, snapshot.as_deref())?;

    if let Some(path) = &snapshot {
        let meta = cache.save_snapshot(path)?;
        tracing::info!(
            path = %path.display(),
            entries = meta.entry_count,
            records = meta.record_count,
            "cache snapshot written"
        );
    }

    Ok(())
}

fn run_command(access: &DataAccess, command: Commands, snapshot: Option<&Path>) -> Result<()> {
    match command {
        Commands::Prices {
            ticker,
            start,
            end,
            table,
        } => {
            let end = end_or_today(end.as_deref())?;
            let start = match start.as_deref() {
                Some(s) => parse_date(s)?,
                None => end - chrono::Duration::days(365),
            };
            if table {
                let df = access.get_price_data(&ticker, start, end)?;
                println!("{df}");
            } else {
                let prices = access.get_prices(&ticker, start, end)?;
                print_json(&PriceResponse {
                    ticker: normalize_ticker(&ticker),
                    prices,
                })?;
            }
        }
        Commands::Metrics {
            ticker,
            end,
            period,
            limit,
        } => {
            let end = end_or_today(end.as_deref())?;
            let financial_metrics = access.get_financial_metrics(&ticker, end, period, limit)?;
            print_json(&FinancialMetricsResponse { financial_metrics })?;
        }
        Commands::News {
            ticker,
            end,
            start,
            limit,
        } => {
            let end = end_or_today(end.as_deref())?;
            let start = start.as_deref().map(parse_date).transpose()?;
            let news = access.get_company_news(&ticker, end, start, limit)?;
            print_json(&CompanyNewsResponse { news })?;
        }
        Commands::InsiderTrades {
            ticker,
            end,
            start,
            limit,
        } => {
            let end = end_or_today(end.as_deref())?;
            let start = start.as_deref().map(parse_date).transpose()?;
            let insider_trades = access.get_insider_trades(&ticker, end, start, limit)?;
            print_json(&InsiderTradeResponse { insider_trades })?;
        }
        Commands::LineItems {
            ticker,
            items,
            end,
            period,
            limit,
        } => {
            let end = end_or_today(end.as_deref())?;
            let search_results = access.search_line_items(&ticker, &items, end, period, limit)?;
            print_json(&LineItemResponse { search_results })?;
        }
        Commands::Facts { ticker } => {
            print_json(&access.get_company_facts(&ticker)?)?;
        }
        Commands::MarketCap { ticker, end } => {
            let end = end_or_today(end.as_deref())?;
            let market_cap = access.get_market_cap(&ticker, end);
            print_json(&serde_json::json!({
                "ticker": normalize_ticker(&ticker),
                "market_cap": market_cap,
            }))?;
        }
        Commands::Cache {
            action: CacheAction::Status,
        } => run_cache_status(access.cache(), snapshot)?,
        Commands::Cache {
            action: CacheAction::Clear { ticker, kind },
        } => run_cache_clear(access.cache(), ticker.as_deref(), kind),
    }
    Ok(())
}

fn run_cache_status(cache: &CacheStore, snapshot: Option<&Path>) -> Result<()> {
    match snapshot {
        Some(path) => println!("Cache snapshot: {}", path.display()),
        None => {
            println!("No cache snapshot configured (use --cache-file); the cache is empty.");
            return Ok(());
        }
    }

    let status = cache.status();
    if status.is_empty() {
        println!("Cache is empty.");
        return Ok(());
    }

    println!("{:<20} {:<10} {:>8}  Written", "Kind", "Ticker", "Records");
    for entry in &status {
        println!(
            "{:<20} {:<10} {:>8}  {}",
            entry.kind.as_str(),
            entry.ticker,
            entry.record_count,
            entry.written_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    let total: usize = status.iter().map(|s| s.record_count).sum();
    println!("\n{} entries, {total} records", status.len());
    Ok(())
}

fn run_cache_clear(cache: &CacheStore, ticker: Option<&str>, kind: Option<DatasetKind>) {
    let removed = match (ticker, kind) {
        (Some(ticker), Some(kind)) => usize::from(cache.remove(kind, ticker)),
        (Some(ticker), None) => cache.remove_ticker(ticker),
        (None, _) => {
            let n = cache.len();
            cache.clear();
            n
        }
    };
    println!("Removed {removed} cache entries.");
}

fn end_or_today(end: Option<&str>) -> Result<NaiveDate> {
    Ok(match end {
        Some(s) => parse_date(s).with_context(|| format!("bad --end '{s}'"))?,
        None => chrono::Local::now().date_naive(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
