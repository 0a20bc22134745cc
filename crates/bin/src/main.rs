//! Fremantle CLI binary.
//!
//! Provides command-line interface for the Fremantle liquidity factor.

mod integration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fremantle::data::dates::parse_date;
use fremantle::data::FactorSink;
use fremantle::output::CsvDirectorySink;
use fremantle::{LiquidityPipeline, RunRequest, RunSummary, SkipReason, Sources};
use indicatif::{ProgressBar, ProgressStyle};
use integration::config::{Overrides, apply_overrides, load_config};
use integration::import::{ImportKind, import};
use integration::store_manager::{default_store_path, open_store};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fremantle")]
#[command(about = "Fremantle: liquidity risk factor orthogonalized against size", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute liquidity factor loadings
    Run {
        /// First evaluation date, or the single date without --end
        #[arg(long, value_parser = parse_date_arg)]
        start: NaiveDate,

        /// Last evaluation date
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<NaiveDate>,

        /// Evaluate every trading day instead of month ends only
        #[arg(long)]
        all_days: bool,

        /// Persist the computed tables
        #[arg(long)]
        save: bool,

        /// Compute securities on a worker pool
        #[arg(long)]
        parallel: bool,

        /// JSON pipeline configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// SQLite store (default: platform cache directory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Also write persisted tables as CSV files to this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Worker pool size
        #[arg(long)]
        workers: Option<usize>,

        /// Pause between evaluation dates in seconds
        #[arg(long)]
        cooldown_secs: Option<u64>,

        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Load collaborator data from CSV into the store
    Import {
        /// Kind of data in the file
        #[arg(long, value_enum)]
        kind: ImportKind,

        /// CSV file
        path: PathBuf,

        /// Evaluation date of a size table
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,

        /// Factor namespace size tables are stored under
        #[arg(long, default_value = "size")]
        size_factor: String,

        /// SQLite store (default: platform cache directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show store statistics
    Stats {
        /// SQLite store (default: platform cache directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            start,
            end,
            all_days,
            save,
            parallel,
            config,
            db,
            csv_dir,
            workers,
            cooldown_secs,
            report,
        } => {
            let config = apply_overrides(
                load_config(config.as_deref())?,
                Overrides {
                    parallel,
                    workers,
                    cooldown_secs,
                },
            );

            let mut request = RunRequest::new(start)
                .with_month_end(!all_days)
                .with_save(save);
            if let Some(end) = end {
                request = request.with_end(end);
            }

            let summary = run_pipeline(
                LiquidityPipeline::new(config)?,
                &request,
                db,
                csv_dir,
            )?;
            print_summary(&summary);

            if let Some(path) = report {
                serde_json::to_writer_pretty(File::create(&path)?, &summary)?;
                println!("Report written to {}", path.display());
            }
        }
        Commands::Import {
            kind,
            path,
            date,
            size_factor,
            db,
        } => {
            let store = open_store(db.as_deref())?;
            let rows = import(&store, kind, File::open(&path)?, &size_factor, date)?;
            println!("Imported {} rows from {}", rows, path.display());
        }
        Commands::Stats { db } => {
            let path = db.unwrap_or_else(default_store_path);
            let store = open_store(Some(&path))?;
            let stats = store.get_stats()?;

            println!("Store: {}", path.display());
            println!("  Trading days:     {}", stats.trading_days);
            println!("  Securities:       {}", stats.securities);
            println!("  Turnover records: {}", stats.turnover_records);
            println!("  Factor tables:    {}", stats.factor_tables);
            println!("  Factor rows:      {}", stats.factor_rows);
        }
    }

    Ok(())
}

fn run_pipeline(
    pipeline: LiquidityPipeline,
    request: &RunRequest,
    db: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let store = open_store(db.as_deref())?;
    let size = store.namespace(pipeline.config().size_factor_name.as_str());
    let liquidity = store.namespace(pipeline.config().factor_name.as_str());
    let csv_sink = csv_dir.map(CsvDirectorySink::new).transpose()?;

    let mut sinks: Vec<&dyn FactorSink> = vec![&liquidity];
    if let Some(sink) = &csv_sink {
        sinks.push(sink);
    }

    let sources = Sources {
        calendar: &store,
        basics: &store,
        market: &store,
        size: &size,
    };

    let dates = pipeline.evaluation_dates(&store, request)?;
    println!(
        "Evaluating {} date(s), mode {:?}, {} worker(s)",
        dates.len(),
        pipeline.config().mode,
        pipeline.config().workers
    );

    let pb = ProgressBar::new(dates.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Computing liquidity...");

    let summary = pipeline.run_with(&sources, &sinks, request, |result| {
        pb.inc(1);
        pb.set_message(format!(
            "{} -> {} securities",
            result.report.evaluation_date,
            result.liquidity.len()
        ));
    });

    match summary {
        Ok(summary) => {
            pb.finish_with_message(format!("Processed {} date(s)", summary.dates()));
            Ok(summary)
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(e.into())
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{:10}  {:10}  {:>8}  {:>8}  {:>7}  {:>6}  {:>9}",
        "date", "label", "universe", "computed", "skipped", "joined", "persisted"
    );
    for report in &summary.reports {
        println!(
            "{:10}  {:10}  {:>8}  {:>8}  {:>7}  {:>6}  {:>9}",
            report.evaluation_date.to_string(),
            report.date_label.to_string(),
            report.universe_size,
            report.computed,
            report.skipped.len(),
            report.join.joined,
            if report.persisted { "yes" } else { "no" }
        );
        for skip in report
            .skipped
            .iter()
            .filter(|s| !matches!(s.reason, SkipReason::NoMarketData))
        {
            println!("    {} skipped: {}", skip.id, skip.reason);
        }
    }
    println!();
    println!("Total skipped: {}", summary.total_skipped());
}
