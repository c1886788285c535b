//! ScalpLab CLI — optimize, validate, and summarize commands.
//!
//! Commands:
//! - `optimize` — grid-search on the first 80% of a dataset, save the winner, validate on the rest
//! - `validate` — replay a saved best configuration over a full dataset
//! - `summarize` — tally an exported trade log
//! - `data list` — list CSV datasets in a directory

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scalplab_core::metrics::TradeLogSummary;
use scalplab_runner::export::{
    generate_report, import_trade_log_csv, metrics_summary_text, save_artifacts,
    trade_log_summary_text,
};
use scalplab_runner::{
    list_data_files, load_best_config, load_data, run_best_config, run_optimization,
    synthetic_data, tuned_data_path, LoadedData, OptimizeConfig,
};

#[derive(Parser)]
#[command(name = "scalplab", about = "ScalpLab CLI — scalp strategy optimizer and backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where bars come from.
#[derive(clap::Args)]
struct DataArgs {
    /// CSV file to load. `validate` defaults to the dataset the configuration
    /// was tuned on; otherwise the last matching file in --data-dir.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory searched when --data is not given.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// File name prefix used when searching --data-dir.
    #[arg(long)]
    prefix: Option<String>,

    /// Use a synthetic random walk with this label instead of a file.
    #[arg(long, conflicts_with = "data")]
    synthetic: Option<String>,

    /// Number of synthetic one-minute bars.
    #[arg(long, default_value_t = 10_000)]
    synthetic_bars: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Grid-search strategy parameters, save the best, and validate it.
    Optimize {
        #[command(flatten)]
        data: DataArgs,

        /// TOML run configuration. Defaults apply when absent.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where the best configuration is written.
        #[arg(long, default_value = "best_config.json")]
        best_config: PathBuf,

        /// Evaluate grid points on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Wall-clock budget in seconds; overrides the config file.
        #[arg(long)]
        time_budget: Option<u64>,

        /// Write a Markdown report here.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Rows in the report's top-N table.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Save validation artifacts (trades, equity, summary) under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay a saved best configuration over a full dataset.
    Validate {
        #[command(flatten)]
        data: DataArgs,

        /// TOML run configuration (engine section is used).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Saved best configuration.
        #[arg(long, default_value = "best_config.json")]
        best_config: PathBuf,

        /// Save artifacts (trades, equity, summary) under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Summarize an exported trade log CSV.
    Summarize {
        /// Path to trades.csv.
        trade_log: PathBuf,

        /// Print JSON instead of key-value text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Dataset commands.
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// List CSV datasets.
    List {
        #[arg(long, default_value = "data")]
        dir: PathBuf,

        #[arg(long)]
        prefix: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            data,
            config,
            best_config,
            sequential,
            time_budget,
            report,
            top,
            output_dir,
        } => run_optimize_cmd(
            &data,
            config.as_deref(),
            &best_config,
            sequential,
            time_budget,
            report.as_deref(),
            top,
            output_dir.as_deref(),
        ),
        Commands::Validate {
            data,
            config,
            best_config,
            output_dir,
        } => run_validate_cmd(&data, config.as_deref(), &best_config, output_dir.as_deref()),
        Commands::Summarize { trade_log, json } => run_summarize_cmd(&trade_log, json),
        Commands::Data { action } => match action {
            DataAction::List { dir, prefix } => run_data_list(&dir, prefix.as_deref()),
        },
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_data(args: &DataArgs, tuned: Option<PathBuf>) -> Result<LoadedData> {
    if let Some(label) = &args.synthetic {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .context("invalid synthetic start time")?;
        return Ok(synthetic_data(label, start, args.synthetic_bars));
    }
    let path = match args.data.clone().or(tuned) {
        Some(p) => p,
        None => {
            let files = list_data_files(&args.data_dir, args.prefix.as_deref())?;
            match files.last() {
                Some(p) => p.clone(),
                None => bail!(
                    "no CSV files in '{}'; pass --data or --synthetic",
                    args.data_dir.display()
                ),
            }
        }
    };
    info!(path = %path.display(), "loading bars");
    Ok(load_data(&path)?)
}

#[allow(clippy::too_many_arguments)]
fn run_optimize_cmd(
    data_args: &DataArgs,
    config_path: Option<&Path>,
    best_path: &Path,
    sequential: bool,
    time_budget: Option<u64>,
    report_path: Option<&Path>,
    top: usize,
    output_dir: Option<&Path>,
) -> Result<()> {
    let mut config = OptimizeConfig::load_or_default(config_path)?;
    if sequential {
        config.sweep.parallel = false;
    }
    if time_budget.is_some() {
        config.sweep.time_budget_secs = time_budget;
    }

    let data = resolve_data(data_args, None)?;
    let report = run_optimization(&data, &config, Some(best_path))?;

    println!(
        "Evaluated {} of {} configurations ({} skipped) in {:.1}s",
        report.evaluations.len(),
        report.grid_size,
        report.skipped,
        report.elapsed.as_secs_f64()
    );
    match (&report.best, &report.validation) {
        (Some(best), Some(validation)) => {
            println!("\nBest configuration: {:?}", best.config);
            println!("\nTraining:\n{}", metrics_summary_text(&best.metrics));
            println!("Validation:\n{}", metrics_summary_text(&validation.metrics));
            println!("Saved to: {}", best_path.display());
            if let Some(dir) = output_dir {
                let run_dir = save_artifacts(dir, "validation", validation)?;
                println!("Artifacts saved to: {}", run_dir.display());
            }
        }
        _ => println!("No configuration was evaluated; nothing saved."),
    }

    if let Some(path) = report_path {
        std::fs::write(path, generate_report(&report, top))
            .with_context(|| format!("failed to write report {}", path.display()))?;
        println!("Report written to: {}", path.display());
    }
    Ok(())
}

fn run_validate_cmd(
    data_args: &DataArgs,
    config_path: Option<&Path>,
    best_path: &Path,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = OptimizeConfig::load_or_default(config_path)?;
    let best = load_best_config(best_path)?;
    let data = resolve_data(data_args, tuned_data_path(&best))?;
    let run = run_best_config(&best, &data, &config.engine)?;

    println!("Configuration: {:?}", run.best.strategy);
    println!("Data: {} ({} bars)", run.data_source, run.result.bar_count);
    if run.synthetic {
        println!("Data: SYNTHETIC");
    }
    println!("\n{}", metrics_summary_text(&run.result.metrics));

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(dir, "replay", &run.result)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_summarize_cmd(trade_log: &Path, json: bool) -> Result<()> {
    let trades = import_trade_log_csv(trade_log)?;
    let summary = TradeLogSummary::from_log(&trades);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", trade_log_summary_text(&summary));
    }
    Ok(())
}

fn run_data_list(dir: &Path, prefix: Option<&str>) -> Result<()> {
    let files = list_data_files(dir, prefix)?;
    if files.is_empty() {
        println!("No CSV files in {}", dir.display());
        return Ok(());
    }
    for (i, path) in files.iter().enumerate() {
        println!("[{i}] {}", path.display());
    }
    Ok(())
}
