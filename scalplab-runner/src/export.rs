//! Reporting and export: CSV, JSON, key-value text and Markdown.
//!
//! - **CSV**: trade log and equity curve for external analysis tools
//! - **JSON / text**: metrics summaries
//! - **Markdown**: optimisation report (winner, validation, top-N table)

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use scalplab_core::domain::{TradeKind, TradeLogEntry};
use scalplab_core::engine::BacktestResult;
use scalplab_core::metrics::{Metrics, TradeLogSummary};

use crate::data_loader::parse_time;
use crate::optimizer::OptimizationReport;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade log as CSV.
///
/// Columns: time, kind, entry, exit, gain, fee, size
pub fn export_trades_csv(trades: &[TradeLogEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "kind", "entry", "exit", "gain", "fee", "size"])?;
    for t in trades {
        wtr.write_record([
            t.time.format(TIME_FORMAT).to_string(),
            t.kind.to_string(),
            t.entry_price.to_string(),
            t.exit_price.to_string(),
            t.gain.to_string(),
            t.fee.to_string(),
            t.size.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    time: String,
    kind: String,
    entry: f64,
    exit: f64,
    gain: f64,
    fee: f64,
    size: f64,
}

/// Parse a trade log CSV produced by [`export_trades_csv`].
///
/// The file carries no entry time, so imported rows use the exit time.
pub fn import_trades_csv(csv_text: &str) -> Result<Vec<TradeLogEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());
    let mut trades = Vec::new();
    for (i, row) in rdr.deserialize::<TradeRow>().enumerate() {
        let row = row.with_context(|| format!("malformed trade row {}", i + 1))?;
        let time = parse_time(&row.time)
            .ok_or_else(|| anyhow!("row {}: unrecognised time '{}'", i + 1, row.time))?;
        let kind: TradeKind = row
            .kind
            .parse()
            .map_err(|e: String| anyhow!("row {}: {e}", i + 1))?;
        trades.push(TradeLogEntry {
            time,
            entry_time: time,
            kind,
            entry_price: row.entry,
            exit_price: row.exit,
            gain: row.gain,
            fee: row.fee,
            size: row.size,
        });
    }
    Ok(trades)
}

/// Read a trade log CSV from disk.
pub fn import_trade_log_csv(path: &Path) -> Result<Vec<TradeLogEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trade log {}", path.display()))?;
    import_trades_csv(&text)
}

/// Export an equity curve as CSV with bar_index and equity columns.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Summaries ──────────────────────────────────────────────────────

/// Metrics as `key: value` lines, rounded for display.
pub fn metrics_summary_text(m: &Metrics) -> String {
    format!(
        "trade_count: {}\nwin_rate: {:.2}\ntotal_profit: {:.2}\nrisk_adjusted_ratio: {:.4}\n",
        m.trade_count, m.win_rate, m.total_profit, m.risk_adjusted_ratio
    )
}

pub fn metrics_summary_json(m: &Metrics) -> Result<String> {
    serde_json::to_string_pretty(m).context("failed to serialize metrics to JSON")
}

/// Row-level trade log tally as `key: value` lines.
pub fn trade_log_summary_text(s: &TradeLogSummary) -> String {
    format!(
        "entries: {}\nwins: {}\nlosses: {}\nwin_rate: {:.2}\ntotal_gain: {:.2}\ntotal_fees: {:.2}\n",
        s.entries, s.wins, s.losses, s.win_rate, s.total_gain, s.total_fees
    )
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run under `output_dir/label/`:
/// - `trades.csv` — trade log
/// - `equity.csv` — equity curve
/// - `summary.json` — metrics
///
/// Returns the path to the created directory.
pub fn save_artifacts(output_dir: &Path, label: &str, result: &BacktestResult) -> Result<PathBuf> {
    let run_dir = output_dir.join(label);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    };
    write("trades.csv", export_trades_csv(&result.trades)?)?;
    write("equity.csv", export_equity_csv(&result.equity_curve)?)?;
    write("summary.json", metrics_summary_json(&result.metrics)?)?;

    Ok(run_dir)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for an optimizer run.
pub fn generate_report(report: &OptimizationReport, top: usize) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Optimisation Report\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Grid Size | {} |\n", report.grid_size));
    md.push_str(&format!("| Evaluated | {} |\n", report.evaluations.len()));
    if report.skipped > 0 {
        md.push_str(&format!("| Skipped (time budget) | {} |\n", report.skipped));
    }
    md.push_str(&format!(
        "| Bars | {} train / {} test |\n",
        report.train_bars, report.test_bars
    ));
    md.push_str(&format!(
        "| Elapsed | {:.1}s |\n",
        report.elapsed.as_secs_f64()
    ));
    if let Some(best) = &report.best_config {
        md.push_str(&format!("| Data | {} |\n", best.data_source));
        md.push_str(&format!("| Dataset Hash | {} |\n", best.dataset_hash));
    }
    md.push('\n');

    let Some(best) = &report.best else {
        md.push_str("No configuration was evaluated.\n");
        return md;
    };

    md.push_str("## Best Configuration\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    let c = &best.config;
    md.push_str(&format!("| Momentum Threshold | {} |\n", c.momentum_threshold));
    md.push_str(&format!("| Near TP (x ATR) | {} |\n", c.near_tp_multiple));
    md.push_str(&format!("| Far TP (x ATR) | {} |\n", c.far_tp_multiple));
    md.push_str(&format!("| Trailing (x ATR) | {} |\n", c.trailing_multiple));
    md.push_str(&format!("| Min Volatility | {} |\n", c.min_volatility));
    md.push_str(&format!("| Cooldown (min) | {} |\n", c.cooldown_minutes));
    md.push('\n');

    md.push_str("## Training vs Validation\n\n");
    md.push_str("| Metric | Train | Test |\n");
    md.push_str("| --- | --- | --- |\n");
    let train = &best.metrics;
    let test = report.validation.as_ref().map(|v| v.metrics).unwrap_or_default();
    md.push_str(&format!(
        "| Trades | {} | {} |\n",
        train.trade_count, test.trade_count
    ));
    md.push_str(&format!(
        "| Win Rate | {:.1}% | {:.1}% |\n",
        train.win_rate, test.win_rate
    ));
    md.push_str(&format!(
        "| Total Profit | {:.2} | {:.2} |\n",
        train.total_profit, test.total_profit
    ));
    md.push_str(&format!(
        "| Risk-Adjusted | {:.4} | {:.4} |\n",
        train.risk_adjusted_ratio, test.risk_adjusted_ratio
    ));
    md.push('\n');

    md.push_str(&format!("## Top {top} (training profit)\n\n"));
    md.push_str("| # | Momentum | Near | Far | Trailing | Min Vol | Cooldown | Trades | Win % | Profit |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for e in report.top_n(top) {
        let c = &e.config;
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {:.1} | {:.2} |\n",
            e.index,
            c.momentum_threshold,
            c.near_tp_multiple,
            c.far_tp_multiple,
            c.trailing_multiple,
            c.min_volatility,
            c.cooldown_minutes,
            e.metrics.trade_count,
            e.metrics.win_rate,
            e.metrics.total_profit
        ));
    }
    md.push('\n');

    md
}
