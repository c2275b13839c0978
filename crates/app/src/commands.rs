use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cartola_core::CanonicalTransaction;
use cartola_import::reader::read_grid;
use cartola_import::statement::to_grid;
use cartola_import::{
    AccountingExport, HeaderSearch, ReconcileConfig, Reconciler, StatementNormalizer, StepCounts,
};
use serde::Serialize;

use crate::OutputFormat;

#[derive(Debug, Serialize)]
pub struct NormalizeOutput {
    pub source: PathBuf,
    /// Zero-based row of the detected header, `None` when row 0 was assumed.
    pub header_row: Option<usize>,
    pub counts: StepCounts,
    pub transactions: Vec<CanonicalTransaction>,
}

pub fn normalize<W: Write>(
    path: &Path,
    format: OutputFormat,
    config: &ReconcileConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    let normalizer = config.normalizer().context("Invalid statement settings")?;
    let output = normalize_file(path, &normalizer)?;
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &output)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(&output.transactions, out)?,
    }
    Ok(())
}

pub fn reconcile<W: Write>(
    statement: &Path,
    accounting: &Path,
    config: &ReconcileConfig,
    out: &mut W,
) -> anyhow::Result<()> {
    let normalizer = config.normalizer().context("Invalid statement settings")?;
    let tolerance = config.tolerance().context("Invalid tolerance settings")?;

    let bank = normalize_file(statement, &normalizer)?.transactions;
    let grid = read_grid(accounting)
        .with_context(|| format!("Failed to read accounting export {}", accounting.display()))?;
    let export = AccountingExport::from_grid(&grid)
        .with_context(|| format!("Unusable accounting export {}", accounting.display()))?;

    if let Some(range) = export.date_range() {
        tracing::info!("Accounting documents span {range} ({} days)", range.days());
    }

    let report = Reconciler::new(tolerance).generate_report(&bank, &export);
    tracing::info!(
        "{}/{} expenses backed ({}%)",
        report.summary.backed_expenses,
        report.summary.total_expenses,
        report.summary.backing_rate_percent
    );
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied on top.
pub fn resolve_config(
    path: Option<&Path>,
    days: Option<i64>,
    fraction: Option<f64>,
) -> anyhow::Result<ReconcileConfig> {
    let mut config = match path {
        Some(p) => ReconcileConfig::load(p)
            .with_context(|| format!("Failed to load config {}", p.display()))?,
        None => ReconcileConfig::default(),
    };
    if let Some(days) = days {
        config.tolerance.date_days = days;
    }
    if let Some(fraction) = fraction {
        config.tolerance.amount_fraction = fraction;
    }
    Ok(config)
}

fn normalize_file(path: &Path, normalizer: &StatementNormalizer) -> anyhow::Result<NormalizeOutput> {
    let grid = read_grid(path).with_context(|| format!("Failed to read statement {}", path.display()))?;
    let outcome = normalizer
        .normalize_with_counts(&grid)
        .with_context(|| format!("Unusable statement {}", path.display()))?;
    let header_row = match outcome.header {
        HeaderSearch::Found { index } => Some(index),
        HeaderSearch::NotFound => None,
    };
    Ok(NormalizeOutput {
        source: path.to_path_buf(),
        header_row,
        counts: outcome.counts,
        transactions: outcome.transactions,
    })
}

fn write_csv<W: Write>(transactions: &[CanonicalTransaction], out: &mut W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in to_grid(transactions).rows() {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or_default()))?;
    }
    writer.flush()?;
    Ok(())
}
