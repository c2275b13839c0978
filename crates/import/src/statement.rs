//! Bank statement normalizer.
//!
//! Turns a raw sheet into [`CanonicalTransaction`]s through a fixed sequence
//! of steps. Each step consumes the previous step's rows and returns new ones;
//! the order matters (signs need the mapped columns, dedup needs the signs).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use cartola_core::{CanonicalTransaction, DebitCredit, Money, StatementLine, TransactionError};
use chrono::NaiveDate;
use serde::Serialize;

use crate::codec;
use crate::columns::{ColumnMapper, ColumnName};
use crate::commission::{normalize_description, CommissionDetector};
use crate::grid::{locate_header, Grid, HeaderSearch, InputError, Table, DEFAULT_HEADER_SCAN_ROWS};

/// Header row written by [`to_grid`]. Built from Spanish aliases so the header
/// scan always lands on row 0, whatever the descriptions below it contain.
pub const CANONICAL_HEADERS: [&str; 4] = ["fecha", "descripción movimiento", "monto", "cargo/abono"];

/// Trimmed text of the four columns the normalizer keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedRow {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub debit_credit: Option<String>,
}

/// Row counts after each filtering step, for logging by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepCounts {
    pub body_rows: usize,
    pub labelled: usize,
    pub after_commission_dedup: usize,
    pub after_exact_dedup: usize,
    pub valid: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub header: HeaderSearch,
    pub transactions: Vec<CanonicalTransaction>,
    pub counts: StepCounts,
}

#[derive(Debug, Clone)]
pub struct StatementNormalizer {
    pub mapper: ColumnMapper,
    pub commissions: CommissionDetector,
    pub header_scan_rows: usize,
}

impl Default for StatementNormalizer {
    fn default() -> Self {
        Self {
            mapper: ColumnMapper::default(),
            commissions: CommissionDetector::default(),
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
        }
    }
}

impl StatementNormalizer {
    pub fn new(mapper: ColumnMapper, commissions: CommissionDetector, header_scan_rows: usize) -> Self {
        Self { mapper, commissions, header_scan_rows }
    }

    pub fn normalize(&self, grid: &Grid) -> Result<Vec<CanonicalTransaction>, InputError> {
        Ok(self.normalize_with_counts(grid)?.transactions)
    }

    pub fn normalize_with_counts(&self, grid: &Grid) -> Result<NormalizeOutcome, InputError> {
        grid.ensure_usable()?;

        // 1. Header
        let header = locate_header(grid, self.header_scan_rows);
        if header == HeaderSearch::NotFound {
            tracing::warn!(
                "No header row within the first {} rows, using row 0",
                self.header_scan_rows
            );
        }
        let table = Table::from_grid(grid, header)?;

        // 2-3. Columns
        let columns = self.mapper.map(table.headers.as_slice());
        let projected = project(&table, &columns);
        let has_label_column = columns.contains(&ColumnName::DebitCredit);

        let mut counts = StepCounts { body_rows: projected.len(), ..StepCounts::default() };

        // 4-6. Amount, sign, date
        let lines: Vec<StatementLine> = projected
            .into_iter()
            .map(|row| stage_row(row, has_label_column))
            .collect();

        // 7.
        let lines = retain_labelled(lines);
        counts.labelled = lines.len();

        // 8.
        let lines = dedup_commissions(lines, &self.commissions);
        counts.after_commission_dedup = lines.len();

        // 9.
        let lines = dedup_exact(lines);
        counts.after_exact_dedup = lines.len();

        // 10-11.
        let transactions = validate_lines(lines);
        counts.valid = transactions.len();

        tracing::debug!(?counts, "Statement normalization steps");
        tracing::info!(
            "Normalized {} of {} statement rows",
            counts.valid,
            counts.body_rows
        );

        Ok(NormalizeOutcome { header, transactions, counts })
    }
}

/// Keeps the date, description, amount and debit/credit columns (first
/// occurrence of each) as trimmed text. An absent column reads as empty
/// cells, so its rows fail validation later instead of failing the sheet.
pub fn project(table: &Table, columns: &[ColumnName]) -> Vec<ProjectedRow> {
    let find = |name: &ColumnName| columns.iter().position(|c| c == name);

    let required = [ColumnName::Date, ColumnName::Description, ColumnName::Amount];
    let missing: Vec<&str> = required
        .iter()
        .filter(|name| find(*name).is_none())
        .map(ColumnName::as_str)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "Statement header lacks required columns; no rows will validate");
    }

    let date = find(&ColumnName::Date);
    let description = find(&ColumnName::Description);
    let amount = find(&ColumnName::Amount);
    let debit_credit = find(&ColumnName::DebitCredit);

    let text = |row: &[Option<String>], idx: Option<usize>| {
        idx.and_then(|idx| row.get(idx))
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    table
        .rows
        .iter()
        .map(|row| {
            let row = row.as_slice();
            ProjectedRow {
                date: text(row, date),
                description: text(row, description),
                amount: text(row, amount),
                debit_credit: debit_credit.map(|idx| text(row, Some(idx))),
            }
        })
        .collect()
}

/// Steps 4-6: parse the amount, resolve sign and label, parse the date.
pub fn stage_row(row: ProjectedRow, has_label_column: bool) -> StatementLine {
    let amount = codec::parse_amount(&row.amount);
    let (amount, debit_credit) = if has_label_column {
        apply_sign(amount, row.debit_credit.as_deref().unwrap_or_default())
    } else {
        (amount, amount.and_then(DebitCredit::from_sign))
    };
    StatementLine {
        date: codec::parse_date(&row.date),
        description: row.description,
        amount,
        debit_credit,
    }
}

/// Forces `|amount|` negative for CARGO and positive otherwise.
///
/// A missing or unrecognized label keeps the positive sign (credit). That is
/// the historical business default; such rows carry no label and are
/// dropped by [`retain_labelled`].
pub fn apply_sign(amount: Option<Money>, label: &str) -> (Option<Money>, Option<DebitCredit>) {
    let debit_credit = DebitCredit::from_label(label);
    let signed = amount.map(|a| match debit_credit {
        Some(DebitCredit::Cargo) => -a.abs(),
        _ => a.abs(),
    });
    (signed, debit_credit)
}

/// Step 7: summary and balance rows have no ABONO/CARGO label.
pub fn retain_labelled(lines: Vec<StatementLine>) -> Vec<StatementLine> {
    lines.into_iter().filter(|l| l.debit_credit.is_some()).collect()
}

/// Step 8: among commission rows sharing `(date, normalized description)`,
/// keep only the largest `|amount|`. Ties keep the first row seen. Rows
/// without a date are not grouped.
pub fn dedup_commissions(lines: Vec<StatementLine>, detector: &CommissionDetector) -> Vec<StatementLine> {
    let magnitude = |line: &StatementLine| line.amount.map(Money::abs);

    let mut is_commission = vec![false; lines.len()];
    let mut winners: HashMap<(NaiveDate, String), usize> = HashMap::new();

    for (idx, line) in lines.iter().enumerate() {
        if !detector.is_commission(&line.description) {
            continue;
        }
        is_commission[idx] = true;
        let Some(date) = line.date else {
            continue;
        };
        match winners.entry((date, normalize_description(&line.description))) {
            Entry::Vacant(e) => {
                e.insert(idx);
            }
            Entry::Occupied(mut e) => {
                if magnitude(line) > magnitude(&lines[*e.get()]) {
                    e.insert(idx);
                }
            }
        }
    }

    let keep: HashSet<usize> = winners.into_values().collect();
    lines
        .into_iter()
        .enumerate()
        .filter(|(idx, line)| !is_commission[*idx] || line.date.is_none() || keep.contains(idx))
        .map(|(_, line)| line)
        .collect()
}

/// Step 9: drop exact repeats of `(date, description, amount, label)`.
pub fn dedup_exact(lines: Vec<StatementLine>) -> Vec<StatementLine> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|l| seen.insert((l.date, l.description.clone(), l.amount, l.debit_credit)))
        .collect()
}

/// Steps 10-11: rows missing a date, description or amount (or whose amount
/// is zero) are not transactions. Order is preserved.
pub fn validate_lines(lines: Vec<StatementLine>) -> Vec<CanonicalTransaction> {
    let mut rejected: HashMap<String, usize> = HashMap::new();
    let valid: Vec<CanonicalTransaction> = lines
        .into_iter()
        .filter_map(|line| match CanonicalTransaction::validate(line) {
            Ok(tx) => Some(tx),
            Err(e) => {
                *rejected.entry(rejection_kind(&e).to_string()).or_default() += 1;
                None
            }
        })
        .collect();
    if !rejected.is_empty() {
        tracing::debug!(?rejected, "Dropped invalid statement rows");
    }
    valid
}

fn rejection_kind(e: &TransactionError) -> &'static str {
    match e {
        TransactionError::MissingDate => "missing_date",
        TransactionError::MissingDescription => "missing_description",
        TransactionError::MissingAmount => "missing_amount",
        TransactionError::ZeroAmount => "zero_amount",
        TransactionError::MissingDebitCredit => "missing_debit_credit",
        TransactionError::SignMismatch { .. } => "sign_mismatch",
    }
}

/// Renders transactions back into a sheet with [`CANONICAL_HEADERS`], amounts
/// in the locale format so the sheet normalizes to the same transactions.
pub fn to_grid(transactions: &[CanonicalTransaction]) -> Grid {
    let mut rows = Vec::with_capacity(transactions.len() + 1);
    rows.push(CANONICAL_HEADERS.iter().map(|h| Some(h.to_string())).collect());
    rows.extend(transactions.iter().map(|tx| {
        vec![
            Some(codec::to_iso(tx.date())),
            Some(tx.description().to_string()),
            Some(codec::format_amount(tx.amount())),
            Some(tx.debit_credit().to_string()),
        ]
    }));
    Grid::new(rows)
}
