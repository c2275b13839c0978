use cartola_core::{CanonicalTransaction, Money};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::accounting::{AccountingExport, Candidate};

pub const DEFAULT_DATE_TOLERANCE_DAYS: i64 = 5;
pub const DEFAULT_AMOUNT_TOLERANCE_FRACTION: f64 = 0.05;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToleranceError {
    #[error("Date tolerance must be zero or more days, got {0}")]
    NegativeDays(i64),
    #[error("Amount tolerance must be a fraction between 0 and 1, got {0}")]
    FractionOutOfRange(f64),
}

/// How far apart a bank expense and an accounting document may be and still
/// count as the same movement. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchTolerance {
    date_tolerance_days: i64,
    amount_tolerance_fraction: Decimal,
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self {
            date_tolerance_days: DEFAULT_DATE_TOLERANCE_DAYS,
            amount_tolerance_fraction: Decimal::new(5, 2),
        }
    }
}

impl MatchTolerance {
    pub fn new(date_tolerance_days: i64, amount_tolerance_fraction: f64) -> Result<Self, ToleranceError> {
        if date_tolerance_days < 0 {
            return Err(ToleranceError::NegativeDays(date_tolerance_days));
        }
        if !(0.0..=1.0).contains(&amount_tolerance_fraction) {
            return Err(ToleranceError::FractionOutOfRange(amount_tolerance_fraction));
        }
        // Go through the shortest decimal rendering so 0.05 stays exactly 0.05.
        let fraction = Decimal::from_str(&amount_tolerance_fraction.to_string())
            .map_err(|_| ToleranceError::FractionOutOfRange(amount_tolerance_fraction))?;
        Ok(Self { date_tolerance_days, amount_tolerance_fraction: fraction })
    }

    pub fn date_tolerance_days(&self) -> i64 {
        self.date_tolerance_days
    }

    pub fn amount_tolerance_fraction(&self) -> Decimal {
        self.amount_tolerance_fraction
    }

    /// `| |expense| - doc | <= |expense| * fraction`, relative to the expense.
    pub fn amount_matches(&self, expense: Money, document: Money) -> bool {
        let magnitude = expense.abs().amount();
        (magnitude - document.amount()).abs() <= magnitude * self.amount_tolerance_fraction
    }

    pub fn date_matches(&self, expense: NaiveDate, document: NaiveDate) -> bool {
        (expense - document).num_days().abs() <= self.date_tolerance_days
    }

    pub fn matches(&self, expense: &CanonicalTransaction, candidate: &Candidate) -> bool {
        self.amount_matches(expense.amount(), candidate.amount)
            && self.date_matches(expense.date(), candidate.date)
    }
}

/// Decides which bank expenses have documentary backing.
///
/// A match is existential: one document may back several expenses and an
/// expense needs only one document. This is not a one-to-one assignment.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    pub tolerance: MatchTolerance,
}

impl Reconciler {
    pub fn new(tolerance: MatchTolerance) -> Self {
        Self { tolerance }
    }

    /// Expenses (`amount < 0`) with no qualifying document, in bank order.
    pub fn find_unbacked(
        &self,
        bank: &[CanonicalTransaction],
        export: &AccountingExport,
    ) -> Vec<CanonicalTransaction> {
        let index = CandidateIndex::new(export.candidates());
        let unbacked: Vec<CanonicalTransaction> = bank
            .iter()
            .filter(|tx| tx.is_expense())
            .filter(|tx| !index.any_match(tx, &self.tolerance))
            .cloned()
            .collect();
        tracing::info!(
            "{} unbacked expenses against {} accounting candidates",
            unbacked.len(),
            index.len()
        );
        unbacked
    }
}

/// Candidates sorted by date so each expense only inspects the documents
/// inside its date window. Decides exactly as a scan over every candidate.
struct CandidateIndex {
    by_date: Vec<Candidate>,
}

impl CandidateIndex {
    fn new(mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by_key(|c| c.date);
        Self { by_date: candidates }
    }

    fn len(&self) -> usize {
        self.by_date.len()
    }

    fn any_match(&self, expense: &CanonicalTransaction, tolerance: &MatchTolerance) -> bool {
        let date = expense.date();
        let bounds = Duration::try_days(tolerance.date_tolerance_days()).and_then(|window| {
            Some((date.checked_sub_signed(window)?, date.checked_add_signed(window)?))
        });
        // A window wider than the calendar covers every candidate.
        let Some((from, to)) = bounds else {
            return self.by_date.iter().any(|c| tolerance.matches(expense, c));
        };
        let start = self.by_date.partition_point(|c| c.date < from);
        let end = self.by_date.partition_point(|c| c.date <= to);
        self.by_date[start..end]
            .iter()
            .any(|c| tolerance.amount_matches(expense.amount(), c.amount))
    }
}
