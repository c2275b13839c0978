use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use cartola_core::{CanonicalTransaction, DateRange, Money};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use crate::accounting::AccountingExport;
use crate::reconcile::Reconciler;

pub const HIGH_RISK_PESOS: i64 = 1_000_000;
pub const MEDIUM_RISK_PESOS: i64 = 500_000;
const MAX_PATTERNS: usize = 3;
const MIN_PATTERN_OCCURRENCES: usize = 2;

fn re_keyword() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\b\w{4,}\b").expect("invalid regex"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    pub total_expenses: usize,
    pub backed_expenses: usize,
    pub unbacked_expenses: usize,
    pub backing_rate_percent: f64,
    /// Signed sum, so usually negative.
    pub unbacked_amount: Money,
    pub total_expenses_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountingStats {
    pub total_documents: usize,
    pub date_range: Option<DateRange>,
}

/// Advice attached to a report; serialized as its display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    AllBacked,
    UnbackedCount(usize),
    HighRisk,
    MediumRisk,
    RecurringPatterns(Vec<String>),
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::AllBacked => {
                write!(f, "Excelente: todos los gastos tienen respaldo documental")
            }
            Recommendation::UnbackedCount(n) => write!(f, "Se encontraron {n} gastos sin respaldo"),
            Recommendation::HighRisk => write!(
                f,
                "Alto riesgo: monto sin respaldo supera {}",
                Money::from_pesos(HIGH_RISK_PESOS)
            ),
            Recommendation::MediumRisk => write!(
                f,
                "Riesgo medio: monto sin respaldo supera {}",
                Money::from_pesos(MEDIUM_RISK_PESOS)
            ),
            Recommendation::RecurringPatterns(words) => {
                write!(f, "Patrones frecuentes sin respaldo: {}", words.join(", "))
            }
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    pub unbacked_transactions: Vec<CanonicalTransaction>,
    pub recommendations: Vec<Recommendation>,
    pub accounting_stats: AccountingStats,
}

impl Reconciler {
    /// Runs the match and summarizes it. Recomputed on every call.
    pub fn generate_report(
        &self,
        bank: &[CanonicalTransaction],
        export: &AccountingExport,
    ) -> ReconciliationReport {
        let unbacked = self.find_unbacked(bank, export);

        let expenses: Vec<&CanonicalTransaction> = bank.iter().filter(|t| t.is_expense()).collect();
        let total_expenses = expenses.len();
        let backed_expenses = total_expenses - unbacked.len();
        let backing_rate_percent = backing_rate(backed_expenses, total_expenses);

        let summary = ReconciliationSummary {
            total_expenses,
            backed_expenses,
            unbacked_expenses: unbacked.len(),
            backing_rate_percent,
            unbacked_amount: unbacked.iter().map(|t| t.amount()).sum(),
            total_expenses_amount: expenses.iter().map(|t| t.amount()).sum(),
        };

        ReconciliationReport {
            recommendations: recommendations(&unbacked),
            summary,
            unbacked_transactions: unbacked,
            accounting_stats: AccountingStats {
                total_documents: export.len(),
                date_range: export.date_range(),
            },
        }
    }
}

/// Percentage of `backed` over `total`, one decimal, ties to even; 0 when
/// there is nothing to back.
pub fn backing_rate(backed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = Decimal::from(backed) * Decimal::ONE_HUNDRED / Decimal::from(total);
    percent
        .round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven)
        .to_f64()
        .unwrap_or_default()
}

pub fn recommendations(unbacked: &[CanonicalTransaction]) -> Vec<Recommendation> {
    if unbacked.is_empty() {
        return vec![Recommendation::AllBacked];
    }

    let mut out = vec![Recommendation::UnbackedCount(unbacked.len())];

    let exposure: Money = unbacked.iter().map(|t| t.amount()).sum::<Money>().abs();
    if exposure > Money::from_pesos(HIGH_RISK_PESOS) {
        out.push(Recommendation::HighRisk);
    } else if exposure > Money::from_pesos(MEDIUM_RISK_PESOS) {
        out.push(Recommendation::MediumRisk);
    }

    let patterns = recurring_keywords(unbacked.iter().map(|t| t.description()));
    if !patterns.is_empty() {
        out.push(Recommendation::RecurringPatterns(
            patterns.into_iter().take(MAX_PATTERNS).collect(),
        ));
    }
    out
}

/// Uppercased words of four or more characters that show up in at least two
/// descriptions, most frequent first (ties by first appearance).
pub fn recurring_keywords<'a, I>(descriptions: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for desc in descriptions {
        let upper = desc.to_uppercase();
        let mut seen_here: HashSet<&str> = HashSet::new();
        for word in re_keyword().find_iter(&upper).map(|m| m.as_str()) {
            if !seen_here.insert(word) {
                continue;
            }
            match counts.get_mut(word) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(word.to_string(), 1);
                    order.push(word.to_string());
                }
            }
        }
    }

    let mut ranked: Vec<String> = order
        .into_iter()
        .filter(|w| counts[w] >= MIN_PATTERN_OCCURRENCES)
        .collect();
    // Stable sort: equal counts keep first-appearance order.
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));
    ranked
}
