use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::money::Money;

/// Direction of a bank movement as printed on Chilean statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DebitCredit {
    /// Credit / inflow.
    Abono,
    /// Debit / outflow.
    Cargo,
}

impl DebitCredit {
    /// Resolves a raw statement label. Accepts the full words and the
    /// single-letter codes `A` / `C`, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "ABONO" | "A" => Some(DebitCredit::Abono),
            "CARGO" | "C" => Some(DebitCredit::Cargo),
            _ => None,
        }
    }

    /// Label implied by the sign of an amount; zero has no direction.
    pub fn from_sign(amount: Money) -> Option<Self> {
        if amount.is_negative() {
            Some(DebitCredit::Cargo)
        } else if amount.is_positive() {
            Some(DebitCredit::Abono)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DebitCredit::Abono => "ABONO",
            DebitCredit::Cargo => "CARGO",
        }
    }
}

impl fmt::Display for DebitCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DebitCredit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DebitCredit::from_label(s).ok_or_else(|| format!("Unknown debit/credit label: '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Transaction has no date")]
    MissingDate,
    #[error("Transaction has no description")]
    MissingDescription,
    #[error("Transaction has no amount")]
    MissingAmount,
    #[error("Transaction amount is zero")]
    ZeroAmount,
    #[error("Transaction has no ABONO/CARGO label")]
    MissingDebitCredit,
    #[error("Amount {amount} contradicts label {label}")]
    SignMismatch { amount: Money, label: DebitCredit },
}

/// A statement row while it is still being normalized. Every field may be
/// absent; nothing about it is trusted yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementLine {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Option<Money>,
    pub debit_credit: Option<DebitCredit>,
}

/// A normalized bank movement. Immutable once built; the only way to get one
/// is [`CanonicalTransaction::validate`], which guarantees
/// `amount < 0 <=> CARGO` and `amount > 0 <=> ABONO`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalTransaction {
    date: NaiveDate,
    description: String,
    amount: Money,
    debit_credit: DebitCredit,
}

impl CanonicalTransaction {
    pub fn validate(line: StatementLine) -> Result<CanonicalTransaction, TransactionError> {
        let amount = line.amount.ok_or(TransactionError::MissingAmount)?;
        let date = line.date.ok_or(TransactionError::MissingDate)?;

        let description = line.description.trim();
        if description.is_empty() {
            return Err(TransactionError::MissingDescription);
        }

        let label = line.debit_credit.ok_or(TransactionError::MissingDebitCredit)?;
        match DebitCredit::from_sign(amount) {
            None => return Err(TransactionError::ZeroAmount),
            Some(implied) if implied != label => {
                return Err(TransactionError::SignMismatch { amount, label });
            }
            Some(_) => {}
        }

        Ok(CanonicalTransaction {
            date,
            description: description.to_string(),
            amount,
            debit_credit: label,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn debit_credit(&self) -> DebitCredit {
        self.debit_credit
    }

    pub fn is_expense(&self) -> bool {
        self.amount.is_negative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn line(amount: i64, label: Option<DebitCredit>) -> StatementLine {
        StatementLine {
            date: Some(date(2025, 1, 1)),
            description: "Compra Super".to_string(),
            amount: Some(Money::from_pesos(amount)),
            debit_credit: label,
        }
    }

    #[test]
    fn labels_resolve_words_and_letters() {
        assert_eq!(DebitCredit::from_label("abono"), Some(DebitCredit::Abono));
        assert_eq!(DebitCredit::from_label(" C "), Some(DebitCredit::Cargo));
        assert_eq!(DebitCredit::from_label("a"), Some(DebitCredit::Abono));
        assert_eq!(DebitCredit::from_label("SALDO"), None);
        assert_eq!(DebitCredit::from_label(""), None);
    }

    #[test]
    fn label_from_sign() {
        assert_eq!(DebitCredit::from_sign(Money::from_pesos(-5)), Some(DebitCredit::Cargo));
        assert_eq!(DebitCredit::from_sign(Money::from_pesos(5)), Some(DebitCredit::Abono));
        assert_eq!(DebitCredit::from_sign(Money::zero()), None);
    }

    #[test]
    fn validate_accepts_consistent_cargo() {
        let tx = CanonicalTransaction::validate(line(-50_000, Some(DebitCredit::Cargo))).unwrap();
        assert_eq!(tx.amount(), Money::from_pesos(-50_000));
        assert_eq!(tx.debit_credit(), DebitCredit::Cargo);
        assert!(tx.is_expense());
    }

    #[test]
    fn validate_trims_description() {
        let mut l = line(100, Some(DebitCredit::Abono));
        l.description = "  Deposito  ".to_string();
        let tx = CanonicalTransaction::validate(l).unwrap();
        assert_eq!(tx.description(), "Deposito");
    }

    #[test]
    fn validate_rejects_sign_mismatch() {
        assert!(matches!(
            CanonicalTransaction::validate(line(100, Some(DebitCredit::Cargo))),
            Err(TransactionError::SignMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut l = line(100, Some(DebitCredit::Abono));
        l.date = None;
        assert_eq!(CanonicalTransaction::validate(l), Err(TransactionError::MissingDate));

        let mut l = line(100, Some(DebitCredit::Abono));
        l.amount = None;
        assert_eq!(CanonicalTransaction::validate(l), Err(TransactionError::MissingAmount));

        let mut l = line(100, Some(DebitCredit::Abono));
        l.description = "   ".to_string();
        assert_eq!(CanonicalTransaction::validate(l), Err(TransactionError::MissingDescription));

        assert_eq!(
            CanonicalTransaction::validate(line(100, None)),
            Err(TransactionError::MissingDebitCredit)
        );
    }

    #[test]
    fn validate_rejects_zero_amount() {
        assert_eq!(
            CanonicalTransaction::validate(line(0, Some(DebitCredit::Abono))),
            Err(TransactionError::ZeroAmount)
        );
    }

    #[test]
    fn serializes_with_iso_date_and_upper_label() {
        let tx = CanonicalTransaction::validate(line(-1500, Some(DebitCredit::Cargo))).unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["date"], "2025-01-01");
        assert_eq!(json["debit_credit"], "CARGO");
        assert_eq!(json["description"], "Compra Super");
    }
}
