//! Accounting-system export loader.
//!
//! Headers are normalized, amount-like and date-like columns are parsed with
//! the locale codec, and each row gets one representative amount and date for
//! matching. Everything else is kept verbatim for display.

use cartola_core::{DateRange, Money};
use chrono::NaiveDate;
use serde::Serialize;

use crate::codec;
use crate::grid::{Grid, HeaderSearch, InputError, Table};

/// Columns whose name contains one of these are parsed as amounts.
pub const AMOUNT_KEYWORDS: &[&str] = &["total", "neto", "iva", "monto", "valor"];

/// Subset of [`AMOUNT_KEYWORDS`] eligible as a row's representative amount.
/// The tax column alone never stands for the document.
pub const REPRESENTATIVE_AMOUNT_KEYWORDS: &[&str] = &["total", "monto", "valor", "neto"];

/// Columns whose name contains one of these are parsed as dates.
pub const DATE_KEYWORDS: &[&str] = &["fecha", "date"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Amount,
    Date,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Amount(Option<Money>),
    Date(Option<NaiveDate>),
    Text(Option<String>),
}

/// One export row. `fields` follows the export's column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountingDocument {
    pub fields: Vec<FieldValue>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
}

impl AccountingDocument {
    /// Only documents with both a representative amount and date can back
    /// a bank movement.
    pub fn is_matchable(&self) -> bool {
        self.amount.is_some() && self.date.is_some()
    }
}

/// A document reduced to what the matcher reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub date: NaiveDate,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountingExport {
    pub headers: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub documents: Vec<AccountingDocument>,
    /// Index into `headers` of the representative amount column.
    pub amount_column: Option<usize>,
    /// Index into `headers` of the representative date column.
    pub date_column: Option<usize>,
}

/// `"Fecha Documento"` → `"fecha_documento"`.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

pub fn classify_column(name: &str) -> ColumnKind {
    if DATE_KEYWORDS.iter().any(|k| name.contains(k)) {
        ColumnKind::Date
    } else if AMOUNT_KEYWORDS.iter().any(|k| name.contains(k)) {
        ColumnKind::Amount
    } else {
        ColumnKind::Text
    }
}

impl AccountingExport {
    /// Loads an export whose first row is its header.
    pub fn from_grid(grid: &Grid) -> Result<Self, InputError> {
        let table = Table::from_grid(grid, HeaderSearch::NotFound)?;
        let headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
        let kinds: Vec<ColumnKind> = headers.iter().map(|h| classify_column(h)).collect();

        let amount_column = headers.iter().enumerate().position(|(idx, h)| {
            kinds[idx] == ColumnKind::Amount
                && REPRESENTATIVE_AMOUNT_KEYWORDS.iter().any(|k| h.contains(k))
        });
        let date_column = kinds.iter().position(|k| *k == ColumnKind::Date);

        let documents: Vec<AccountingDocument> = table
            .rows
            .iter()
            .map(|row| {
                let fields: Vec<FieldValue> = row
                    .iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| parse_field(cell.as_deref(), *kind))
                    .collect();
                let amount = amount_column.and_then(|idx| match fields[idx] {
                    FieldValue::Amount(a) => a,
                    _ => None,
                });
                let date = date_column.and_then(|idx| match fields[idx] {
                    FieldValue::Date(d) => d,
                    _ => None,
                });
                AccountingDocument { fields, amount, date }
            })
            .collect();

        let export = AccountingExport { headers, kinds, documents, amount_column, date_column };
        tracing::info!(
            "Loaded {} accounting documents ({} matchable)",
            export.documents.len(),
            export.candidates().len()
        );
        if amount_column.is_none() || date_column.is_none() {
            tracing::warn!(
                amount_column = ?amount_column,
                date_column = ?date_column,
                "Accounting export lacks an amount or date column; nothing can be matched"
            );
        }
        Ok(export)
    }

    /// Documents with a representative amount and date, in export order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.documents
            .iter()
            .filter_map(|doc| match (doc.date, doc.amount) {
                (Some(date), Some(amount)) => Some(Candidate { date, amount }),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Earliest and latest representative date, if any document has one.
    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::spanning(self.documents.iter().filter_map(|doc| doc.date))
    }
}

fn parse_field(cell: Option<&str>, kind: ColumnKind) -> FieldValue {
    let cell = cell.map(str::trim).filter(|s| !s.is_empty());
    match kind {
        ColumnKind::Amount => FieldValue::Amount(cell.and_then(codec::clean_amount)),
        ColumnKind::Date => FieldValue::Date(cell.and_then(codec::parse_date)),
        ColumnKind::Text => FieldValue::Text(cell.map(str::to_string)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn export() -> AccountingExport {
        AccountingExport::from_grid(&Grid::from_strings(vec![
            vec!["Folio", "Fecha Documento", "Neto", "IVA", "Total", "Razón Social"],
            vec!["101", "03/02/2025", "8.571", "1.629", "10.200", "Proveedor Uno"],
            vec!["102", "fecha mala", "1.000", "190", "1.190", "Proveedor Dos"],
            vec!["103", "05/02/2025", "", "", "", "Proveedor Tres"],
        ]))
        .unwrap()
    }

    #[test]
    fn headers_are_normalized() {
        assert_eq!(normalize_header(" Fecha Documento "), "fecha_documento");
        assert_eq!(export().headers[5], "razón_social");
    }

    #[test]
    fn classifies_columns_by_keyword() {
        assert_eq!(
            export().kinds,
            vec![
                ColumnKind::Text,
                ColumnKind::Date,
                ColumnKind::Amount,
                ColumnKind::Amount,
                ColumnKind::Amount,
                ColumnKind::Text
            ]
        );
        assert_eq!(classify_column("valor_total"), ColumnKind::Amount);
        assert_eq!(classify_column("update_date"), ColumnKind::Date);
    }

    #[test]
    fn first_amount_like_column_is_representative() {
        let export = export();
        // "neto" precedes "total" in column order.
        assert_eq!(export.amount_column, Some(2));
        assert_eq!(export.documents[0].amount, Some(Money::from_pesos(8571)));
        assert_eq!(export.date_column, Some(1));
    }

    #[test]
    fn iva_is_never_representative() {
        let export = AccountingExport::from_grid(&Grid::from_strings(vec![
            vec!["fecha", "iva", "monto_total"],
            vec!["01/02/2025", "1.900", "11.900"],
        ]))
        .unwrap();
        assert_eq!(export.amount_column, Some(2));
        assert_eq!(export.documents[0].amount, Some(Money::from_pesos(11_900)));
        assert_eq!(export.documents[0].fields[1], FieldValue::Amount(Some(Money::from_pesos(1900))));
    }

    #[test]
    fn unparseable_rows_stay_loaded_but_are_not_candidates() {
        let export = export();
        assert_eq!(export.len(), 3);
        assert!(!export.documents[1].is_matchable());
        assert!(!export.documents[2].is_matchable());
        assert_eq!(
            export.candidates(),
            vec![Candidate { date: ymd(2025, 2, 3), amount: Money::from_pesos(8571) }]
        );
    }

    #[test]
    fn other_columns_kept_verbatim() {
        let export = export();
        assert_eq!(
            export.documents[0].fields[5],
            FieldValue::Text(Some("Proveedor Uno".to_string()))
        );
        assert_eq!(export.documents[0].fields[0], FieldValue::Text(Some("101".to_string())));
    }

    #[test]
    fn currency_symbols_are_tolerated() {
        let export = AccountingExport::from_grid(&Grid::from_strings(vec![
            vec!["fecha", "monto"],
            vec!["01/02/2025", "$ 10.200"],
        ]))
        .unwrap();
        assert_eq!(export.documents[0].amount, Some(Money::from_pesos(10_200)));
    }

    #[test]
    fn date_range_spans_documents() {
        let range = export().date_range().unwrap();
        assert_eq!(range.start, ymd(2025, 2, 3));
        assert_eq!(range.end, ymd(2025, 2, 5));
    }

    #[test]
    fn empty_grid_is_structural() {
        assert_eq!(AccountingExport::from_grid(&Grid::default()), Err(InputError::EmptyGrid));
    }
}
