pub mod accounting;
pub mod codec;
pub mod columns;
pub mod commission;
pub mod config;
pub mod grid;
pub mod reader;
pub mod reconcile;
pub mod report;
pub mod statement;

pub use accounting::{AccountingDocument, AccountingExport, Candidate, ColumnKind, FieldValue};
pub use columns::{ColumnMapper, ColumnName};
pub use commission::CommissionDetector;
pub use config::{ConfigError, ReconcileConfig};
pub use grid::{Grid, HeaderSearch, InputError, Table};
pub use reader::LoadError;
pub use reconcile::{MatchTolerance, Reconciler, ToleranceError};
pub use report::{AccountingStats, Recommendation, ReconciliationReport, ReconciliationSummary};
pub use statement::{NormalizeOutcome, StatementNormalizer, StepCounts};

pub mod import {
    use std::path::Path;

    use cartola_core::CanonicalTransaction;

    use crate::*;

    /// Reads and normalizes a bank statement file with default settings.
    pub fn import_statement(path: &Path) -> Result<Vec<CanonicalTransaction>, LoadError> {
        let grid = crate::reader::read_grid(path)?;
        Ok(StatementNormalizer::default().normalize(&grid)?)
    }

    pub fn import_accounting(path: &Path) -> Result<AccountingExport, LoadError> {
        let grid = crate::reader::read_grid(path)?;
        Ok(AccountingExport::from_grid(&grid)?)
    }

    pub fn create_reconciler(
        date_tolerance_days: i64,
        amount_tolerance_fraction: f64,
    ) -> Result<Reconciler, ToleranceError> {
        Ok(Reconciler::new(MatchTolerance::new(
            date_tolerance_days,
            amount_tolerance_fraction,
        )?))
    }
}
