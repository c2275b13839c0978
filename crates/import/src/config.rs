//! Reconciliation settings loaded from TOML.
//!
//! ```toml
//! [tolerance]
//! date_days = 5
//! amount_fraction = 0.05
//!
//! [statement]
//! header_scan_rows = 50
//! extra_commission_patterns = ['impuesto\s+timbre']
//!
//! [statement.column_aliases]
//! glosa = "description"
//! ```
//!
//! Every key is optional. Values are only checked when turned into the
//! matcher or normalizer they configure.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::columns::{ColumnMapper, ColumnName};
use crate::commission::{CommissionDetector, COMMISSION_PATTERNS};
use crate::grid::DEFAULT_HEADER_SCAN_ROWS;
use crate::reconcile::{
    MatchTolerance, ToleranceError, DEFAULT_AMOUNT_TOLERANCE_FRACTION, DEFAULT_DATE_TOLERANCE_DAYS,
};
use crate::statement::StatementNormalizer;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Tolerance(#[from] ToleranceError),
    #[error("Invalid commission pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub statement: StatementConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    #[serde(default = "default_date_days")]
    pub date_days: i64,
    #[serde(default = "default_amount_fraction")]
    pub amount_fraction: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            date_days: DEFAULT_DATE_TOLERANCE_DAYS,
            amount_fraction: DEFAULT_AMOUNT_TOLERANCE_FRACTION,
        }
    }
}

fn default_date_days() -> i64 {
    DEFAULT_DATE_TOLERANCE_DAYS
}

fn default_amount_fraction() -> f64 {
    DEFAULT_AMOUNT_TOLERANCE_FRACTION
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementConfig {
    #[serde(default = "default_header_scan_rows")]
    pub header_scan_rows: usize,
    /// Added to the built-in commission patterns, not replacing them.
    #[serde(default)]
    pub extra_commission_patterns: Vec<String>,
    /// Header (case-insensitive) to column name, on top of the built-in aliases.
    #[serde(default)]
    pub column_aliases: BTreeMap<String, ColumnName>,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            extra_commission_patterns: Vec::new(),
            column_aliases: BTreeMap::new(),
        }
    }
}

fn default_header_scan_rows() -> usize {
    DEFAULT_HEADER_SCAN_ROWS
}

impl ReconcileConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&input)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded config");
        Ok(config)
    }

    pub fn tolerance(&self) -> Result<MatchTolerance, ConfigError> {
        Ok(MatchTolerance::new(
            self.tolerance.date_days,
            self.tolerance.amount_fraction,
        )?)
    }

    pub fn normalizer(&self) -> Result<StatementNormalizer, ConfigError> {
        let statement = &self.statement;
        let commissions = if statement.extra_commission_patterns.is_empty() {
            CommissionDetector::default()
        } else {
            let patterns: Vec<&str> = COMMISSION_PATTERNS
                .iter()
                .copied()
                .chain(statement.extra_commission_patterns.iter().map(String::as_str))
                .collect();
            CommissionDetector::new(patterns.as_slice())?
        };
        let mapper = ColumnMapper::with_aliases(
            statement
                .column_aliases
                .iter()
                .map(|(alias, name)| (alias.as_str(), name.clone())),
        );
        Ok(StatementNormalizer::new(mapper, commissions, statement.header_scan_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ReconcileConfig::from_toml("").unwrap();
        assert_eq!(config, ReconcileConfig::default());
        assert_eq!(config.tolerance().unwrap(), MatchTolerance::default());
        assert_eq!(config.normalizer().unwrap().header_scan_rows, DEFAULT_HEADER_SCAN_ROWS);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = ReconcileConfig::from_toml("[tolerance]\ndate_days = 3\n").unwrap();
        let tolerance = config.tolerance().unwrap();
        assert_eq!(tolerance.date_tolerance_days(), 3);
        assert_eq!(tolerance.amount_tolerance_fraction(), Decimal::new(5, 2));
    }

    #[test]
    fn statement_section_configures_normalizer() {
        let config = ReconcileConfig::from_toml(
            r#"
[statement]
header_scan_rows = 10
extra_commission_patterns = ['impuesto\s+timbre']

[statement.column_aliases]
"Glosa" = "description"
"#,
        )
        .unwrap();
        let normalizer = config.normalizer().unwrap();
        assert_eq!(normalizer.header_scan_rows, 10);
        assert!(normalizer.commissions.is_commission("IMPUESTO TIMBRE"));
        assert!(normalizer.commissions.is_commission("Comisión Mantención"));
        assert_eq!(normalizer.mapper.map_header("glosa"), ColumnName::Description);
        assert_eq!(normalizer.mapper.map_header("Monto"), ColumnName::Amount);
    }

    #[test]
    fn out_of_range_tolerance_is_rejected_on_use() {
        let config = ReconcileConfig::from_toml("[tolerance]\namount_fraction = 1.5\n").unwrap();
        assert!(matches!(
            config.tolerance(),
            Err(ConfigError::Tolerance(ToleranceError::FractionOutOfRange(_)))
        ));
    }

    #[test]
    fn bad_pattern_is_rejected_on_use() {
        let config =
            ReconcileConfig::from_toml("[statement]\nextra_commission_patterns = ['(']\n").unwrap();
        assert!(matches!(config.normalizer(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        assert!(matches!(
            ReconcileConfig::from_toml("[tolerance]\ndays = 5\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cartola.toml");
        std::fs::write(&path, "[tolerance]\ndate_days = 0\namount_fraction = 0.0\n").unwrap();
        let tolerance = ReconcileConfig::load(&path).unwrap().tolerance().unwrap();
        assert_eq!(tolerance, MatchTolerance::new(0, 0.0).unwrap());
        assert!(matches!(
            ReconcileConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
