use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Internal column vocabulary a statement is mapped onto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnName {
    Date,
    Description,
    Amount,
    DebitCredit,
    DocumentNumber,
    Branch,
    /// Any header outside the table, normalized (trimmed, lowercased,
    /// spaces to underscores).
    Other(String),
}

impl ColumnName {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnName::Date => "date",
            ColumnName::Description => "description",
            ColumnName::Amount => "amount",
            ColumnName::DebitCredit => "debit_credit",
            ColumnName::DocumentNumber => "document_number",
            ColumnName::Branch => "branch",
            ColumnName::Other(name) => name,
        }
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header aliases seen in Chilean bank exports, keyed by their trimmed,
/// lowercased form. The canonical names map to themselves so a rendered
/// canonical table maps back unchanged.
pub const COLUMN_ALIASES: &[(&str, ColumnName)] = &[
    ("monto", ColumnName::Amount),
    ("descripción movimiento", ColumnName::Description),
    ("descripcion movimiento", ColumnName::Description),
    ("fecha", ColumnName::Date),
    ("n° documento", ColumnName::DocumentNumber),
    ("n°  documento", ColumnName::DocumentNumber),
    ("sucursal", ColumnName::Branch),
    ("cargo/abono", ColumnName::DebitCredit),
    ("abono/cargo", ColumnName::DebitCredit),
    ("date", ColumnName::Date),
    ("description", ColumnName::Description),
    ("amount", ColumnName::Amount),
    ("debit_credit", ColumnName::DebitCredit),
    ("document_number", ColumnName::DocumentNumber),
    ("branch", ColumnName::Branch),
];

/// Total, deterministic header → [`ColumnName`] mapping.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    aliases: HashMap<String, ColumnName>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::with_aliases(std::iter::empty::<(&str, ColumnName)>())
    }
}

impl ColumnMapper {
    /// Builds on [`COLUMN_ALIASES`]; `extra` entries win on conflict.
    pub fn with_aliases<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnName)>,
        S: AsRef<str>,
    {
        let mut aliases: HashMap<String, ColumnName> = COLUMN_ALIASES
            .iter()
            .map(|(alias, name)| (alias.to_string(), name.clone()))
            .collect();
        for (alias, name) in extra {
            aliases.insert(alias.as_ref().trim().to_lowercase(), name);
        }
        Self { aliases }
    }

    pub fn map_header(&self, header: &str) -> ColumnName {
        let key = header.trim().to_lowercase();
        match self.aliases.get(&key) {
            Some(name) => name.clone(),
            None => ColumnName::Other(key.replace(' ', "_")),
        }
    }

    pub fn map<S: AsRef<str>>(&self, headers: &[S]) -> Vec<ColumnName> {
        headers.iter().map(|h| self.map_header(h.as_ref())).collect()
    }
}
