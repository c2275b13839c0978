use std::sync::OnceLock;

use regex::Regex;

/// Fee/maintenance descriptions that banks repeat in a summary block and again
/// in the line-item detail. Case-insensitive regex fragments.
pub const COMMISSION_PATTERNS: &[&str] = &[
    r"\bcom\.?\s*manten",
    r"comisi[oó]n",
    r"gastos?\s+bancarios?",
    r"cargos?\s+por\s+servicios?",
    r"mantenci[oó]n",
];

fn default_regex() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| build(COMMISSION_PATTERNS).expect("invalid commission pattern"))
}

fn build<S: AsRef<str>>(patterns: &[S]) -> Result<Regex, regex::Error> {
    let alternation = patterns
        .iter()
        .map(|p| format!("(?:{})", p.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}"))
}

#[derive(Debug, Clone)]
pub struct CommissionDetector {
    regex: Regex,
}

impl Default for CommissionDetector {
    fn default() -> Self {
        Self { regex: default_regex().clone() }
    }
}

impl CommissionDetector {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        Ok(Self { regex: build(patterns)? })
    }

    pub fn is_commission(&self, description: &str) -> bool {
        self.regex.is_match(description)
    }
}

/// Grouping key for commission rows: lowercase, runs of whitespace collapsed.
pub fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
