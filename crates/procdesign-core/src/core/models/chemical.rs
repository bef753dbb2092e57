use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a chemical species independently of its display name.
///
/// Two identities match when their registry (CAS) numbers agree, or, when either side lacks a
/// registry number, when their formulas agree. Registry numbers are authoritative because
/// formulas are shared between isomers (ethanol and dimethyl ether are both `C2H6O`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
}

impl ChemicalIdentity {
    pub fn new(formula: Option<&str>, cas_number: Option<&str>) -> Self {
        Self {
            formula: formula.and_then(normalize_formula),
            cas_number: cas_number.and_then(normalize_cas),
        }
    }

    /// Returns `true` if neither a formula nor a registry number is known.
    pub fn is_empty(&self) -> bool {
        self.formula.is_none() && self.cas_number.is_none()
    }

    pub fn matches(&self, other: &ChemicalIdentity) -> bool {
        if let (Some(a), Some(b)) = (&self.cas_number, &other.cas_number) {
            return a == b;
        }
        match (&self.formula, &other.formula) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ChemicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.formula, &self.cas_number) {
            (Some(formula), Some(cas)) => write!(f, "{} [CAS {}]", formula, cas),
            (Some(formula), None) => write!(f, "{}", formula),
            (None, Some(cas)) => write!(f, "CAS {}", cas),
            (None, None) => write!(f, "<unidentified>"),
        }
    }
}

fn normalize_formula(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    (!compact.is_empty()).then_some(compact)
}

fn normalize_cas(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
