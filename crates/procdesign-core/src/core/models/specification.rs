use super::chemical::ChemicalIdentity;
use super::error::ModelError;
use super::material::PhysicalState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// An inclusive interval where either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Inclusive containment with `tolerance` as absolute slack on both bounds.
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let above_min = self.min.is_none_or(|min| value >= min - tolerance);
        let below_max = self.max.is_none_or(|max| value <= max + tolerance);
        above_min && below_max
    }

    fn validate(&self, name: &str, field: &str) -> Result<(), ModelError> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ModelError::InvertedRange {
                    name: name.to_string(),
                    field: field.to_string(),
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "[{}, {}]", min, max),
            (Some(min), None) => write!(f, ">= {}", min),
            (None, Some(max)) => write!(f, "<= {}", max),
            (None, None) => write!(f, "any"),
        }
    }
}

/// Target for a custom property: either an inclusive range or an exact value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyTarget {
    Range(ValueRange),
    Exact(serde_json::Value),
}

impl fmt::Display for PropertyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyTarget::Range(range) => write!(f, "{}", range),
            PropertyTarget::Exact(value) => write!(f, "= {}", value),
        }
    }
}

/// Requirements a produced chemical must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpecification {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemical_formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
    /// Minimum mass fraction of the product in its stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purity: Option<f64>,
    /// Minimum fraction of the theoretical maximum recovered.
    #[serde(
        default,
        rename = "yield",
        alias = "yield_requirement",
        skip_serializing_if = "Option::is_none"
    )]
    pub yield_requirement: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PhysicalState>,
    /// Kelvin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_range: Option<ValueRange>,
    /// Pascal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_range: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyTarget>,
}

impl ProductSpecification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chemical_formula: None,
            cas_number: None,
            purity: None,
            yield_requirement: None,
            state: None,
            temperature_range: None,
            pressure_range: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> ChemicalIdentity {
        ChemicalIdentity::new(self.chemical_formula.as_deref(), self.cas_number.as_deref())
    }

    /// One line per requirement, used in prompts and reports.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("{} ({})", self.name, self.identity())];
        if let Some(purity) = self.purity {
            parts.push(format!("purity >= {}", purity));
        }
        if let Some(y) = self.yield_requirement {
            parts.push(format!("yield >= {}", y));
        }
        if let Some(state) = self.state {
            parts.push(format!("state {}", state));
        }
        if let Some(range) = &self.temperature_range {
            parts.push(format!("temperature {} K", range));
        }
        if let Some(range) = &self.pressure_range {
            parts.push(format!("pressure {} Pa", range));
        }
        for (key, target) in &self.properties {
            parts.push(format!("{} {}", key, target));
        }
        parts.join(", ")
    }

    fn validate(&self, index: usize) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::EmptyName { index });
        }
        if self.identity().is_empty() {
            return Err(ModelError::MissingIdentity {
                name: self.name.clone(),
            });
        }
        for (field, value) in [("purity", self.purity), ("yield", self.yield_requirement)] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ModelError::FractionOutOfBounds {
                        name: self.name.clone(),
                        field,
                        value: v,
                    });
                }
            }
        }
        if let Some(range) = &self.temperature_range {
            range.validate(&self.name, "temperature")?;
        }
        if let Some(range) = &self.pressure_range {
            range.validate(&self.name, "pressure")?;
        }
        for (key, target) in &self.properties {
            if let PropertyTarget::Range(range) = target {
                range.validate(&self.name, key)?;
            }
        }
        Ok(())
    }
}

/// Checks every specification and rejects duplicate product names.
pub fn validate_specifications(specs: &[ProductSpecification]) -> Result<(), ModelError> {
    if specs.is_empty() {
        return Err(ModelError::EmptyDocument("specifications"));
    }
    let mut seen = HashSet::new();
    for (index, spec) in specs.iter().enumerate() {
        spec.validate(index)?;
        if !seen.insert(spec.name.trim().to_string()) {
            return Err(ModelError::Duplicate(spec.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol() -> ProductSpecification {
        ProductSpecification {
            chemical_formula: Some("C2H6O".to_string()),
            cas_number: Some("64-17-5".to_string()),
            purity: Some(0.95),
            yield_requirement: Some(0.85),
            state: Some(PhysicalState::Liquid),
            temperature_range: Some(ValueRange::new(298.15, 353.15)),
            pressure_range: Some(ValueRange::new(101_325.0, 202_650.0)),
            ..ProductSpecification::new("Ethanol")
        }
    }

    #[test]
    fn range_contains_is_inclusive_and_supports_open_bounds() {
        let range = ValueRange::new(1.0, 2.0);
        assert!(range.contains(1.0, 0.0));
        assert!(range.contains(2.0, 0.0));
        assert!(!range.contains(2.0001, 0.0));
        assert!(range.contains(2.0001, 0.001));
        assert!(!range.contains(f64::NAN, 1.0));

        let at_least = ValueRange {
            min: Some(5.0),
            max: None,
        };
        assert!(at_least.contains(1e9, 0.0));
        let at_most = ValueRange {
            min: None,
            max: Some(5.0),
        };
        assert!(!at_most.contains(5.5, 0.0));
    }

    #[test]
    fn deserializes_yield_under_both_names() {
        let a: ProductSpecification =
            serde_json::from_str(r#"{"name":"X","chemical_formula":"H2","yield":0.5}"#).unwrap();
        let b: ProductSpecification = serde_json::from_str(
            r#"{"name":"X","chemical_formula":"H2","yield_requirement":0.5}"#,
        )
        .unwrap();
        assert_eq!(a.yield_requirement, Some(0.5));
        assert_eq!(a, b);
    }

    #[test]
    fn property_targets_distinguish_ranges_from_exact_values() {
        let spec: ProductSpecification = serde_json::from_str(
            r#"{"name":"X","cas_number":"1-2-3","properties":{"density":{"min":780,"max":800},"color":"clear"}}"#,
        )
        .unwrap();
        assert_eq!(
            spec.properties["density"],
            PropertyTarget::Range(ValueRange::new(780.0, 800.0))
        );
        assert_eq!(
            spec.properties["color"],
            PropertyTarget::Exact(serde_json::json!("clear"))
        );
    }

    #[test]
    fn validate_accepts_a_complete_specification() {
        assert!(validate_specifications(&[ethanol()]).is_ok());
    }

    #[test]
    fn validate_requires_chemical_identity() {
        let spec = ProductSpecification::new("Mystery");
        assert_eq!(
            validate_specifications(&[spec]),
            Err(ModelError::MissingIdentity {
                name: "Mystery".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_bounds_fractions_and_inverted_ranges() {
        let mut spec = ethanol();
        spec.purity = Some(1.2);
        assert!(matches!(
            validate_specifications(&[spec]),
            Err(ModelError::FractionOutOfBounds { field: "purity", .. })
        ));

        let mut spec = ethanol();
        spec.pressure_range = Some(ValueRange::new(2.0, 1.0));
        assert!(matches!(
            validate_specifications(&[spec]),
            Err(ModelError::InvertedRange { .. })
        ));
    }

    #[test]
    fn describe_mentions_every_requirement() {
        let text = ethanol().describe();
        assert!(text.starts_with("Ethanol (C2H6O [CAS 64-17-5])"));
        assert!(text.contains("purity >= 0.95"));
        assert!(text.contains("yield >= 0.85"));
        assert!(text.contains("temperature [298.15, 353.15] K"));
        assert!(text.contains("pressure [101325, 202650] Pa"));
    }
}
