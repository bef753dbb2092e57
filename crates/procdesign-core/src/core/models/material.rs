use super::chemical::ChemicalIdentity;
use super::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Feed temperature assumed when a material does not state one (25 °C).
pub const DEFAULT_FEED_TEMPERATURE_K: f64 = 298.15;
/// Feed pressure assumed when a material does not state one (1 atm).
pub const DEFAULT_FEED_PRESSURE_PA: f64 = 101_325.0;
/// Feed amount assumed when a material does not state one, in the material's own unit.
pub const DEFAULT_FEED_AMOUNT: f64 = 100.0;

/// Vapor fraction above which a stream is considered a gas.
const GAS_VAPOR_FRACTION: f64 = 0.99;
/// Vapor fraction below which a stream is considered a liquid.
const LIQUID_VAPOR_FRACTION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalState {
    #[serde(alias = "vapor", alias = "vapour")]
    Gas,
    Liquid,
    Solid,
    Mixed,
}

impl PhysicalState {
    /// Classifies a fluid stream by its vapor fraction.
    pub fn from_vapor_fraction(vapor_fraction: f64) -> Self {
        if vapor_fraction > GAS_VAPOR_FRACTION {
            PhysicalState::Gas
        } else if vapor_fraction < LIQUID_VAPOR_FRACTION {
            PhysicalState::Liquid
        } else {
            PhysicalState::Mixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhysicalState::Gas => "gas",
            PhysicalState::Liquid => "liquid",
            PhysicalState::Solid => "solid",
            PhysicalState::Mixed => "mixed",
        }
    }
}

impl fmt::Display for PhysicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePhysicalStateError(pub String);

impl fmt::Display for ParsePhysicalStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown physical state '{}'", self.0)
    }
}

impl std::error::Error for ParsePhysicalStateError {}

impl FromStr for PhysicalState {
    type Err = ParsePhysicalStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gas" | "vapor" | "vapour" | "g" | "v" => Ok(PhysicalState::Gas),
            "liquid" | "l" => Ok(PhysicalState::Liquid),
            "solid" | "s" => Ok(PhysicalState::Solid),
            "mixed" | "two-phase" => Ok(PhysicalState::Mixed),
            other => Err(ParsePhysicalStateError(other.to_string())),
        }
    }
}

/// A raw material available to the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMaterial {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemical_formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PhysicalState>,
    /// Kelvin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Pascal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl RawMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chemical_formula: None,
            cas_number: None,
            amount: None,
            units: None,
            state: None,
            temperature: None,
            pressure: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> ChemicalIdentity {
        ChemicalIdentity::new(self.chemical_formula.as_deref(), self.cas_number.as_deref())
    }

    pub fn feed_temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_FEED_TEMPERATURE_K)
    }

    pub fn feed_pressure(&self) -> f64 {
        self.pressure.unwrap_or(DEFAULT_FEED_PRESSURE_PA)
    }

    pub fn feed_amount(&self) -> f64 {
        self.amount.unwrap_or(DEFAULT_FEED_AMOUNT)
    }

    /// Short human-readable description, e.g. `Ethylene (C2H4) 100 kg/hr`.
    pub fn describe(&self) -> String {
        let mut text = self.name.clone();
        if let Some(formula) = &self.chemical_formula {
            text.push_str(&format!(" ({})", formula));
        }
        if let Some(amount) = self.amount {
            text.push_str(&format!(" {}", amount));
            if let Some(units) = &self.units {
                text.push_str(&format!(" {}", units));
            }
        }
        text
    }

    fn validate(&self, index: usize) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::EmptyName { index });
        }
        for (field, value) in [
            ("amount", self.amount),
            ("temperature", self.temperature),
            ("pressure", self.pressure),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ModelError::InvalidQuantity {
                        name: self.name.clone(),
                        field,
                        value: v,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Id of the feed stream that carries the material at `index` (zero-based): `FEED_1`, `FEED_2`, ...
pub fn feed_stream_id(index: usize) -> String {
    format!("FEED_{}", index + 1)
}

/// Feed conditions handed to the simulator for one raw material, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedStream {
    pub stream: String,
    pub material: String,
    pub temperature: f64,
    pub pressure: f64,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// One feed stream per material, in document order.
pub fn feed_streams(materials: &[RawMaterial]) -> Vec<FeedStream> {
    materials
        .iter()
        .enumerate()
        .map(|(index, m)| FeedStream {
            stream: feed_stream_id(index),
            material: m.name.clone(),
            temperature: m.feed_temperature(),
            pressure: m.feed_pressure(),
            amount: m.feed_amount(),
            units: m.units.clone(),
        })
        .collect()
}

/// Checks every material and rejects duplicate names.
pub fn validate_materials(materials: &[RawMaterial]) -> Result<(), ModelError> {
    if materials.is_empty() {
        return Err(ModelError::EmptyDocument("materials"));
    }
    let mut seen = HashSet::new();
    for (index, material) in materials.iter().enumerate() {
        material.validate(index)?;
        if !seen.insert(material.name.trim().to_string()) {
            return Err(ModelError::Duplicate(material.name.clone()));
        }
    }
    Ok(())
}
