use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property method used when a design does not name one.
pub const DEFAULT_PROPERTY_METHOD: &str = "NRTL";

/// Broad classes of unit operations, independent of any simulator's block names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Reactor,
    Separator,
    Column,
    HeatExchanger,
    Mixer,
    Splitter,
    Pump,
    Compressor,
    Valve,
    Other,
}

static UNIT_KIND_ALIASES: Map<&'static str, UnitKind> = phf_map! {
    "reactor" => UnitKind::Reactor,
    "rstoic" => UnitKind::Reactor,
    "ryield" => UnitKind::Reactor,
    "requil" => UnitKind::Reactor,
    "rgibbs" => UnitKind::Reactor,
    "rcstr" => UnitKind::Reactor,
    "rplug" => UnitKind::Reactor,
    "rbatch" => UnitKind::Reactor,
    "cstr" => UnitKind::Reactor,
    "pfr" => UnitKind::Reactor,
    "separator" => UnitKind::Separator,
    "flash" => UnitKind::Separator,
    "flash2" => UnitKind::Separator,
    "flash3" => UnitKind::Separator,
    "decanter" => UnitKind::Separator,
    "sep" => UnitKind::Separator,
    "sep2" => UnitKind::Separator,
    "column" => UnitKind::Column,
    "distillation" => UnitKind::Column,
    "radfrac" => UnitKind::Column,
    "distl" => UnitKind::Column,
    "dstwu" => UnitKind::Column,
    "extract" => UnitKind::Column,
    "absorber" => UnitKind::Column,
    "heater" => UnitKind::HeatExchanger,
    "cooler" => UnitKind::HeatExchanger,
    "heatx" => UnitKind::HeatExchanger,
    "heat-exchanger" => UnitKind::HeatExchanger,
    "heat_exchanger" => UnitKind::HeatExchanger,
    "mixer" => UnitKind::Mixer,
    "fsplit" => UnitKind::Splitter,
    "splitter" => UnitKind::Splitter,
    "ssplit" => UnitKind::Splitter,
    "pump" => UnitKind::Pump,
    "compr" => UnitKind::Compressor,
    "mcompr" => UnitKind::Compressor,
    "compressor" => UnitKind::Compressor,
    "valve" => UnitKind::Valve,
};

impl UnitKind {
    /// Classifies a block type such as `RStoic` or `RadFrac`. Unknown types map to `Other`.
    pub fn classify(block_type: &str) -> Self {
        let key = block_type.trim().to_ascii_lowercase();
        UNIT_KIND_ALIASES
            .get(key.as_str())
            .copied()
            .unwrap_or(UnitKind::Other)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitKind::Reactor => "reactor",
            UnitKind::Separator => "separator",
            UnitKind::Column => "column",
            UnitKind::HeatExchanger => "heat-exchanger",
            UnitKind::Mixer => "mixer",
            UnitKind::Splitter => "splitter",
            UnitKind::Pump => "pump",
            UnitKind::Compressor => "compressor",
            UnitKind::Valve => "valve",
            UnitKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// A single block of the flowsheet with its operating parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOperation {
    pub id: String,
    /// Simulator block type, e.g. `RStoic`, `RadFrac`, `Flash2`.
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl UnitOperation {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> UnitKind {
        UnitKind::classify(&self.block_type)
    }
}

/// A material stream. No `source` means the stream is a feed; no `destination` means it
/// leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub stream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl Connection {
    pub fn feed(stream: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            source: None,
            destination: Some(destination.into()),
        }
    }

    pub fn internal(
        stream: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            stream: stream.into(),
            source: Some(source.into()),
            destination: Some(destination.into()),
        }
    }

    pub fn outlet(stream: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            source: Some(source.into()),
            destination: None,
        }
    }
}

/// A proposed flowsheet. Each loop iteration produces a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_method: Option<String>,
    #[serde(default)]
    pub units: Vec<UnitOperation>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl ProcessDesign {
    pub fn property_method(&self) -> &str {
        self.property_method
            .as_deref()
            .unwrap_or(DEFAULT_PROPERTY_METHOD)
    }

    /// Compact one-line summary, e.g. `R1[RStoic] -> F1[Flash2]; 4 streams`.
    pub fn summary(&self) -> String {
        let units: Vec<String> = self
            .units
            .iter()
            .map(|u| format!("{}[{}]", u.id, u.block_type))
            .collect();
        format!(
            "{}; {} stream(s)",
            if units.is_empty() {
                "no units".to_string()
            } else {
                units.join(" -> ")
            },
            self.connections.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_is_case_insensitive_and_falls_back_to_other() {
        assert_eq!(UnitKind::classify("RStoic"), UnitKind::Reactor);
        assert_eq!(UnitKind::classify(" RADFRAC "), UnitKind::Column);
        assert_eq!(UnitKind::classify("HeatX"), UnitKind::HeatExchanger);
        assert_eq!(UnitKind::classify("Crystallizer"), UnitKind::Other);
    }

    #[test]
    fn design_deserializes_from_proposer_json() {
        let design: ProcessDesign = serde_json::from_value(json!({
            "rationale": "hydrate ethylene then flash",
            "units": [
                {"id": "R1", "type": "RStoic", "parameters": {"TEMP": 550.0}},
                {"id": "F1", "type": "Flash2"}
            ],
            "connections": [
                {"stream": "FEED_1", "destination": "R1"},
                {"stream": "S1", "source": "R1", "destination": "F1"},
                {"stream": "PRODUCT", "source": "F1"}
            ]
        }))
        .unwrap();

        assert_eq!(design.units.len(), 2);
        assert_eq!(design.property_method(), DEFAULT_PROPERTY_METHOD);
        assert_eq!(design.units[0].kind(), UnitKind::Reactor);
        assert_eq!(design.units[0].parameters["TEMP"], json!(550.0));
        assert_eq!(design.connections[0], Connection::feed("FEED_1", "R1"));
        assert_eq!(design.connections[2], Connection::outlet("PRODUCT", "F1"));
        assert_eq!(
            design.summary(),
            "R1[RStoic] -> F1[Flash2]; 3 stream(s)"
        );
    }

    #[test]
    fn unit_operation_serializes_block_type_as_type() {
        let unit = UnitOperation::new("H1", "Heater").with_parameter("TEMP", json!(300));
        let value = serde_json::to_value(&unit).unwrap();
        assert_eq!(value["type"], json!("Heater"));
        assert_eq!(value["parameters"]["TEMP"], json!(300));
    }
}
