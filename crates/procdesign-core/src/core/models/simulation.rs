use super::chemical::ChemicalIdentity;
use super::graph::StreamRole;
use super::material::PhysicalState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Block status strings the simulator uses for a healthy unit operation.
const OK_BLOCK_STATUSES: [&str; 3] = ["ok", "converged", "completed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationStatus {
    Converged,
    NotConverged,
    /// The run was attempted but the simulator reported an error.
    Failed,
    /// The run was never attempted (structural rejection, proposal failure, abort).
    NotRun,
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SimulationStatus::Converged => "converged",
            SimulationStatus::NotConverged => "not-converged",
            SimulationStatus::Failed => "failed",
            SimulationStatus::NotRun => "not-run",
        };
        f.write_str(text)
    }
}

/// A chemical species known to the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
}

impl Component {
    pub fn identity(&self) -> ChemicalIdentity {
        ChemicalIdentity::new(self.formula.as_deref(), self.cas_number.as_deref())
    }
}

/// Computed state of one material stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamResult {
    pub id: String,
    pub role: StreamRole,
    /// Kelvin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Pascal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vapor_fraction: Option<f64>,
    /// Component mass flows keyed by component id.
    #[serde(default)]
    pub composition: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl StreamResult {
    pub fn new(id: impl Into<String>, role: StreamRole) -> Self {
        Self {
            id: id.into(),
            role,
            temperature: None,
            pressure: None,
            vapor_fraction: None,
            composition: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn total_flow(&self) -> f64 {
        self.composition.values().filter(|f| f.is_finite()).sum()
    }

    pub fn component_flow(&self, component_id: &str) -> f64 {
        self.composition.get(component_id).copied().unwrap_or(0.0)
    }

    pub fn phase(&self) -> Option<PhysicalState> {
        self.vapor_fraction.map(PhysicalState::from_vapor_fraction)
    }
}

/// Status of one unit operation after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResult {
    pub id: String,
    #[serde(default, rename = "type")]
    pub block_type: String,
    pub status: String,
}

impl BlockResult {
    pub fn is_ok(&self) -> bool {
        let status = self.status.trim().to_ascii_lowercase();
        OK_BLOCK_STATUSES.contains(&status.as_str())
    }
}

/// Everything the simulator reports back for one submitted design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub status: SimulationStatus,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub streams: Vec<StreamResult>,
    #[serde(default)]
    pub blocks: Vec<BlockResult>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Theoretical maximum mass flow per product component, when the simulator knows it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub theoretical_max: BTreeMap<String, f64>,
}

impl SimulationResult {
    pub fn converged(&self) -> bool {
        self.status == SimulationStatus::Converged
    }

    /// Placeholder result for an iteration in which no simulation ran.
    pub fn not_run(reason: impl Into<String>) -> Self {
        Self::empty(SimulationStatus::NotRun, vec![reason.into()])
    }

    pub fn failed(diagnostics: Vec<String>) -> Self {
        Self::empty(SimulationStatus::Failed, diagnostics)
    }

    pub fn not_converged(diagnostics: Vec<String>) -> Self {
        Self::empty(SimulationStatus::NotConverged, diagnostics)
    }

    fn empty(status: SimulationStatus, diagnostics: Vec<String>) -> Self {
        Self {
            status,
            components: Vec::new(),
            streams: Vec::new(),
            blocks: Vec::new(),
            diagnostics,
            theoretical_max: BTreeMap::new(),
        }
    }

    pub fn stream(&self, id: &str) -> Option<&StreamResult> {
        self.streams.iter().find(|s| s.id == id)
    }

    pub fn streams_with_role(&self, role: StreamRole) -> impl Iterator<Item = &StreamResult> {
        self.streams.iter().filter(move |s| s.role == role)
    }

    /// Ids of the components whose identity matches `identity`.
    pub fn components_matching(&self, identity: &ChemicalIdentity) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| c.identity().matches(identity))
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Unit operations that reported anything other than a healthy status.
    pub fn block_errors(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter(|b| !b.is_ok())
            .map(|b| format!("Block {} has status: {}", b.id, b.status))
            .collect()
    }

    /// Relative difference between total outlet and total feed mass flow.
    ///
    /// Returns `None` when no feed flow is reported.
    pub fn mass_balance_error(&self) -> Option<f64> {
        let feed: f64 = self
            .streams_with_role(StreamRole::Feed)
            .map(StreamResult::total_flow)
            .sum();
        if feed <= 0.0 {
            return None;
        }
        let out: f64 = self
            .streams_with_role(StreamRole::Outlet)
            .map(StreamResult::total_flow)
            .sum();
        Some((out - feed) / feed)
    }

    /// One-line summary for logs and feedback.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} component(s), {} stream(s), {} block(s), {} diagnostic(s)",
            self.status,
            self.components.len(),
            self.streams.len(),
            self.blocks.len(),
            self.diagnostics.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: &str, role: StreamRole, flows: &[(&str, f64)]) -> StreamResult {
        let mut s = StreamResult::new(id, role);
        s.composition = flows.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        s
    }

    #[test]
    fn stream_flows_and_phase() {
        let mut s = stream("P", StreamRole::Outlet, &[("ETOH", 97.0), ("WATER", 3.0)]);
        assert_eq!(s.total_flow(), 100.0);
        assert_eq!(s.component_flow("ETOH"), 97.0);
        assert_eq!(s.component_flow("NONE"), 0.0);
        assert_eq!(s.phase(), None);
        s.vapor_fraction = Some(0.0);
        assert_eq!(s.phase(), Some(PhysicalState::Liquid));

        let empty = stream("E", StreamRole::Outlet, &[]);
        assert_eq!(empty.total_flow(), 0.0);
    }

    #[test]
    fn components_match_by_identity() {
        let mut result = SimulationResult::not_converged(vec![]);
        result.components = vec![
            Component {
                id: "ETOH".to_string(),
                formula: Some("C2H6O".to_string()),
                cas_number: Some("64-17-5".to_string()),
            },
            Component {
                id: "DME".to_string(),
                formula: Some("C2H6O".to_string()),
                cas_number: Some("115-10-6".to_string()),
            },
        ];
        let by_cas = ChemicalIdentity::new(None, Some("64-17-5"));
        assert_eq!(result.components_matching(&by_cas), vec!["ETOH"]);
        let by_formula = ChemicalIdentity::new(Some("C2H6O"), None);
        assert_eq!(result.components_matching(&by_formula), vec!["ETOH", "DME"]);
    }

    #[test]
    fn block_errors_ignore_healthy_statuses() {
        let mut result = SimulationResult::not_run("n/a");
        result.blocks = vec![
            BlockResult {
                id: "R1".to_string(),
                block_type: "RStoic".to_string(),
                status: "OK".to_string(),
            },
            BlockResult {
                id: "C1".to_string(),
                block_type: "RadFrac".to_string(),
                status: "Errors".to_string(),
            },
        ];
        assert_eq!(result.block_errors(), vec!["Block C1 has status: Errors"]);
    }

    #[test]
    fn mass_balance_compares_feeds_with_outlets() {
        let mut result = SimulationResult::not_run("n/a");
        assert_eq!(result.mass_balance_error(), None);
        result.streams = vec![
            stream("F1", StreamRole::Feed, &[("A", 100.0)]),
            stream("S1", StreamRole::Internal, &[("A", 500.0)]),
            stream("P1", StreamRole::Outlet, &[("B", 90.0)]),
            stream("P2", StreamRole::Outlet, &[("A", 5.0)]),
        ];
        let error = result.mass_balance_error().unwrap();
        assert!((error + 0.05).abs() < 1e-12);
    }

    #[test]
    fn result_round_trips_through_json_with_defaults() {
        let result: SimulationResult =
            serde_json::from_str(r#"{"status":"not-converged","diagnostics":["loop C1"]}"#)
                .unwrap();
        assert!(!result.converged());
        assert!(result.streams.is_empty());
        assert_eq!(result.diagnostics, vec!["loop C1"]);
    }
}
