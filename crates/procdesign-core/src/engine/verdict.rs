use crate::core::models::specification::ProductSpecification;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictOutcome {
    /// Every specification is met.
    Accepted,
    /// The simulation converged but at least one specification is not met.
    Rejected,
    NotConverged,
    /// The design failed graph validation or was refused by the simulator.
    StructuralFailure,
    /// The proposer returned something that is not a design.
    ProposalFailure,
    /// A collaborator became unreachable; the loop stops.
    Aborted,
}

impl VerdictOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictOutcome::Accepted => "accepted",
            VerdictOutcome::Rejected => "rejected",
            VerdictOutcome::NotConverged => "not-converged",
            VerdictOutcome::StructuralFailure => "structural-failure",
            VerdictOutcome::ProposalFailure => "proposal-failure",
            VerdictOutcome::Aborted => "aborted",
        }
    }
}

impl fmt::Display for VerdictOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Met,
    Unmet,
    Unknown,
}

/// The requirement a single check covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    /// The product appears in an outlet stream at all.
    Presence,
    Purity,
    Yield,
    Temperature,
    Pressure,
    State,
    Property(String),
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Presence => f.write_str("presence"),
            Criterion::Purity => f.write_str("purity"),
            Criterion::Yield => f.write_str("yield"),
            Criterion::Temperature => f.write_str("temperature"),
            Criterion::Pressure => f.write_str("pressure"),
            Criterion::State => f.write_str("state"),
            Criterion::Property(name) => write!(f, "property '{}'", name),
        }
    }
}

/// Outcome of one criterion for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecCheck {
    pub product: String,
    pub criterion: Criterion,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<serde_json::Value>,
    pub requirement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SpecCheck {
    pub fn new(
        product: impl Into<String>,
        criterion: Criterion,
        status: CheckStatus,
        requirement: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            criterion,
            status,
            measured: None,
            requirement: requirement.into(),
            detail: None,
        }
    }

    pub fn with_measured(mut self, measured: impl Into<serde_json::Value>) -> Self {
        self.measured = Some(measured.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_status(mut self, status: CheckStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_met(&self) -> bool {
        self.status == CheckStatus::Met
    }

    /// Human-readable gap line, e.g. `Ethanol purity: required >= 0.95, measured 0.91`.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "{} {}: required {}",
            self.product, self.criterion, self.requirement
        );
        match &self.measured {
            Some(value) => text.push_str(&format!(", measured {}", value)),
            None if self.status == CheckStatus::Unknown => text.push_str(", not measured"),
            None => {}
        }
        if let Some(detail) = &self.detail {
            text.push_str(&format!(" ({})", detail));
        }
        text
    }
}

/// Every criterion a specification declares, in a stable order.
///
/// Presence is always checked; the rest only when the specification sets them.
pub fn declared_criteria(spec: &ProductSpecification) -> Vec<(Criterion, String)> {
    let mut criteria = vec![(Criterion::Presence, "present in an outlet stream".to_string())];
    if let Some(purity) = spec.purity {
        criteria.push((Criterion::Purity, format!(">= {}", purity)));
    }
    if let Some(y) = spec.yield_requirement {
        criteria.push((Criterion::Yield, format!(">= {}", y)));
    }
    if let Some(range) = &spec.temperature_range {
        criteria.push((Criterion::Temperature, format!("{} K", range)));
    }
    if let Some(range) = &spec.pressure_range {
        criteria.push((Criterion::Pressure, format!("{} Pa", range)));
    }
    if let Some(state) = spec.state {
        criteria.push((Criterion::State, state.to_string()));
    }
    for (name, target) in &spec.properties {
        criteria.push((Criterion::Property(name.clone()), target.to_string()));
    }
    criteria
}

/// The analyzer's structured judgment of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub outcome: VerdictOutcome,
    pub accepted: bool,
    #[serde(default)]
    pub checks: Vec<SpecCheck>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl Verdict {
    /// Accepted only when there is at least one check and every check is met, and nothing else
    /// forced a rejection.
    pub fn from_checks(checks: Vec<SpecCheck>, diagnostics: Vec<String>, forced_reject: bool) -> Self {
        let all_met = !checks.is_empty() && checks.iter().all(SpecCheck::is_met);
        let outcome = if all_met && !forced_reject {
            VerdictOutcome::Accepted
        } else {
            VerdictOutcome::Rejected
        };
        Self {
            outcome,
            accepted: outcome == VerdictOutcome::Accepted,
            checks,
            diagnostics,
        }
    }

    /// Every declared criterion is Unknown because no usable result exists.
    pub fn not_converged(specs: &[ProductSpecification], diagnostics: Vec<String>) -> Self {
        let checks = specs
            .iter()
            .flat_map(|spec| {
                declared_criteria(spec).into_iter().map(|(criterion, requirement)| {
                    SpecCheck::new(&spec.name, criterion, CheckStatus::Unknown, requirement)
                        .with_detail("simulation did not converge")
                })
            })
            .collect();
        Self::without_checks(VerdictOutcome::NotConverged, diagnostics).with_checks(checks)
    }

    pub fn structural_failure(diagnostics: Vec<String>) -> Self {
        Self::without_checks(VerdictOutcome::StructuralFailure, diagnostics)
    }

    pub fn proposal_failure(reason: impl Into<String>) -> Self {
        Self::without_checks(VerdictOutcome::ProposalFailure, vec![reason.into()])
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::without_checks(VerdictOutcome::Aborted, vec![reason.into()])
    }

    fn without_checks(outcome: VerdictOutcome, diagnostics: Vec<String>) -> Self {
        Self {
            outcome,
            accepted: false,
            checks: Vec::new(),
            diagnostics,
        }
    }

    fn with_checks(mut self, checks: Vec<SpecCheck>) -> Self {
        self.checks = checks;
        self
    }

    /// Checks that are not met, including unknown ones.
    pub fn gaps(&self) -> impl Iterator<Item = &SpecCheck> {
        self.checks.iter().filter(|c| !c.is_met())
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ({} met, {} unmet, {} unknown)",
            self.outcome,
            self.count(CheckStatus::Met),
            self.count(CheckStatus::Unmet),
            self.count(CheckStatus::Unknown)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::specification::ValueRange;
    use serde_json::json;

    fn check(status: CheckStatus) -> SpecCheck {
        SpecCheck::new("Ethanol", Criterion::Purity, status, ">= 0.95")
    }

    #[test]
    fn accepts_only_when_every_check_is_met() {
        let accepted = Verdict::from_checks(vec![check(CheckStatus::Met)], vec![], false);
        assert!(accepted.accepted);
        assert_eq!(accepted.outcome, VerdictOutcome::Accepted);

        let unknown = Verdict::from_checks(
            vec![check(CheckStatus::Met), check(CheckStatus::Unknown)],
            vec![],
            false,
        );
        assert!(!unknown.accepted);
        assert_eq!(unknown.gaps().count(), 1);

        let forced = Verdict::from_checks(vec![check(CheckStatus::Met)], vec![], true);
        assert_eq!(forced.outcome, VerdictOutcome::Rejected);

        assert!(!Verdict::from_checks(vec![], vec![], false).accepted);
    }

    #[test]
    fn not_converged_marks_declared_criteria_unknown() {
        let spec = ProductSpecification {
            chemical_formula: Some("C2H6O".to_string()),
            purity: Some(0.95),
            temperature_range: Some(ValueRange::new(298.15, 353.15)),
            ..ProductSpecification::new("Ethanol")
        };
        let verdict = Verdict::not_converged(&[spec], vec!["C1 did not converge".to_string()]);
        assert_eq!(verdict.outcome, VerdictOutcome::NotConverged);
        assert_eq!(verdict.checks.len(), 3);
        assert_eq!(verdict.count(CheckStatus::Unknown), 3);
        assert!(!verdict.accepted);
    }

    #[test]
    fn describe_names_product_criterion_and_measurement() {
        let gap = check(CheckStatus::Unmet).with_measured(0.91);
        assert_eq!(gap.describe(), "Ethanol purity: required >= 0.95, measured 0.91");

        let unknown = SpecCheck::new(
            "Ethanol",
            Criterion::Property("density".to_string()),
            CheckStatus::Unknown,
            "[780, 800]",
        );
        assert_eq!(
            unknown.describe(),
            "Ethanol property 'density': required [780, 800], not measured"
        );
    }

    #[test]
    fn serializes_outcomes_in_kebab_case() {
        let verdict = Verdict::structural_failure(vec!["Design has no feed stream".to_string()]);
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(value["outcome"], json!("structural-failure"));
        assert_eq!(value["accepted"], json!(false));
    }
}
