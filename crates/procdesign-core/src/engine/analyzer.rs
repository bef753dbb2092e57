//! Comparison of simulation output against product specifications.
//!
//! [`analyze`] is a pure function: the same result, specifications and options always give the
//! same [`Verdict`].

use super::config::AnalysisOptions;
use super::verdict::{CheckStatus, Criterion, SpecCheck, Verdict, declared_criteria};
use crate::core::models::graph::StreamRole;
use crate::core::models::simulation::{SimulationResult, StreamResult};
use crate::core::models::specification::{ProductSpecification, PropertyTarget, ValueRange};
use tracing::debug;

/// Relative feed/outlet mass imbalance above which a diagnostic is emitted.
const MASS_BALANCE_WARNING: f64 = 0.01;

/// Judges a simulation result against every product specification.
///
/// A result that did not converge yields a `NotConverged` verdict with every criterion unknown.
pub fn analyze(
    result: &SimulationResult,
    specs: &[ProductSpecification],
    options: &AnalysisOptions,
) -> Verdict {
    if !result.converged() {
        return Verdict::not_converged(specs, result.diagnostics.clone());
    }

    let mut diagnostics = result.diagnostics.clone();
    let block_errors = result.block_errors();
    let forced_reject = options.strict_block_status && !block_errors.is_empty();
    diagnostics.extend(block_errors);

    if let Some(error) = result.mass_balance_error() {
        if error.abs() > MASS_BALANCE_WARNING {
            diagnostics.push(format!(
                "Mass balance error of {:.1}% between feed and outlet streams",
                error * 100.0
            ));
        }
    }

    let checks: Vec<SpecCheck> = specs
        .iter()
        .flat_map(|spec| check_product(result, spec, options.tolerance))
        .collect();

    let verdict = Verdict::from_checks(checks, diagnostics, forced_reject);
    debug!(verdict = %verdict.summary(), "Analyzed simulation result");
    verdict
}

/// Mass flow of the target components in a stream.
fn target_flow(stream: &StreamResult, ids: &[&str]) -> f64 {
    ids.iter().map(|id| stream.component_flow(id)).sum()
}

fn target_fraction(stream: &StreamResult, ids: &[&str]) -> Option<f64> {
    let total = stream.total_flow();
    (total > 0.0).then(|| target_flow(stream, ids) / total)
}

fn fail_all(spec: &ProductSpecification, reason: &str) -> Vec<SpecCheck> {
    declared_criteria(spec)
        .into_iter()
        .map(|(criterion, requirement)| {
            SpecCheck::new(&spec.name, criterion, CheckStatus::Unmet, requirement).with_detail(reason)
        })
        .collect()
}

fn check_product(
    result: &SimulationResult,
    spec: &ProductSpecification,
    tolerance: f64,
) -> Vec<SpecCheck> {
    let ids = result.components_matching(&spec.identity());
    if ids.is_empty() {
        return fail_all(spec, "product not present in simulation");
    }

    let outlets: Vec<&StreamResult> = result
        .streams_with_role(StreamRole::Outlet)
        .filter(|s| target_flow(s, &ids) > 0.0)
        .collect();
    let primary = outlets.iter().copied().max_by(|a, b| {
        let fa = target_fraction(a, &ids).unwrap_or(0.0);
        let fb = target_fraction(b, &ids).unwrap_or(0.0);
        fa.total_cmp(&fb)
    });
    let Some(primary) = primary else {
        return fail_all(spec, "no outlet stream contains the product");
    };

    declared_criteria(spec)
        .into_iter()
        .map(|(criterion, requirement)| {
            let check = SpecCheck::new(&spec.name, criterion.clone(), CheckStatus::Unknown, requirement);
            match criterion {
                Criterion::Presence => check
                    .with_measured(primary.id.as_str())
                    .with_status(CheckStatus::Met),
                Criterion::Purity => {
                    let required = spec.purity.unwrap_or(0.0);
                    match target_fraction(primary, &ids) {
                        Some(purity) => check
                            .with_measured(purity)
                            .with_status(status(purity >= required - tolerance))
                            .with_detail(format!("stream {}", primary.id)),
                        None => check,
                    }
                }
                Criterion::Yield => check_yield(check, result, spec, &ids, &outlets, primary, tolerance),
                Criterion::Temperature => check_range(
                    check,
                    primary.temperature,
                    spec.temperature_range.unwrap_or_default(),
                    tolerance,
                ),
                Criterion::Pressure => check_range(
                    check,
                    primary.pressure,
                    spec.pressure_range.unwrap_or_default(),
                    tolerance,
                ),
                Criterion::State => match (primary.phase(), spec.state) {
                    (Some(phase), Some(required)) => check
                        .with_measured(phase.as_str())
                        .with_status(status(phase == required)),
                    _ => check,
                },
                Criterion::Property(name) => match (
                    primary.properties.get(&name),
                    spec.properties.get(&name),
                ) {
                    (Some(measured), Some(target)) => {
                        let met = property_met(measured, target, tolerance);
                        check.with_measured(measured.clone()).with_status(status(met))
                    }
                    _ => check,
                },
            }
        })
        .collect()
}

fn status(met: bool) -> CheckStatus {
    if met { CheckStatus::Met } else { CheckStatus::Unmet }
}

fn check_range(
    check: SpecCheck,
    measured: Option<f64>,
    range: ValueRange,
    tolerance: f64,
) -> SpecCheck {
    match measured {
        Some(value) => check
            .with_measured(value)
            .with_status(status(range.contains(value, tolerance))),
        None => check,
    }
}

/// Recovered product flow in product-grade outlets over the theoretical maximum.
fn check_yield(
    check: SpecCheck,
    result: &SimulationResult,
    spec: &ProductSpecification,
    ids: &[&str],
    outlets: &[&StreamResult],
    primary: &StreamResult,
    tolerance: f64,
) -> SpecCheck {
    let required = spec.yield_requirement.unwrap_or(0.0);

    let recovered: f64 = outlets
        .iter()
        .filter(|s| {
            s.id == primary.id
                || spec.purity.is_none_or(|purity| {
                    target_fraction(s, ids).is_some_and(|f| f >= purity - tolerance)
                })
        })
        .map(|s| target_flow(s, ids))
        .sum();

    let reported: Vec<f64> = ids
        .iter()
        .filter_map(|id| result.theoretical_max.get(*id).copied())
        .collect();
    let (theoretical, basis) = if !reported.is_empty() {
        (reported.iter().sum::<f64>(), "reported theoretical maximum")
    } else {
        let fed: f64 = result
            .streams_with_role(StreamRole::Feed)
            .map(|s| target_flow(s, ids))
            .sum();
        (fed, "feed flow of the product")
    };

    if theoretical <= 0.0 || !theoretical.is_finite() {
        return check.with_detail("no theoretical maximum available");
    }
    let value = recovered / theoretical;
    check
        .with_measured(value)
        .with_status(status(value >= required - tolerance))
        .with_detail(format!("relative to {}", basis))
}

fn property_met(measured: &serde_json::Value, target: &PropertyTarget, tolerance: f64) -> bool {
    match target {
        PropertyTarget::Range(range) => measured
            .as_f64()
            .is_some_and(|value| range.contains(value, tolerance)),
        PropertyTarget::Exact(expected) => match (measured.as_f64(), expected.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            _ => measured == expected,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::material::PhysicalState;
    use crate::core::models::simulation::{BlockResult, Component, SimulationStatus};
    use crate::engine::verdict::VerdictOutcome;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn ethanol_spec() -> ProductSpecification {
        ProductSpecification {
            chemical_formula: Some("C2H6O".to_string()),
            cas_number: Some("64-17-5".to_string()),
            purity: Some(0.95),
            yield_requirement: Some(0.85),
            temperature_range: Some(ValueRange::new(298.15, 353.15)),
            pressure_range: Some(ValueRange::new(101_325.0, 202_650.0)),
            ..ProductSpecification::new("Ethanol")
        }
    }

    fn stream(id: &str, role: StreamRole, flows: &[(&str, f64)]) -> StreamResult {
        let mut s = StreamResult::new(id, role);
        s.composition = flows.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        s
    }

    fn component(id: &str, formula: &str, cas: &str) -> Component {
        Component {
            id: id.to_string(),
            formula: Some(formula.to_string()),
            cas_number: Some(cas.to_string()),
        }
    }

    /// Ethylene hydration: product stream at 0.97 purity carrying 88% of the theoretical maximum.
    fn ethanol_result() -> SimulationResult {
        let mut product = stream("PRODUCT", StreamRole::Outlet, &[("ETOH", 97.0), ("WATER", 3.0)]);
        product.temperature = Some(320.0);
        product.pressure = Some(150_000.0);
        product.vapor_fraction = Some(0.0);
        product
            .properties
            .insert("density".to_string(), json!(789.0));

        let waste = stream(
            "WASTE",
            StreamRole::Outlet,
            &[("ETOH", 2.0), ("WATER", 150.0), ("C2H4", 48.0)],
        );

        SimulationResult {
            status: SimulationStatus::Converged,
            components: vec![
                component("C2H4", "C2H4", "74-85-1"),
                component("WATER", "H2O", "7732-18-5"),
                component("ETOH", "C2H6O", "64-17-5"),
            ],
            streams: vec![
                stream("FEED_1", StreamRole::Feed, &[("C2H4", 100.0)]),
                stream("FEED_2", StreamRole::Feed, &[("WATER", 200.0)]),
                product,
                waste,
            ],
            blocks: vec![BlockResult {
                id: "R1".to_string(),
                block_type: "RStoic".to_string(),
                status: "OK".to_string(),
            }],
            diagnostics: Vec::new(),
            theoretical_max: BTreeMap::from([("ETOH".to_string(), 97.0 / 0.88)]),
        }
    }

    fn options() -> AnalysisOptions {
        AnalysisOptions::default()
    }

    fn check<'a>(verdict: &'a Verdict, criterion: Criterion) -> &'a SpecCheck {
        verdict
            .checks
            .iter()
            .find(|c| c.criterion == criterion)
            .unwrap()
    }

    #[test]
    fn ethanol_scenario_is_accepted() {
        let verdict = analyze(&ethanol_result(), &[ethanol_spec()], &options());
        assert!(verdict.accepted, "{:?}", verdict);
        assert_eq!(verdict.outcome, VerdictOutcome::Accepted);

        let purity = check(&verdict, Criterion::Purity).measured.clone().unwrap();
        assert!((purity.as_f64().unwrap() - 0.97).abs() < 1e-12);
        let y = check(&verdict, Criterion::Yield).measured.clone().unwrap();
        assert!((y.as_f64().unwrap() - 0.88).abs() < 1e-12);
        assert_eq!(
            check(&verdict, Criterion::Presence).measured,
            Some(json!("PRODUCT"))
        );
    }

    #[test]
    fn perturbing_any_single_value_flips_acceptance() {
        let spec = ethanol_spec();
        let perturbations: Vec<(Criterion, Box<dyn Fn(&mut SimulationResult)>)> = vec![
            (
                Criterion::Purity,
                Box::new(|r: &mut SimulationResult| {
                    r.streams[2].composition.insert("WATER".to_string(), 10.0);
                }),
            ),
            (
                Criterion::Yield,
                Box::new(|r: &mut SimulationResult| {
                    r.theoretical_max.insert("ETOH".to_string(), 200.0);
                }),
            ),
            (
                Criterion::Temperature,
                Box::new(|r: &mut SimulationResult| r.streams[2].temperature = Some(360.0)),
            ),
            (
                Criterion::Pressure,
                Box::new(|r: &mut SimulationResult| r.streams[2].pressure = Some(90_000.0)),
            ),
        ];

        for (criterion, perturb) in perturbations {
            let mut result = ethanol_result();
            perturb(&mut result);
            let verdict = analyze(&result, std::slice::from_ref(&spec), &options());
            assert!(!verdict.accepted, "{} perturbation still accepted", criterion);
            let gaps: Vec<&SpecCheck> = verdict.gaps().collect();
            assert_eq!(gaps.len(), 1, "{:?}", gaps);
            assert_eq!(gaps[0].criterion, criterion);
            assert_eq!(gaps[0].product, "Ethanol");
        }
    }

    #[test]
    fn tolerance_is_absolute_slack() {
        let mut spec = ethanol_spec();
        spec.purity = Some(0.9701);
        let strict = analyze(&ethanol_result(), std::slice::from_ref(&spec), &options());
        assert_eq!(check(&strict, Criterion::Purity).status, CheckStatus::Unmet);

        let loose = AnalysisOptions {
            tolerance: 1e-3,
            ..options()
        };
        let verdict = analyze(&ethanol_result(), &[spec], &loose);
        assert_eq!(check(&verdict, Criterion::Purity).status, CheckStatus::Met);
    }

    #[test]
    fn missing_product_fails_every_criterion() {
        let mut spec = ethanol_spec();
        spec.chemical_formula = Some("C3H8O".to_string());
        spec.cas_number = Some("71-23-8".to_string());
        let verdict = analyze(&ethanol_result(), &[spec], &options());
        assert!(!verdict.accepted);
        assert_eq!(verdict.checks.len(), 5);
        assert!(verdict.checks.iter().all(|c| c.status == CheckStatus::Unmet));
        assert_eq!(
            verdict.checks[0].detail.as_deref(),
            Some("product not present in simulation")
        );
    }

    #[test]
    fn product_only_in_internal_streams_is_a_hard_failure() {
        let mut result = ethanol_result();
        for s in result.streams.iter_mut().filter(|s| s.role == StreamRole::Outlet) {
            s.composition.remove("ETOH");
        }
        result
            .streams
            .push(stream("S1", StreamRole::Internal, &[("ETOH", 99.0)]));
        let verdict = analyze(&result, &[ethanol_spec()], &options());
        assert!(verdict.checks.iter().all(|c| c.status == CheckStatus::Unmet));
        assert_eq!(
            verdict.checks[0].detail.as_deref(),
            Some("no outlet stream contains the product")
        );
    }

    #[test]
    fn yield_counts_every_product_grade_outlet() {
        let mut result = ethanol_result();
        result.theoretical_max.clear();
        // A second product-grade outlet; the low-grade waste stream stays excluded.
        let mut second = result.streams[2].clone();
        second.id = "PRODUCT_B".to_string();
        result.streams.push(second);

        let verdict = analyze(&result, &[ethanol_spec()], &options());
        let y = check(&verdict, Criterion::Yield);
        // No reported maximum and no ethanol in the feeds.
        assert_eq!(y.status, CheckStatus::Unknown);

        result.streams[0].composition.insert("ETOH".to_string(), 200.0);
        let verdict = analyze(&result, &[ethanol_spec()], &options());
        let y = check(&verdict, Criterion::Yield);
        assert!((y.measured.clone().unwrap().as_f64().unwrap() - 0.97).abs() < 1e-12);
        assert_eq!(y.status, CheckStatus::Met);
    }

    #[test]
    fn state_and_custom_properties_are_checked_on_the_primary_stream() {
        let mut spec = ethanol_spec();
        spec.state = Some(PhysicalState::Liquid);
        spec.properties.insert(
            "density".to_string(),
            PropertyTarget::Range(ValueRange::new(780.0, 800.0)),
        );
        spec.properties
            .insert("viscosity".to_string(), PropertyTarget::Exact(json!(1.2)));

        let verdict = analyze(&ethanol_result(), &[spec.clone()], &options());
        assert_eq!(check(&verdict, Criterion::State).status, CheckStatus::Met);
        assert_eq!(
            check(&verdict, Criterion::Property("density".to_string())).status,
            CheckStatus::Met
        );
        assert_eq!(
            check(&verdict, Criterion::Property("viscosity".to_string())).status,
            CheckStatus::Unknown
        );
        assert!(!verdict.accepted);

        let mut result = ethanol_result();
        result.streams[2].vapor_fraction = Some(1.0);
        let verdict = analyze(&result, &[spec], &options());
        let state = check(&verdict, Criterion::State);
        assert_eq!(state.status, CheckStatus::Unmet);
        assert_eq!(state.measured, Some(json!("gas")));
    }

    #[test]
    fn missing_measurements_are_unknown_and_not_met() {
        let mut result = ethanol_result();
        result.streams[2].temperature = None;
        let verdict = analyze(&result, &[ethanol_spec()], &options());
        assert_eq!(
            check(&verdict, Criterion::Temperature).status,
            CheckStatus::Unknown
        );
        assert!(!verdict.accepted);
    }

    #[test]
    fn failed_blocks_reject_only_in_strict_mode() {
        let mut result = ethanol_result();
        result.blocks.push(BlockResult {
            id: "C1".to_string(),
            block_type: "RadFrac".to_string(),
            status: "Errors".to_string(),
        });

        let strict = analyze(&result, &[ethanol_spec()], &options());
        assert_eq!(strict.outcome, VerdictOutcome::Rejected);
        assert!(strict.gaps().next().is_none());
        assert!(strict
            .diagnostics
            .contains(&"Block C1 has status: Errors".to_string()));

        let lenient = AnalysisOptions {
            strict_block_status: false,
            ..options()
        };
        let verdict = analyze(&result, &[ethanol_spec()], &lenient);
        assert!(verdict.accepted);
        assert_eq!(verdict.diagnostics.len(), 1);
    }

    #[test]
    fn non_converged_results_mark_everything_unknown() {
        let mut result = ethanol_result();
        result.status = SimulationStatus::NotConverged;
        result.diagnostics = vec!["RadFrac C1 failed to converge".to_string()];
        let verdict = analyze(&result, &[ethanol_spec()], &options());
        assert_eq!(verdict.outcome, VerdictOutcome::NotConverged);
        assert!(verdict.checks.iter().all(|c| c.status == CheckStatus::Unknown));
        assert_eq!(verdict.diagnostics, result.diagnostics);
    }

    #[test]
    fn large_mass_balance_errors_are_reported() {
        let mut result = ethanol_result();
        result.streams[3].composition.insert("WATER".to_string(), 10.0);
        let verdict = analyze(&result, &[ethanol_spec()], &options());
        assert!(verdict.accepted);
        assert!(verdict.diagnostics[0].starts_with("Mass balance error of"));
    }
}
