use crate::cli::CheckArgs;
use crate::error::{CliError, Result};
use procdesign::core::io::documents::SpecificationsDocument;
use procdesign::core::io::traits::{InputDocument, read_json_from_path};
use procdesign::core::models::simulation::SimulationResult;
use procdesign::engine::analyzer::analyze;
use procdesign::engine::config::LoopConfigBuilder;
use procdesign::engine::verdict::{CheckStatus, Verdict};
use tracing::info;

pub const EXIT_ACCEPTED: u8 = 0;
pub const EXIT_REJECTED: u8 = 2;

pub async fn run(args: CheckArgs) -> Result<u8> {
    let verdict = evaluate(&args)?;

    if args.json {
        let json = serde_json::to_string_pretty(&verdict).map_err(|e| CliError::Other(e.into()))?;
        println!("{}", json);
    } else {
        print!("{}", render_verdict(&verdict));
    }

    Ok(if verdict.accepted {
        EXIT_ACCEPTED
    } else {
        EXIT_REJECTED
    })
}

fn evaluate(args: &CheckArgs) -> Result<Verdict> {
    let specifications = SpecificationsDocument::read_from_path(&args.specifications)?.specifications;
    let result: SimulationResult = read_json_from_path(&args.result)?;
    info!(
        "Checking {} against {} specification(s).",
        result.summary(),
        specifications.len()
    );

    // Only the analysis options matter here; the builder still validates the tolerance.
    let mut builder = LoopConfigBuilder::new()
        .max_iterations(1)
        .strict_block_status(!args.lenient_blocks);
    if let Some(tolerance) = args.tolerance {
        builder = builder.tolerance(tolerance);
    }
    let config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

    Ok(analyze(&result, &specifications, &config.analysis))
}

/// Multi-line human-readable report of a verdict.
pub fn render_verdict(verdict: &Verdict) -> String {
    let mut lines = vec![format!("Verdict: {}", verdict.summary())];
    for check in &verdict.checks {
        let marker = match check.status {
            CheckStatus::Met => "✓",
            CheckStatus::Unmet => "✗",
            CheckStatus::Unknown => "?",
        };
        lines.push(format!("  {} {}", marker, check.describe()));
    }
    if !verdict.diagnostics.is_empty() {
        lines.push("Diagnostics:".to_string());
        lines.extend(verdict.diagnostics.iter().map(|d| format!("  - {}", d)));
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SPECS: &str = r#"[{
        "name": "Ethanol",
        "chemical_formula": "C2H6O",
        "purity": 0.95,
        "temperature_range": {"min": 298.15, "max": 353.15}
    }]"#;

    fn result_json(ethanol: f64, water: f64, block_status: &str) -> String {
        format!(
            r#"{{
                "status": "converged",
                "components": [
                    {{"id": "ETOH", "formula": "C2H6O"}},
                    {{"id": "WATER", "formula": "H2O"}}
                ],
                "streams": [{{
                    "id": "PRODUCT",
                    "role": "outlet",
                    "temperature": 320.0,
                    "pressure": 150000.0,
                    "composition": {{"ETOH": {ethanol}, "WATER": {water}}}
                }}],
                "blocks": [{{"id": "F1", "type": "Flash2", "status": "{block_status}"}}]
            }}"#
        )
    }

    fn args(dir: &Path, result: &str) -> CheckArgs {
        let specs_path = dir.join("specs.json");
        let result_path = dir.join("simulation.json");
        fs::write(&specs_path, SPECS).unwrap();
        fs::write(&result_path, result).unwrap();
        CheckArgs {
            specifications: specs_path,
            result: result_path,
            tolerance: None,
            lenient_blocks: false,
            json: false,
        }
    }

    #[test]
    fn accepts_a_result_that_meets_every_check() {
        let dir = TempDir::new().unwrap();
        let verdict = evaluate(&args(dir.path(), &result_json(97.0, 3.0, "OK"))).unwrap();
        assert!(verdict.accepted, "{}", render_verdict(&verdict));
    }

    #[test]
    fn report_names_the_missed_specification() {
        let dir = TempDir::new().unwrap();
        let verdict = evaluate(&args(dir.path(), &result_json(90.0, 10.0, "OK"))).unwrap();
        assert!(!verdict.accepted);
        let report = render_verdict(&verdict);
        assert!(report.starts_with("Verdict: rejected"));
        assert!(report.contains("✗ Ethanol purity: required >= 0.95"));
    }

    #[test]
    fn lenient_blocks_ignore_block_warnings() {
        let dir = TempDir::new().unwrap();
        let mut check_args = args(dir.path(), &result_json(97.0, 3.0, "Warning"));
        assert!(!evaluate(&check_args).unwrap().accepted);
        check_args.lenient_blocks = true;
        assert!(evaluate(&check_args).unwrap().accepted);
    }

    #[test]
    fn invalid_tolerance_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let mut check_args = args(dir.path(), &result_json(97.0, 3.0, "OK"));
        check_args.tolerance = Some(-1.0);
        assert!(matches!(evaluate(&check_args), Err(CliError::Config(_))));
    }

    #[test]
    fn unreadable_result_is_a_document_error() {
        let dir = TempDir::new().unwrap();
        let check_args = args(dir.path(), "{ not json");
        assert!(matches!(evaluate(&check_args), Err(CliError::Document(_))));
    }
}
