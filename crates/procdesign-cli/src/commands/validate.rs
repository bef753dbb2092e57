use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};
use procdesign::core::io::documents::{MaterialsDocument, SpecificationsDocument};
use procdesign::core::io::traits::{InputDocument, read_json_from_path};
use procdesign::core::models::design::ProcessDesign;
use procdesign::core::models::graph::ProcessGraph;
use procdesign::core::models::material::feed_stream_id;
use tracing::info;

pub async fn run(args: ValidateArgs) -> Result<u8> {
    for line in validate(&args)? {
        println!("{}", line);
    }
    Ok(0)
}

/// Loads every document named in `args` and returns report lines. The first problem is an error.
fn validate(args: &ValidateArgs) -> Result<Vec<String>> {
    let materials = MaterialsDocument::read_from_path(&args.materials)?.materials;
    let specifications = SpecificationsDocument::read_from_path(&args.specifications)?.specifications;
    info!(
        "Loaded {} material(s) and {} specification(s).",
        materials.len(),
        specifications.len()
    );

    let mut report = vec![format!("✓ {} raw material(s)", materials.len())];
    report.extend(
        materials
            .iter()
            .enumerate()
            .map(|(i, m)| format!("    {}: {}", feed_stream_id(i), m.describe())),
    );
    report.push(format!("✓ {} product specification(s)", specifications.len()));
    report.extend(specifications.iter().map(|s| format!("    {}", s.describe())));

    if let Some(path) = &args.design {
        let design: ProcessDesign = read_json_from_path(path)?;
        let graph = ProcessGraph::build(&design).map_err(|e| {
            CliError::Argument(format!(
                "Design '{}' is not a valid flowsheet: {}",
                path.display(),
                e
            ))
        })?;
        report.push(format!(
            "✓ design: {} unit(s), {} feed(s), {} outlet(s)",
            graph.unit_count(),
            graph.feeds().count(),
            graph.outlets().count()
        ));
        report.extend(
            graph
                .units()
                .map(|u| format!("    {} [{}]: {}", u.id, u.block_type, u.kind)),
        );
    }
    Ok(report)
}
