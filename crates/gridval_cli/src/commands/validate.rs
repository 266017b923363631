use anyhow::{Context, Result};
use gridval_core::ValidationTrigger;
use gridval_engine::Evaluator;
use gridval_manifest::parse_file;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::output::{self, GridReport};
use crate::rows;

pub async fn execute(
    manifest_path: &str,
    data_path: &str,
    strict: bool,
    format: &str,
    show_stats: bool,
) -> Result<()> {
    info!("Validating data against manifest: {}", manifest_path);
    info!("Strict mode: {}", strict);

    let manifest = parse_file(Path::new(manifest_path))
        .with_context(|| format!("Failed to parse manifest file: {}", manifest_path))?;

    output::print_info(&format!(
        "Manifest loaded: {} v{} ({} columns)",
        manifest.name,
        manifest.version,
        manifest.columns.len()
    ));

    let dataset = rows::load_rows(data_path)?;
    output::print_info(&format!("Loaded {} rows from {}", dataset.len(), data_path));

    let evaluator = Evaluator::new();
    evaluator.update_configuration(manifest.configuration());
    for rule in manifest.build_rules()? {
        evaluator.registry().register(rule)?;
    }
    for group in manifest.build_groups()? {
        evaluator.registry().register_group(group)?;
    }

    let start = Instant::now();
    let context = evaluator
        .context_for(ValidationTrigger::Bulk)
        .with_rows(dataset.len());
    let results = evaluator
        .validate_dataset(&dataset, Some(context), None, None)
        .await?;

    let report = GridReport::from_results(&results, dataset.len(), strict, start.elapsed());
    output::print_validation_report(&report, format);

    if show_stats {
        output::print_statistics(&evaluator.statistics());
    }

    if !report.passed {
        std::process::exit(1);
    }

    Ok(())
}
