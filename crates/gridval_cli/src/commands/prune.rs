use anyhow::{anyhow, bail, Context, Result};
use gridval_core::Severity;
use gridval_engine::{DeletionCriteria, DeletionOptions, Evaluator};
use gridval_manifest::parse_file;
use serde_json::json;
use std::path::Path;
use tracing::info;

use crate::output;
use crate::rows;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    manifest_path: &str,
    data_path: &str,
    mode: &str,
    severity: Option<&str>,
    rule_names: Vec<String>,
    execute: bool,
    format: &str,
) -> Result<()> {
    info!("Deletion preview: mode={} execute={}", mode, execute);

    let manifest = parse_file(Path::new(manifest_path))
        .with_context(|| format!("Failed to parse manifest file: {}", manifest_path))?;
    let dataset = rows::load_rows(data_path)?;

    let evaluator = Evaluator::new();
    evaluator.update_configuration(manifest.configuration());
    for rule in manifest.build_rules()? {
        evaluator.registry().register(rule)?;
    }
    for group in manifest.build_groups()? {
        evaluator.registry().register_group(group)?;
    }

    let criteria = build_criteria(mode, severity, rule_names)?;
    let options = DeletionOptions {
        preview_only: !execute,
        ..DeletionOptions::default()
    };
    let outcome = evaluator
        .execute_deletion(&dataset, &criteria, &options, None)
        .await?;

    if format == "json" {
        let output = json!({
            "mode": mode,
            "row_indices": outcome.row_indices,
            "matched": outcome.row_indices.len(),
            "total_rows": dataset.len(),
            "executed": outcome.executed,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    if outcome.row_indices.is_empty() {
        output::print_success("No rows match the deletion criteria");
        return Ok(());
    }

    output::print_info(&format!(
        "{} of {} rows match the deletion criteria",
        outcome.row_indices.len(),
        dataset.len()
    ));
    for index in &outcome.row_indices {
        println!("  row {index}");
    }
    if outcome.executed {
        output::print_success("Rows are cleared for deletion by the row store");
    } else {
        output::print_info("Preview only; re-run with --execute to clear them for deletion");
    }

    Ok(())
}

fn build_criteria(
    mode: &str,
    severity: Option<&str>,
    rule_names: Vec<String>,
) -> Result<DeletionCriteria> {
    match mode {
        "invalid" => match severity {
            Some(severity) => Ok(DeletionCriteria::invalid_rows_at_least(parse_severity(
                severity,
            )?)),
            None => Ok(DeletionCriteria::invalid_rows()),
        },
        "valid" => Ok(DeletionCriteria::valid_rows()),
        "rule" => {
            if rule_names.is_empty() {
                bail!("mode 'rule' requires at least one --rule name");
            }
            Ok(DeletionCriteria::by_rule_names(rule_names))
        }
        other => Err(anyhow!(
            "Unknown deletion mode '{}': expected invalid, valid, or rule",
            other
        )),
    }
}

fn parse_severity(value: &str) -> Result<Severity> {
    match value.to_lowercase().as_str() {
        "info" => Ok(Severity::Info),
        "warning" => Ok(Severity::Warning),
        "error" => Ok(Severity::Error),
        "critical" => Ok(Severity::Critical),
        other => Err(anyhow!(
            "Unknown severity '{}': expected info, warning, error, or critical",
            other
        )),
    }
}
