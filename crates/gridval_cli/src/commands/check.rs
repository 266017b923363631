use anyhow::{Context, Result};
use gridval_manifest::parse_file;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::output;

pub async fn execute(manifest_path: &str, format: &str) -> Result<()> {
    info!("Checking manifest: {}", manifest_path);

    let manifest = parse_file(Path::new(manifest_path))
        .with_context(|| format!("Failed to parse manifest file: {}", manifest_path))?;

    // Building the rules proves every declaration is well-formed,
    // including regex compilation.
    let rules = manifest
        .build_rules()
        .context("Manifest declares a rule that cannot be built")?;
    let groups = manifest
        .build_groups()
        .context("Manifest declares a group that cannot be built")?;

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for rule in &rules {
        *by_type.entry(rule.rule_type.to_string()).or_insert(0) += 1;
    }
    let group_rules: usize = groups.iter().map(|g| g.rule_count()).sum();

    if format == "json" {
        let output = json!({
            "name": manifest.name,
            "version": manifest.version,
            "columns": manifest.column_names(),
            "rule_count": rules.len(),
            "rules_by_type": by_type,
            "group_count": groups.len(),
            "group_rule_count": group_rules,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    output::print_info(&format!(
        "Manifest loaded: {} v{}",
        manifest.name, manifest.version
    ));
    output::print_success("Manifest is valid");

    println!("\nManifest Summary:");
    println!("  Name:        {}", manifest.name);
    println!("  Version:     {}", manifest.version);
    println!(
        "  Description: {}",
        manifest.description.as_deref().unwrap_or("N/A")
    );
    println!("  Columns:     {}", manifest.columns.len());
    println!("  Rules:       {}", rules.len());
    if !by_type.is_empty() {
        let rendered: Vec<String> = by_type
            .iter()
            .map(|(rule_type, count)| format!("{rule_type}={count}"))
            .collect();
        println!("  By type:     {}", rendered.join(", "));
    }
    if !groups.is_empty() {
        println!("  Groups:      {} ({} rules)", groups.len(), group_rules);
    }
    if let Some(settings) = &manifest.settings {
        let mut overrides = Vec::new();
        if settings.stop_all_on_first_error.is_some() {
            overrides.push("stop_all_on_first_error");
        }
        if settings.real_time_max_rows.is_some() {
            overrides.push("real_time_max_rows");
        }
        if settings.real_time_max_rules.is_some() {
            overrides.push("real_time_max_rules");
        }
        if settings.real_time_max_duration_ms.is_some() {
            overrides.push("real_time_max_duration_ms");
        }
        if settings.real_time_priority_cutoff.is_some() {
            overrides.push("real_time_priority_cutoff");
        }
        if settings.max_concurrent_validations.is_some() {
            overrides.push("max_concurrent_validations");
        }
        if !overrides.is_empty() {
            println!("  Settings:    {}", overrides.join(", "));
        }
    }

    Ok(())
}
