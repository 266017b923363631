use anyhow::{Context, Result};
use gridval_manifest::{ColumnRules, Manifest, RuleSpec, RuleSpecKind};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::output;
use crate::rows;

pub async fn execute(data_path: &str, output_path: Option<&str>) -> Result<()> {
    info!("Initializing manifest from rows file: {}", data_path);

    let dataset = rows::load_rows(data_path)?;
    output::print_info(&format!("Loaded {} rows from {}", dataset.len(), data_path));

    // Columns observed anywhere in the data, in name order.
    let mut columns: Vec<String> = dataset
        .rows()
        .flat_map(|row| row.columns().map(str::to_string))
        .collect();
    columns.sort();
    columns.dedup();

    let column_rules = columns
        .into_iter()
        .map(|name| {
            // Seed a required rule only for columns the data always fills;
            // sparse columns start without rules.
            let always_present = dataset
                .rows()
                .all(|row| row.get(&name).is_some_and(|value| !value.is_null()));
            let rules = if always_present {
                vec![RuleSpec {
                    kind: RuleSpecKind::Required,
                    severity: None,
                    name: None,
                    priority: None,
                }]
            } else {
                Vec::new()
            };
            ColumnRules { name, rules }
        })
        .collect();

    let name = Path::new(data_path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("grid")
        .to_string();

    let manifest = Manifest {
        version: "1.0.0".to_string(),
        name,
        description: Some(format!("Auto-generated manifest from {}", data_path)),
        settings: None,
        columns: column_rules,
        groups: Vec::new(),
        min_rows: None,
    };

    let yaml =
        serde_yaml_ng::to_string(&manifest).context("Failed to serialize manifest to YAML")?;

    if let Some(path) = output_path {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path))?;
        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write to file: {}", path))?;
        output::print_success(&format!("Manifest written to: {}", path));
    } else {
        println!("{}", yaml);
    }

    Ok(())
}
