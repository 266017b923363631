use anyhow::{Context, Result};
use gridval_core::{CellValue, GridDataset, GridRow};

/// Loads grid rows from a JSON file holding an array of objects.
///
/// Row order is preserved; each row's position in the file becomes its
/// stable identity key for re-joining validation results.
pub fn load_rows(path: &str) -> Result<GridDataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows file: {}", path))?;
    let objects: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&content)
            .with_context(|| format!("Rows file is not a JSON array of objects: {}", path))?;

    let rows = objects
        .into_iter()
        .enumerate()
        .map(|(index, object)| {
            let mut row = GridRow::with_key(index as u64);
            for (column, value) in object {
                row.insert(column, CellValue::from(value));
            }
            row
        })
        .collect();

    Ok(GridDataset::from_rows(rows))
}
