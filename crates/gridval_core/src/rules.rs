//! Built-in rule constructors.
//!
//! Factories for the checks a grid needs out of the box: presence, range,
//! pattern, allowed values, equality, conditional presence, cross-row
//! uniqueness, and dataset-level completeness and row-count floors.
//!
//! Value-level checks skip null cells; nullability is the `required`
//! rule's concern, so a nullable column with a range rule accepts nulls.

use crate::{
    CellValue, EngineError, GridRow, Result, Rule, Severity, ValidationResult,
};
use regex::Regex;
use std::collections::HashSet;

/// The cell must be present and non-null.
pub fn required(column: impl Into<String>) -> Rule {
    let column = column.into();
    let message_column = column.clone();
    Rule::single_cell(column, move |value, _| {
        if value.is_null() {
            Ok(ValidationResult::failure(
                Severity::Error,
                format!("Required field '{message_column}' is missing"),
            ))
        } else {
            Ok(ValidationResult::success())
        }
    })
}

/// Numeric cell must be within `[min, max]` inclusive.
pub fn range(column: impl Into<String>, min: f64, max: f64) -> Rule {
    Rule::single_cell(column, move |value, _| {
        if value.is_null() {
            return Ok(ValidationResult::success());
        }
        let Some(number) = value.as_float() else {
            return Ok(ValidationResult::failure(
                Severity::Error,
                format!(
                    "Range constraint requires numeric type, found {}",
                    value.type_name()
                ),
            )
            .with_value(value.clone()));
        };
        if number < min || number > max {
            Ok(ValidationResult::failure(
                Severity::Error,
                format!("Value {number} out of range [{min}, {max}]"),
            )
            .with_value(value.clone()))
        } else {
            Ok(ValidationResult::success())
        }
    })
}

/// String cell must match the regex pattern.
///
/// The pattern is compiled once here; an unparsable pattern is a
/// registration-time error, not a per-row failure.
pub fn pattern(column: impl Into<String>, pattern: &str) -> Result<Rule> {
    let column = column.into();
    let regex = Regex::new(pattern).map_err(|e| EngineError::InvalidRegex {
        column: column.clone(),
        error: e.to_string(),
    })?;
    let pattern = pattern.to_string();

    Ok(Rule::single_cell(column, move |value, _| {
        if value.is_null() {
            return Ok(ValidationResult::success());
        }
        let Some(text) = value.as_string() else {
            return Ok(ValidationResult::failure(
                Severity::Error,
                format!(
                    "Pattern constraint requires string type, found {}",
                    value.type_name()
                ),
            )
            .with_value(value.clone()));
        };
        if regex.is_match(text) {
            Ok(ValidationResult::success())
        } else {
            Ok(ValidationResult::failure(
                Severity::Error,
                format!("Value '{text}' does not match pattern '{pattern}'"),
            )
            .with_value(value.clone()))
        }
    }))
}

/// Cell must be one of the allowed values (compared by display form).
pub fn allowed_values(column: impl Into<String>, values: Vec<String>) -> Rule {
    Rule::single_cell(column, move |value, _| {
        if value.is_null() {
            return Ok(ValidationResult::success());
        }
        let rendered = value.display();
        if values.iter().any(|allowed| allowed == &rendered) {
            Ok(ValidationResult::success())
        } else {
            Ok(ValidationResult::failure(
                Severity::Error,
                format!(
                    "Value '{}' not in allowed values: [{}]",
                    rendered,
                    values.join(", ")
                ),
            )
            .with_value(value.clone()))
        }
    })
}

/// Cell must equal the expected value.
pub fn equals(column: impl Into<String>, expected: CellValue) -> Rule {
    Rule::single_cell(column, move |value, _| {
        if value == &expected {
            Ok(ValidationResult::success())
        } else {
            Ok(ValidationResult::failure(
                Severity::Error,
                format!("Value '{}' does not equal '{}'", value.display(), expected.display()),
            )
            .with_value(value.clone()))
        }
    })
}

/// `column` must be non-null whenever `when_column` equals `when_value`.
pub fn required_when(
    column: impl Into<String>,
    when_column: impl Into<String>,
    when_value: CellValue,
) -> Rule {
    let column = column.into();
    let when_column = when_column.into();
    let message = format!(
        "'{column}' is required when '{when_column}' is '{}'",
        when_value.display()
    );
    Rule::conditional(
        column.clone(),
        vec![when_column.clone()],
        move |row: &GridRow| {
            let gate = row.get(&when_column);
            if gate != Some(&when_value) {
                return Ok(ValidationResult::success());
            }
            match row.get(&column) {
                Some(value) if !value.is_null() => Ok(ValidationResult::success()),
                _ => Ok(ValidationResult::failure(Severity::Error, message.clone())),
            }
        },
    )
}

/// Values of `columns` must be unique together across all rows.
///
/// Emits one failure per offending row (every row after the first
/// occurrence of a duplicate key), each addressed to its row index.
pub fn unique_together(columns: Vec<String>) -> Rule {
    let label = columns.join(", ");
    Rule::cross_row(move |rows| {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for (row_index, row) in rows.iter().enumerate() {
            let Some(key) = composite_key(row, &columns) else {
                continue;
            };
            if !seen.insert(key.clone()) {
                results.push(
                    ValidationResult::failure(
                        Severity::Error,
                        format!("Duplicate value '{key}' for [{label}]"),
                    )
                    .at_row(row_index),
                );
            }
        }
        Ok(results)
    })
}

/// Values of a single column must be unique across all rows.
pub fn unique(column: impl Into<String>) -> Rule {
    unique_together(vec![column.into()])
}

/// Dataset-level completeness floor: at least `threshold` (0.0 to 1.0) of
/// rows must have a non-null value in `column`. Tagged `Complex`.
pub fn completeness(column: impl Into<String>, threshold: f64) -> Rule {
    let column = column.into();
    Rule::complex(move |dataset| {
        if dataset.is_empty() {
            return Ok(ValidationResult::success());
        }
        let non_null = dataset
            .rows()
            .filter(|row| row.get(&column).is_some_and(|v| !v.is_null()))
            .count();
        let ratio = non_null as f64 / dataset.len() as f64;
        if ratio < threshold {
            Ok(ValidationResult::failure(
                Severity::Warning,
                format!(
                    "Completeness check failed for field '{}': {:.2}% < {:.2}% (threshold)",
                    column,
                    ratio * 100.0,
                    threshold * 100.0
                ),
            ))
        } else {
            Ok(ValidationResult::success())
        }
    })
    .with_severity(Severity::Warning)
}

/// Dataset must contain at least `minimum` rows. Tagged `Business`.
pub fn min_row_count(minimum: usize) -> Rule {
    Rule::business(move |dataset| {
        if dataset.len() < minimum {
            Ok(ValidationResult::failure(
                Severity::Error,
                format!(
                    "Dataset has {} rows, at least {minimum} required",
                    dataset.len()
                ),
            ))
        } else {
            Ok(ValidationResult::success())
        }
    })
}

/// Builds the composite comparison key for uniqueness checks.
///
/// Rows missing any of the key columns are skipped, matching the
/// completeness rule's ownership of missing-value reporting.
fn composite_key(row: &GridRow, columns: &[String]) -> Option<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        parts.push(row.get(column)?.display());
    }
    Some(parts.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridDataset;
    use pretty_assertions::assert_eq;

    fn row(column: &str, value: impl Into<CellValue>) -> GridRow {
        GridRow::new().set(column, value)
    }

    #[test]
    fn test_range_rejects_out_of_bounds() {
        let rule = range("Age", 0.0, 120.0).named("age-range");

        let result = rule.evaluate_cell(&CellValue::Int(150), &row("Age", 150i64));
        assert!(!result.is_valid);
        assert!(result.severity >= Severity::Error);
        assert_eq!(result.value, Some(CellValue::Int(150)));

        let result = rule.evaluate_cell(&CellValue::Int(40), &row("Age", 40i64));
        assert!(result.is_valid);
        assert_eq!(result.rule_name, None);
        assert_eq!(result.column, None);
    }

    #[test]
    fn test_range_rejects_non_numeric() {
        let rule = range("Age", 0.0, 120.0);
        let result = rule.evaluate_cell(&CellValue::from("old"), &row("Age", "old"));
        assert!(!result.is_valid);
        assert!(result.message.as_deref().unwrap().contains("numeric"));
    }

    #[test]
    fn test_range_skips_null() {
        let rule = range("Age", 0.0, 120.0);
        assert!(rule.evaluate_cell(&CellValue::Null, &GridRow::new()).is_valid);
    }

    #[test]
    fn test_required() {
        let rule = required("Name");
        assert!(!rule.evaluate_cell(&CellValue::Null, &GridRow::new()).is_valid);
        assert!(rule.evaluate_cell(&CellValue::from("x"), &GridRow::new()).is_valid);
    }

    #[test]
    fn test_pattern() {
        let rule = pattern("Url", r"^https?://.*").unwrap();
        assert!(
            rule.evaluate_cell(&CellValue::from("https://example.com"), &GridRow::new())
                .is_valid
        );
        assert!(!rule.evaluate_cell(&CellValue::from("not-a-url"), &GridRow::new()).is_valid);
    }

    #[test]
    fn test_invalid_pattern_is_construction_error() {
        let err = pattern("Url", "[invalid(regex").unwrap_err();
        assert!(matches!(err, EngineError::InvalidRegex { .. }));
    }

    #[test]
    fn test_allowed_values() {
        let rule = allowed_values("Status", vec!["active".into(), "inactive".into()]);
        assert!(rule.evaluate_cell(&CellValue::from("active"), &GridRow::new()).is_valid);

        let result = rule.evaluate_cell(&CellValue::from("pending"), &GridRow::new());
        assert!(!result.is_valid);
        assert!(result.message.as_deref().unwrap().contains("allowed values"));
    }

    #[test]
    fn test_allowed_values_compares_numbers_by_display() {
        let rule = allowed_values("Code", vec!["1".into(), "2".into()]);
        assert!(rule.evaluate_cell(&CellValue::Int(1), &GridRow::new()).is_valid);
        assert!(!rule.evaluate_cell(&CellValue::Int(3), &GridRow::new()).is_valid);
    }

    #[test]
    fn test_required_when() {
        let rule = required_when("Region", "Country", CellValue::from("US"));

        let gated = GridRow::new().set("Country", "US");
        assert!(!rule.evaluate_row(&gated).is_valid);

        let satisfied = GridRow::new().set("Country", "US").set("Region", "CA");
        assert!(rule.evaluate_row(&satisfied).is_valid);

        let ungated = GridRow::new().set("Country", "FR");
        assert!(rule.evaluate_row(&ungated).is_valid);
    }

    #[test]
    fn test_unique_addresses_offending_rows() {
        let rule = unique("Email").named("unique-email");
        let rows = vec![
            row("Email", "a@x.io"),
            row("Email", "b@x.io"),
            row("Email", "a@x.io"),
        ];

        let results = rule.evaluate_rows(&rows);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].row_index, Some(2));
        assert_eq!(results[0].rule_name.as_deref(), Some("unique-email"));
    }

    #[test]
    fn test_completeness() {
        let mut dataset = GridDataset::empty();
        for i in 0..10 {
            if i < 9 {
                dataset.add_row(row("Id", i as i64));
            } else {
                dataset.add_row(GridRow::new().set("Id", CellValue::Null));
            }
        }

        let strict = completeness("Id", 0.95);
        assert!(!strict.evaluate_dataset(&dataset).is_valid);

        let lenient = completeness("Id", 0.8);
        assert!(lenient.evaluate_dataset(&dataset).is_valid);
    }

    #[test]
    fn test_min_row_count() {
        let rule = min_row_count(2);
        let one = GridDataset::from_rows(vec![GridRow::new()]);
        assert!(!rule.evaluate_dataset(&one).is_valid);

        let two = GridDataset::from_rows(vec![GridRow::new(), GridRow::new()]);
        assert!(rule.evaluate_dataset(&two).is_valid);
    }
}
