//! Parser for declarative rule manifests (YAML/TOML formats).
//!
//! Persistence of rules is the caller's responsibility; this crate is
//! that caller-side collaborator. A manifest declares per-column rules,
//! recursive rule groups, and optional engine settings, and compiles into
//! registry-ready [`Rule`] and [`RuleGroup`] values.
//!
//! # Example
//!
//! ```rust
//! use gridval_manifest::parse_yaml;
//!
//! let yaml = r#"
//! version: "1.0.0"
//! name: customers
//! columns:
//!   - name: Age
//!     rules:
//!       - type: range
//!         min: 0
//!         max: 120
//!   - name: Email
//!     rules:
//!       - type: required
//!       - type: unique
//! "#;
//!
//! let manifest = parse_yaml(yaml).expect("Failed to parse manifest");
//! assert_eq!(manifest.name, "customers");
//! assert_eq!(manifest.build_rules().unwrap().len(), 3);
//! ```

use gridval_core::{
    rules, CellValue, EngineError, LogicalOperator, Rule, RuleGroup, Severity,
    ValidationConfiguration,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during manifest parsing or rule building.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,

    /// A declared rule could not be built (e.g. an unparsable regex)
    #[error("Failed to build rule: {0}")]
    RuleError(#[from] EngineError),
}

/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Supported manifest file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
}

/// A declarative rule manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Semantic version of the manifest document
    pub version: String,

    /// Name of the grid/dataset this manifest describes
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Engine settings overriding the configuration defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ManifestSettings>,

    /// Per-column rule declarations
    #[serde(default)]
    pub columns: Vec<ColumnRules>,

    /// Rule-group declarations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,

    /// Minimum dataset row count, enforced as a business rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rows: Option<usize>,
}

/// Engine settings a manifest may override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestSettings {
    /// See [`ValidationConfiguration::stop_all_on_first_error`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_all_on_first_error: Option<bool>,

    /// See [`ValidationConfiguration::real_time_max_rows`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time_max_rows: Option<usize>,

    /// See [`ValidationConfiguration::real_time_max_rules`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time_max_rules: Option<usize>,

    /// Real-time budget in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time_max_duration_ms: Option<u64>,

    /// See [`ValidationConfiguration::real_time_priority_cutoff`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time_priority_cutoff: Option<u32>,

    /// See [`ValidationConfiguration::max_concurrent_validations`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_validations: Option<usize>,
}

/// Rules declared for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRules {
    /// Column name
    pub name: String,

    /// Rule declarations, in manifest order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// One declared rule: a kind plus optional common attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// The check this rule performs
    #[serde(flatten)]
    pub kind: RuleSpecKind,

    /// Failure severity override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Explicit rule name (registry key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Evaluation priority, lower runs first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

/// The declarable rule kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleSpecKind {
    /// Cell must be present and non-null
    Required,

    /// Numeric cell must be within `[min, max]`
    Range {
        /// Minimum value (inclusive)
        min: f64,
        /// Maximum value (inclusive)
        max: f64,
    },

    /// String cell must match the regex pattern
    Pattern {
        /// Regular expression pattern
        regex: String,
    },

    /// Cell must be one of the allowed values
    AllowedValues {
        /// List of valid values
        values: Vec<String>,
    },

    /// Cell must equal the given value
    Equals {
        /// Expected value
        value: serde_json::Value,
    },

    /// Column values must be unique across all rows
    Unique,

    /// Cell must be non-null when another column holds a given value
    RequiredWhen {
        /// The gating column
        when_column: String,
        /// The gating value
        when_value: serde_json::Value,
    },

    /// Non-null ratio across the dataset must reach the threshold
    Completeness {
        /// Minimum ratio of non-null values (0.0 to 1.0)
        threshold: f64,
    },
}

/// A declared rule group; recursive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Group name (registry key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Column the group is attached to
    pub column: String,

    /// Combinator across children
    #[serde(default)]
    pub operator: LogicalOperator,

    /// Evaluation priority among the column's groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Direct child rules
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Child groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
}

impl Manifest {
    /// Builds every flat rule the manifest declares, including the
    /// dataset-level row-count floor. Group rules are not included; see
    /// [`build_groups`](Self::build_groups).
    pub fn build_rules(&self) -> Result<Vec<Rule>> {
        let mut built = Vec::new();
        for column in &self.columns {
            for spec in &column.rules {
                built.push(spec.build(&column.name)?);
            }
        }
        if let Some(minimum) = self.min_rows {
            built.push(rules::min_row_count(minimum).named(format!("{}-min-rows", self.name)));
        }
        Ok(built)
    }

    /// Builds every declared rule group.
    pub fn build_groups(&self) -> Result<Vec<RuleGroup>> {
        self.groups.iter().map(GroupSpec::build).collect()
    }

    /// The engine configuration with this manifest's settings applied.
    pub fn configuration(&self) -> ValidationConfiguration {
        let mut config = ValidationConfiguration::default();
        let Some(settings) = &self.settings else {
            return config;
        };
        if let Some(stop) = settings.stop_all_on_first_error {
            config = config.with_stop_all_on_first_error(stop);
        }
        if let Some(rows) = settings.real_time_max_rows {
            config = config.with_real_time_max_rows(rows);
        }
        if let Some(rule_count) = settings.real_time_max_rules {
            config = config.with_real_time_max_rules(rule_count);
        }
        if let Some(ms) = settings.real_time_max_duration_ms {
            config = config.with_real_time_max_duration(Duration::from_millis(ms));
        }
        if let Some(cutoff) = settings.real_time_priority_cutoff {
            config = config.with_real_time_priority_cutoff(cutoff);
        }
        if let Some(max) = settings.max_concurrent_validations {
            config = config.with_max_concurrent_validations(max);
        }
        config
    }

    /// Column names the manifest mentions, in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl RuleSpec {
    /// Builds the rule this spec declares for `column`.
    pub fn build(&self, column: &str) -> Result<Rule> {
        let mut rule = match &self.kind {
            RuleSpecKind::Required => rules::required(column),
            RuleSpecKind::Range { min, max } => rules::range(column, *min, *max),
            RuleSpecKind::Pattern { regex } => rules::pattern(column, regex)?,
            RuleSpecKind::AllowedValues { values } => {
                rules::allowed_values(column, values.clone())
            }
            RuleSpecKind::Equals { value } => {
                rules::equals(column, CellValue::from(value.clone()))
            }
            RuleSpecKind::Unique => rules::unique(column),
            RuleSpecKind::RequiredWhen {
                when_column,
                when_value,
            } => rules::required_when(column, when_column, CellValue::from(when_value.clone())),
            RuleSpecKind::Completeness { threshold } => rules::completeness(column, *threshold),
        };

        if let Some(severity) = self.severity {
            rule = rule.with_severity(severity);
        }
        if let Some(name) = &self.name {
            rule = rule.named(name);
        }
        if let Some(priority) = self.priority {
            rule = rule.with_priority(priority);
        }
        Ok(rule)
    }
}

impl GroupSpec {
    /// Builds the group this spec declares, recursively.
    pub fn build(&self) -> Result<RuleGroup> {
        let mut group = RuleGroup::new(&self.column).with_operator(self.operator);
        if let Some(name) = &self.name {
            group = group.named(name);
        }
        if let Some(priority) = self.priority {
            group = group.with_priority(priority);
        }
        for spec in &self.rules {
            group = group.rule(spec.build(&self.column)?);
        }
        for child in &self.groups {
            group = group.group(child.build()?);
        }
        Ok(group)
    }
}

/// Parse a manifest from a YAML string.
///
/// # Example
///
/// ```rust
/// use gridval_manifest::parse_yaml;
///
/// let yaml = r#"
/// version: "1.0.0"
/// name: my_grid
/// columns: []
/// "#;
///
/// let manifest = parse_yaml(yaml).unwrap();
/// assert_eq!(manifest.name, "my_grid");
/// ```
pub fn parse_yaml(content: &str) -> Result<Manifest> {
    let manifest: Manifest = serde_yaml_ng::from_str(content)?;
    Ok(manifest)
}

/// Parse a manifest from a TOML string.
///
/// # Example
///
/// ```rust
/// use gridval_manifest::parse_toml;
///
/// let toml = r#"
/// version = "1.0.0"
/// name = "my_grid"
///
/// [[columns]]
/// name = "Age"
///
/// [[columns.rules]]
/// type = "required"
/// "#;
///
/// let manifest = parse_toml(toml).unwrap();
/// assert_eq!(manifest.columns.len(), 1);
/// ```
pub fn parse_toml(content: &str) -> Result<Manifest> {
    let manifest: Manifest =
        toml::from_str(content).map_err(|e| ManifestError::TomlError(e.to_string()))?;
    Ok(manifest)
}

/// Detect the manifest format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → [`ManifestFormat::Yaml`]
/// * `.toml` → [`ManifestFormat::Toml`]
pub fn detect_format(path: &Path) -> Result<ManifestFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ManifestError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(ManifestFormat::Yaml),
        "toml" => Ok(ManifestFormat::Toml),
        other => Err(ManifestError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a manifest from a file with automatic format detection.
pub fn parse_file(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)?;
    let format = detect_format(path)?;

    match format {
        ManifestFormat::Yaml => parse_yaml(&content),
        ManifestFormat::Toml => parse_toml(&content),
    }
}
