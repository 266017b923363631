use colored::*;
use gridval_core::{Severity, ValidationError, ValidationResult};
use gridval_engine::StatisticsSnapshot;
use serde_json::json;
use std::time::Duration;

/// Report assembled for the command line from a validation pass.
pub struct GridReport {
    pub passed: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
    pub rows_validated: usize,
    pub duration_ms: u64,
}

impl GridReport {
    /// Splits results into errors and warnings by severity. In strict
    /// mode every failure counts as an error.
    pub fn from_results(
        results: &[ValidationResult],
        rows_validated: usize,
        strict: bool,
        duration: Duration,
    ) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for error in results.iter().filter_map(ValidationError::from_result) {
            if strict || error.severity >= Severity::Error {
                errors.push(error);
            } else {
                warnings.push(error);
            }
        }

        Self {
            passed: errors.is_empty(),
            errors,
            warnings,
            rows_validated,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

pub fn print_validation_report(report: &GridReport, format: &str) {
    match format {
        "json" => print_json_report(report),
        _ => print_text_report(report),
    }
}

fn print_text_report(report: &GridReport) {
    println!("\n{}", "═".repeat(60));
    println!("{}", "  VALIDATION REPORT".bold());
    println!("{}", "═".repeat(60));

    if report.passed {
        println!(
            "\n{} {}",
            "✓".green().bold(),
            "Validation PASSED".green().bold()
        );
    } else {
        println!(
            "\n{} {}",
            "✗".red().bold(),
            "Validation FAILED".red().bold()
        );
    }

    if !report.errors.is_empty() {
        println!("\n{}", "Errors:".red().bold());
        for (i, error) in report.errors.iter().enumerate() {
            println!("  {}. {}", i + 1, error.to_string().red());
        }
    }

    if !report.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for (i, warning) in report.warnings.iter().enumerate() {
            println!("  {}. {}", i + 1, warning.to_string().yellow());
        }
    }

    println!("\n{}", "Summary:".bold());
    println!("  Rows validated: {}", report.rows_validated);
    println!("  Total errors:   {}", report.errors.len());
    println!("  Total warnings: {}", report.warnings.len());
    println!("  Duration:       {}ms", report.duration_ms);
    println!("{}", "═".repeat(60));
}

fn print_json_report(report: &GridReport) {
    let output = json!({
        "passed": report.passed,
        "errors": report.errors,
        "warnings": report.warnings,
        "summary": {
            "rows_validated": report.rows_validated,
            "error_count": report.errors.len(),
            "warning_count": report.warnings.len(),
            "duration_ms": report.duration_ms,
        }
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_statistics(snapshot: &StatisticsSnapshot) {
    println!("\n{}", "Engine statistics:".bold());
    println!("  Validations:  {}", snapshot.total_count);
    println!("  Succeeded:    {}", snapshot.success_count);
    println!("  Failed:       {}", snapshot.failure_count);
    println!("  Timed out:    {}", snapshot.timeout_count);
    println!("  Average time: {:?}", snapshot.average_time);
    if !snapshot.by_type.is_empty() {
        let mut by_type: Vec<_> = snapshot.by_type.iter().collect();
        by_type.sort_by_key(|(rule_type, _)| rule_type.to_string());
        let rendered: Vec<String> = by_type
            .iter()
            .map(|(rule_type, count)| format!("{rule_type}={count}"))
            .collect();
        println!("  By type:      {}", rendered.join(", "));
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

#[allow(dead_code)]
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
