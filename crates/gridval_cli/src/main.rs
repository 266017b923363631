mod commands;
mod output;
mod rows;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gve")]
#[command(version, about = "Grid Validation Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate grid data against a rule manifest
    Validate {
        /// Path to the rule manifest (YAML or TOML)
        manifest: String,

        /// Path to the rows file (JSON array of objects)
        data: String,

        /// Treat warnings as errors
        #[arg(short, long)]
        strict: bool,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Print engine statistics after validation
        #[arg(long)]
        stats: bool,
    },

    /// Check a rule manifest without validating data
    Check {
        /// Path to the rule manifest (YAML or TOML)
        manifest: String,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Preview validation-driven row deletion
    Prune {
        /// Path to the rule manifest (YAML or TOML)
        manifest: String,

        /// Path to the rows file (JSON array of objects)
        data: String,

        /// Deletion mode: invalid, valid, rule
        #[arg(long, default_value = "invalid")]
        mode: String,

        /// Minimum severity for invalid-row deletion: info, warning,
        /// error, critical
        #[arg(long)]
        severity: Option<String>,

        /// Rule names for rule-based deletion (repeatable)
        #[arg(long)]
        rule: Vec<String>,

        /// Mark the preview as cleared for execution
        #[arg(long)]
        execute: bool,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate a starter manifest from an existing rows file
    Init {
        /// Path to the rows file (JSON array of objects)
        data: String,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    // Execute command
    match cli.command {
        Commands::Validate {
            manifest,
            data,
            strict,
            format,
            stats,
        } => commands::validate::execute(&manifest, &data, strict, &format, stats).await,

        Commands::Check { manifest, format } => {
            commands::check::execute(&manifest, &format).await
        }

        Commands::Prune {
            manifest,
            data,
            mode,
            severity,
            rule,
            execute,
            format,
        } => {
            commands::prune::execute(&manifest, &data, &mode, severity.as_deref(), rule, execute, &format)
                .await
        }

        Commands::Init { data, output } => {
            commands::init::execute(&data, output.as_deref()).await
        }
    }
}
