// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use anyhow::{Context, Result};
use blueprint_engine::{Blueprint, Condition, Engine, EngineConfig, Environment, Severity};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn init_logging(level: Option<String>) {
    // `--log-level` wins over RUST_LOG. Logs go to stderr, diagnostics to stdout.
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn blueprint_validate(
    file: String,
    concurrency: Option<usize>,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<i32> {
    let blueprint =
        Blueprint::from_file(&file).with_context(|| format!("Failed to load {file}"))?;

    let mut config = EngineConfig::from_env()?;
    if let Some(n) = concurrency {
        config = config.with_concurrency(n);
    }
    if let Some(ms) = timeout_ms {
        config = config.with_step_timeout(Duration::from_millis(ms));
    }

    let engine = Engine::builder()
        .config(config)
        .environment(Environment::from_process())
        .build();
    let report = engine.run_blocking(&blueprint)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for d in &report.diagnostics {
            match d.severity {
                Severity::Error => eprintln!("{d}"),
                _ => println!("{d}"),
            }
        }
        let failed = report.rule_results.iter().filter(|r| !r.passed()).count();
        println!(
            "{} rule(s), {} failed, {} error(s)",
            report.rule_results.len(),
            failed,
            report.error_count()
        );
    }
    Ok(report.exit_code())
}

fn blueprint_predicates() -> Result<i32> {
    for condition in Condition::ALL {
        println!("{:<20} {}", condition.name(), condition.signature());
    }
    Ok(0)
}

#[derive(Subcommand)]
enum BlueprintCommand {
    /// Validate the sources of a blueprint against its ruleset.
    Validate {
        /// Blueprint file. json or yaml.
        #[arg(value_name = "blueprint.json|blueprint.yaml")]
        file: String,

        /// Maximum number of concurrent workers.
        #[arg(long, short)]
        concurrency: Option<usize>,

        /// Per step timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Log filter, for example `info` or `blueprint_engine=debug`.
        #[arg(long)]
        log_level: Option<String>,

        /// Print the report as json.
        #[arg(long)]
        json: bool,
    },

    /// List the available predicates and their signatures.
    Predicates,
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: BlueprintCommand,
}

fn main() -> Result<()> {
    // Parse and dispatch command.
    let cli = Cli::parse();
    let code = match cli.command {
        BlueprintCommand::Validate {
            file,
            concurrency,
            timeout_ms,
            log_level,
            json,
        } => {
            init_logging(log_level);
            blueprint_validate(file, concurrency, timeout_ms, json)?
        }
        BlueprintCommand::Predicates => blueprint_predicates()?,
    };
    std::process::exit(code)
}
