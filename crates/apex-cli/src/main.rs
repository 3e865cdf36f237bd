// crates/apex-cli/src/main.rs
// ============================================================================
// Module: APEX CLI Entry Point
// Description: Command dispatcher for loading, validating, routing, and
//              evaluating configuration directories from the shell.
// Purpose: Give operators and CI a direct way to exercise `apex-config`'s
//          `Engine` without writing a host application.
// Dependencies: apex-config, apex-core, clap, serde_json, tokio, tracing.
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[cfg(test)]
mod cli_tests;

use apex_config::ConfigError;
use apex_config::Engine;
use apex_config::EngineDeps;
use apex_core::Record;
use clap::Parser;
use clap::Subcommand;

/// APEX: a declarative rules-and-enrichment engine driven by YAML
/// configuration.
#[derive(Debug, Parser)]
#[command(name = "apex", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load every configuration file under a directory and report any
    /// errors, without evaluating anything.
    Validate {
        /// Directory to load configuration from, recursively.
        #[arg(long)]
        config_dir: PathBuf,
    },
    /// Resolve a scenario id or data type against the loaded scenario
    /// registry and print which rule-config files it would run.
    Route {
        #[arg(long)]
        config_dir: PathBuf,
        #[arg(long)]
        scenario_id: Option<String>,
        #[arg(long)]
        data_type: Option<String>,
    },
    /// Resolve a scenario, then evaluate a JSON record against it and
    /// print the resulting report as JSON.
    Evaluate {
        #[arg(long)]
        config_dir: PathBuf,
        #[arg(long)]
        scenario_id: Option<String>,
        #[arg(long)]
        data_type: Option<String>,
        /// Path to a JSON file holding the record to evaluate.
        #[arg(long)]
        record: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read '{path}': {message}")]
    Io { path: String, message: String },
    #[error("failed to parse record json: {0}")]
    RecordJson(String),
    #[error("failed to write output: {0}")]
    Output(String),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            report_error(&format!("failed to start async runtime: {err}"));
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn report_error(message: &str) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {message}");
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Validate { config_dir } => validate(&config_dir),
        Command::Route { config_dir, scenario_id, data_type } => route(&config_dir, scenario_id, data_type),
        Command::Evaluate { config_dir, scenario_id, data_type, record } => {
            evaluate(&config_dir, scenario_id, data_type, &record).await
        }
    }
}

fn validate(config_dir: &std::path::Path) -> Result<(), CliError> {
    Engine::load_config(config_dir, EngineDeps::default())?;
    write_line(&format!("configuration under '{}' loaded successfully", config_dir.display()))
}

fn route(config_dir: &std::path::Path, scenario_id: Option<String>, data_type: Option<String>) -> Result<(), CliError> {
    let engine = Engine::load_config(config_dir, EngineDeps::default())?;
    let program = engine.route(scenario_id.as_deref(), data_type.as_deref())?;
    write_line(&format!(
        "scenario '{}' resolves to {} rule-config file(s)",
        program.scenario_id,
        program.configs.len()
    ))
}

async fn evaluate(
    config_dir: &std::path::Path,
    scenario_id: Option<String>,
    data_type: Option<String>,
    record_path: &std::path::Path,
) -> Result<(), CliError> {
    let engine = Engine::load_config(config_dir, EngineDeps::default())?;
    let program = engine.route(scenario_id.as_deref(), data_type.as_deref())?;

    let bytes = std::fs::read(record_path)
        .map_err(|err| CliError::Io { path: record_path.display().to_string(), message: err.to_string() })?;
    let json: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| CliError::RecordJson(err.to_string()))?;
    let record = Record::from_json(&json);

    let result = engine.evaluate(&program, record).await?;
    let output = serde_json::to_string_pretty(&result.report).map_err(|err| CliError::RecordJson(err.to_string()))?;
    write_line(&output)
}

fn write_line(message: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::Output(err.to_string()))
}
