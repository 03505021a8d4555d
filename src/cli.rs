//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::RuleformConfig;
use crate::domain::error::RuleformError;
use crate::domain::normalizer::normalize;
use crate::domain::pipeline::submit;
use crate::domain::rule::Strategy;
use crate::domain::validator::validate;

#[derive(Parser, Debug)]
#[command(
    name = "ruleform",
    about = "Normalize and validate strategy condition trees"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalize an authoring tree into canonical JSON
    Normalize {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a canonical strategy
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Normalize then validate an authoring tree
    Check {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the indicator catalog
    Catalog {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

/// Runs one subcommand; errors are reported by [`run`].
pub fn execute(command: Command) -> Result<(), RuleformError> {
    match command {
        Command::Normalize {
            input,
            config,
            output,
        } => run_normalize(&input, config.as_deref(), output.as_deref()),
        Command::Validate { strategy, config } => run_validate(&strategy, config.as_deref()),
        Command::Check {
            input,
            config,
            output,
        } => run_check(&input, config.as_deref(), output.as_deref()),
        Command::Catalog { config } => run_catalog(&config),
    }
}

fn report_error(err: &RuleformError) -> ExitCode {
    match err {
        RuleformError::Violations(report) => {
            warn!(violations = report.len(), "strategy rejected");
            eprintln!("error: {} violation(s)", report.len());
            for violation in report {
                eprintln!("  {violation}");
            }
        }
        other => eprintln!("error: {other}"),
    }
    ExitCode::from(err)
}

/// Loads settings from `path`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<RuleformConfig, RuleformError> {
    let Some(path) = path else {
        return Ok(RuleformConfig::default());
    };
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| RuleformError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let config = RuleformConfig::from_port(&adapter)?;
    info!(
        file = %path.display(),
        indicators = config.catalog.len(),
        max_depth = config.max_depth,
        "loaded config"
    );
    Ok(config)
}

pub fn read_json(path: &Path) -> Result<Value, RuleformError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| RuleformError::Json {
        origin: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn write_output(text: &str, output: Option<&Path>) -> Result<(), RuleformError> {
    match output {
        Some(path) => {
            fs::write(path, format!("{text}\n"))?;
            info!(file = %path.display(), "wrote canonical strategy");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn pretty(value: &Value, origin: &str) -> Result<String, RuleformError> {
    serde_json::to_string_pretty(value).map_err(|e| RuleformError::Json {
        origin: origin.to_string(),
        reason: e.to_string(),
    })
}

/// Normalized canonical JSON text for the authoring tree at `input`.
pub fn normalize_file(input: &Path, config: &RuleformConfig) -> Result<String, RuleformError> {
    let ui = read_json(input)?;
    let canonical = normalize(&ui, config)?;
    pretty(&canonical, "normalized output")
}

pub fn validate_file(strategy: &Path, config: &RuleformConfig) -> Result<Strategy, RuleformError> {
    let candidate = read_json(strategy)?;
    Ok(validate(&candidate, config)?)
}

pub fn check_file(input: &Path, config: &RuleformConfig) -> Result<String, RuleformError> {
    let ui = read_json(input)?;
    let submission = submit(&ui, config)?;
    pretty(&submission.canonical, "canonical output")
}

fn run_normalize(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), RuleformError> {
    let config = load_config(config)?;
    let text = normalize_file(input, &config)?;
    write_output(&text, output)
}

fn run_validate(strategy_path: &Path, config: Option<&Path>) -> Result<(), RuleformError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let config = load_config(config)?;
    let strategy = validate_file(strategy_path, &config)?;

    for (label, set) in [
        ("Entry", &strategy.entry_conditions),
        ("Exit", &strategy.exit_conditions),
    ] {
        if let Some(set) = set {
            eprintln!("\n{label} Conditions:");
            eprintln!("  {set}");
        }
    }
    let indicators = strategy.indicator_names();
    if !indicators.is_empty() {
        eprintln!("\nIndicators: {}", indicators.join(", "));
    }
    eprintln!("\nStrategy is valid.");
    Ok(())
}

fn run_check(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), RuleformError> {
    let config = load_config(config)?;
    let text = check_file(input, &config)?;
    write_output(&text, output)
}

fn run_catalog(config_path: &Path) -> Result<(), RuleformError> {
    let config = load_config(Some(config_path))?;
    if config.catalog.is_empty() {
        eprintln!("No indicators configured in {}", config_path.display());
        return Ok(());
    }
    println!("{:<16} Parameters", "Indicator");
    println!("{}", "-".repeat(40));
    for (name, keys) in config.catalog.iter() {
        let params = if keys.is_empty() {
            "(none)".to_string()
        } else {
            keys.join(", ")
        };
        println!("{name:<16} {params}");
    }
    Ok(())
}
