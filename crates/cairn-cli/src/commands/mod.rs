//! CLI command definitions and dispatch.

pub mod outputs;
pub mod plan;
pub mod synth;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use cairn_common::config::Environment;
use cairn_common::constants::{BIN_NAME, DEFAULT_ACCOUNT, DEFAULT_ENVIRONMENT, DEFAULT_REGION};
use cairn_compose::Stack;
use clap::{Parser, Subcommand, ValueEnum};

/// cairn — Deterministic infrastructure stack composition.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Target environment name.
    #[arg(long, global = true, env = "CAIRN_ENVIRONMENT", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Target account identifier.
    #[arg(long, global = true, env = "CAIRN_ACCOUNT", default_value = DEFAULT_ACCOUNT)]
    pub account: String,

    /// Target region.
    #[arg(long, global = true, env = "CAIRN_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Diagnostic log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a manifest and report whether it is valid.
    Validate(validate::ValidateArgs),
    /// Display provisioning order, derived names and exports.
    Plan(plan::PlanArgs),
    /// Emit the composed stack as JSON.
    Synth(synth::SynthArgs),
    /// Emit the export table.
    Outputs(outputs::OutputsArgs),
}

impl Cli {
    /// Builds the target environment from the global options.
    ///
    /// # Errors
    ///
    /// Returns an error if any part is malformed.
    pub fn environment(&self) -> anyhow::Result<Environment> {
        Ok(Environment::new(&self.environment, &self.account, &self.region)?)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let environment = cli.environment()?;
    match cli.command {
        Command::Validate(args) => validate::execute(args, environment),
        Command::Plan(args) => plan::execute(args, environment),
        Command::Synth(args) => synth::execute(args, environment),
        Command::Outputs(args) => outputs::execute(args, environment),
    }
}

/// Loads the manifest at `path` and composes it for `environment`.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read, parsed or composed.
pub fn compose_manifest(path: &Path, environment: Environment) -> anyhow::Result<Stack> {
    let stack = cairn_compose::manifest::load_manifest(path)?
        .into_builder(environment)?
        .build()
        .with_context(|| format!("failed to compose {}", path.display()))?;
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "cairn",
            "plan",
            "stack.yaml",
            "--environment",
            "prod",
            "--region",
            "eu-west-1",
            "--log-format",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.log_format, LogFormat::Json);
        let env = cli.environment().expect("environment");
        assert_eq!(env.name, "prod");
        assert_eq!(env.region, "eu-west-1");
        assert!(matches!(cli.command, Command::Plan(_)));
    }

    #[test]
    fn malformed_environment_is_rejected() {
        let cli = Cli::try_parse_from(["cairn", "validate", "--environment", "Prod_1"])
            .expect("parse");
        assert!(cli.environment().is_err());
    }
}
