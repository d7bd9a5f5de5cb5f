//! `cairn outputs` — Emit the export table of a manifest.

use std::path::PathBuf;

use cairn_common::config::Environment;
use cairn_common::constants::DEFAULT_MANIFEST;
use clap::Args;

use crate::output::{OutputFormat, render_exports};

/// Arguments for the `outputs` command.
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Serialization of the table.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Executes the `outputs` command.
///
/// # Errors
///
/// Returns an error if composition or serialization fails.
pub fn execute(args: OutputsArgs, environment: Environment) -> anyhow::Result<()> {
    let stack = super::compose_manifest(&args.file, environment)?;
    print!("{}", render_exports(&stack.export_table(), args.format)?);
    Ok(())
}
