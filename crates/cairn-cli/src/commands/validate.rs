//! `cairn validate` — Compose a manifest and report success.

use std::path::PathBuf;

use cairn_common::config::Environment;
use cairn_common::constants::DEFAULT_MANIFEST;
use clap::Args;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `validate` command.
///
/// # Errors
///
/// Returns the first composition error.
pub fn execute(args: ValidateArgs, environment: Environment) -> anyhow::Result<()> {
    let stack = super::compose_manifest(&args.file, environment)?;
    println!(
        "{}: stack \"{}\" is valid ({} resources, {} exports)",
        args.file.display(),
        stack.name,
        stack.resources.len(),
        stack.exports.len()
    );
    println!("digest: {}", stack.digest()?);
    Ok(())
}
