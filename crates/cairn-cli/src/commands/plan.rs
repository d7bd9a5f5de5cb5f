//! `cairn plan` — Display the provisioning plan of a manifest.

use std::path::PathBuf;

use cairn_common::config::Environment;
use cairn_common::constants::DEFAULT_MANIFEST;
use clap::Args;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `plan` command.
///
/// Composes the manifest and prints every resource in provisioning order
/// with its derived name and dependencies, followed by the exports.
///
/// # Errors
///
/// Returns an error if loading or composition fails.
pub fn execute(args: PlanArgs, environment: Environment) -> anyhow::Result<()> {
    let stack = super::compose_manifest(&args.file, environment)?;
    print!("{}", crate::output::render_plan(&stack));
    Ok(())
}
