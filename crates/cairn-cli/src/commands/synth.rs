//! `cairn synth` — Emit the composed stack as JSON.

use std::path::PathBuf;

use cairn_common::config::Environment;
use cairn_common::constants::DEFAULT_MANIFEST;
use clap::Args;

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `synth` command.
///
/// # Errors
///
/// Returns an error if composition fails or the output cannot be written.
pub fn execute(args: SynthArgs, environment: Environment) -> anyhow::Result<()> {
    let stack = super::compose_manifest(&args.file, environment)?;
    let json = stack.to_json()?;

    if let Some(ref out_path) = args.output {
        std::fs::write(out_path, format!("{json}\n"))?;
        tracing::info!(path = %out_path.display(), "wrote stack");
        println!("Synthesized {} -> {}", args.file.display(), out_path.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
