//! CLI argument definitions using clap.

use crate::config::{ProjectArgs, ProjectConfig};
use clap::{Parser, Subcommand};
use eyre::Result;

#[derive(Debug, Parser)]
#[command(name = "dlaport")]
#[command(about = "Export, compile and validate SenseVoice for MediaTek NPUs")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export the checkpoint to portable and mobile graphs
    Export(crate::export::Args),

    /// Compile the mobile graph into an NPU device binary
    Compile(crate::compile::Args),

    /// Compare converted logits with the reference and decode them to text
    Validate(crate::validate::Args),

    /// Capture reference logits from the native model
    Capture(crate::capture::Args),
}

/// Execute CLI command - separated for testing.
pub fn run_cli(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    let project = ProjectConfig::try_from(cli.project)?;

    match cli.command {
        Commands::Export(args) => crate::export::execute(&project, args.try_into()?),
        Commands::Compile(args) => crate::compile::execute(&project, args.try_into()?),
        Commands::Validate(args) => crate::validate::execute(&project, args.try_into()?),
        Commands::Capture(args) => crate::capture::execute(&project, args.try_into()?),
    }
}
