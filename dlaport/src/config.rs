//! Configuration types for resolved CLI arguments.
//!
//! Project-wide options live here; each subcommand module keeps its own
//! `Args`/`Config` pair.

use color_eyre::Section;
use dlaport_core::artifact::ArtifactStore;
use dlaport_core::invoker::ProcessInvoker;
use dlaport_core::stage::Pipeline;
use dlaport_core::types::PipelineMode;
use eyre::{Result, eyre};
use std::path::PathBuf;

/// Pipeline mode as accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    /// Model prepared for export and conversion
    Export,
    /// Native model, for capturing reference logits
    Native,
}

impl From<ModeArg> for PipelineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Export => PipelineMode::Export,
            ModeArg::Native => PipelineMode::Native,
        }
    }
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug)]
pub struct ProjectArgs {
    /// Project root holding models/, model_prepare/, compile/ and output/
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Pipeline mode (conversion stages need `export`, reference capture needs `native`)
    #[arg(long, env = "DLAPORT_MODE", value_enum, default_value_t = ModeArg::Export)]
    pub mode: ModeArg,

    /// Python interpreter running the converter scripts
    #[arg(long, global = true, default_value = "python3")]
    pub python: PathBuf,
}

/// Resolved project configuration.
#[derive(Debug)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub mode: PipelineMode,
    pub python: PathBuf,
}

impl TryFrom<ProjectArgs> for ProjectConfig {
    type Error = eyre::Error;

    fn try_from(args: ProjectArgs) -> Result<Self> {
        if !args.root.is_dir() {
            let e = eyre!("project root is not a directory: {:?}", args.root.display())
                .suggestion("pass the SenseVoice workspace with `--root <DIR>`");
            return Err(e);
        }

        Ok(Self {
            root: args.root,
            mode: args.mode.into(),
            python: args.python,
        })
    }
}

impl ProjectConfig {
    /// Artifact store rooted at the project root.
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.root)
    }

    /// Pipeline spawning real tools over `store`.
    pub fn pipeline(&self, store: ArtifactStore) -> Pipeline<ProcessInvoker> {
        tracing::debug!(mode = %self.mode, root = ?self.root.display(), "building pipeline");
        Pipeline::new(self.mode, store, ProcessInvoker).with_python(&self.python)
    }
}
