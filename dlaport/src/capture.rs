//! Capture subcommand - reference logits from the native model.

use crate::config::ProjectConfig;
use crate::hint::explain;
use crate::report::{self, Outcomes};
use dlaport_core::types::{ArtifactKind, Stage};
use eyre::Result;
use std::path::PathBuf;

/// CLI arguments for reference capture.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Input audio (default: audios/test_en.wav)
    #[arg(short, long)]
    pub audio: Option<PathBuf>,

    /// Reference logits output (default: output/pytorch_logits.npy)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Resolved configuration for reference capture.
#[derive(Debug)]
pub struct Config {
    pub audio: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            audio: args.audio,
            output: args.output,
        })
    }
}

pub fn execute(project: &ProjectConfig, config: Config) -> Result<()> {
    let mut store = project.store();
    let audio = config.audio.unwrap_or_else(|| store.test_audio());
    if let Some(path) = config.output {
        store = store.with_path(ArtifactKind::ReferenceLogits, path);
    }
    let mut pipeline = project.pipeline(store);

    report::banner("SenseVoice reference capture");
    report::pipeline(&pipeline);
    println!("audio: {:?}", audio.display());
    println!();

    let mut outcomes = Outcomes::new("capture");

    let result = pipeline.capture_reference(&audio);
    outcomes.record(Stage::ReferenceCapture, result.map(|r| report::stage(&r)).map_err(explain));

    outcomes.finish()
}
