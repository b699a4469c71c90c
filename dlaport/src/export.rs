//! Export subcommand - checkpoint to portable graph to mobile graph.

use crate::config::ProjectConfig;
use crate::hint::explain;
use crate::report::{self, Outcomes};
use dlaport_core::prompt::{PromptLabels, PromptSpec};
use dlaport_core::types::{ArtifactKind, Precision, Stage};
use eyre::Result;
use std::path::PathBuf;

/// Which export stages to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Portable graph only
    #[value(alias = "pt")]
    Graph,
    /// Mobile graph only
    #[value(alias = "tflite")]
    Mobile,
    /// Portable graph, then mobile graph
    All,
}

impl Format {
    fn includes_graph(self) -> bool {
        matches!(self, Format::Graph | Format::All)
    }

    fn includes_mobile(self) -> bool {
        matches!(self, Format::Mobile | Format::All)
    }
}

/// Mobile graph precision as accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PrecisionArg {
    F32,
    Int8,
}

impl From<PrecisionArg> for Precision {
    fn from(precision: PrecisionArg) -> Self {
        match precision {
            PrecisionArg::F32 => Precision::Float32,
            PrecisionArg::Int8 => Precision::Int8,
        }
    }
}

/// Prompt labels baked into the exported graph.
///
/// Unknown labels are not rejected; each falls back to its default id.
#[derive(clap::Args, Debug)]
pub struct PromptArgs {
    /// Language code (auto, zh, en, yue, ja, ko, nospeech)
    #[arg(long, default_value = "auto")]
    pub language: String,

    /// Emotion event (HAPPY, SAD, ANGRY, NEUTRAL)
    #[arg(long, default_value = "HAPPY")]
    pub event: String,

    /// Audio event type (Speech, Music, Applause)
    #[arg(long, default_value = "Speech")]
    pub event_type: String,

    /// Text normalization (withitn, woitn)
    #[arg(long, default_value = "woitn")]
    pub text_norm: String,
}

impl From<PromptArgs> for PromptLabels {
    fn from(args: PromptArgs) -> Self {
        Self {
            language: args.language,
            event: args.event,
            event_type: args.event_type,
            text_norm: args.text_norm,
        }
    }
}

/// CLI arguments for model export.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Stages to run
    #[arg(short, long, value_enum, default_value_t = Format::All)]
    pub format: Format,

    /// Mobile graph precision
    #[arg(long, value_enum, default_value_t = PrecisionArg::F32)]
    pub precision: PrecisionArg,

    #[command(flatten)]
    pub prompt: PromptArgs,

    /// Checkpoint directory (default: models/sensevoice-small)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Portable graph path (default: model_prepare/model/sensevoice_complete.pt)
    #[arg(long)]
    pub pt: Option<PathBuf>,

    /// Mobile graph path (default: model_prepare/model/sensevoice_complete.tflite)
    #[arg(long)]
    pub tflite: Option<PathBuf>,
}

/// Resolved configuration for model export.
#[derive(Debug)]
pub struct Config {
    pub format: Format,
    pub precision: Precision,
    pub prompt: PromptSpec,
    pub overrides: Vec<(ArtifactKind, PathBuf)>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let overrides = [
            (ArtifactKind::Checkpoint, args.model),
            (ArtifactKind::PortableGraph, args.pt),
            (ArtifactKind::MobileGraph, args.tflite),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|p| (kind, p)))
        .collect();

        Ok(Self {
            format: args.format,
            precision: args.precision.into(),
            prompt: PromptLabels::from(args.prompt).encode(),
            overrides,
        })
    }
}

pub fn execute(project: &ProjectConfig, config: Config) -> Result<()> {
    let store = config
        .overrides
        .into_iter()
        .fold(project.store(), |store, (kind, path)| store.with_path(kind, path));
    let mut pipeline = project.pipeline(store);

    report::banner("SenseVoice model export");
    report::pipeline(&pipeline);
    println!();

    tracing::info!(
        format = ?config.format,
        precision = ?config.precision,
        prompt = %config.prompt,
        "exporting model"
    );

    let mut outcomes = Outcomes::new("export");

    if config.format.includes_graph() {
        let result = pipeline.export_graph(config.prompt);
        outcomes.record(Stage::GraphExport, result.map(|r| report::stage(&r)).map_err(explain));
    }

    if config.format.includes_mobile() {
        let result = pipeline.export_mobile(config.precision);
        outcomes.record(Stage::MobileExport, result.map(|r| report::stage(&r)).map_err(explain));
    }

    outcomes.finish()
}
