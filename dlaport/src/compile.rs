//! Compile subcommand - mobile graph to NPU device binary.

use crate::config::ProjectConfig;
use crate::hint::explain;
use crate::report::{self, Outcomes};
use dlaport_core::platform::DeviceTarget;
use dlaport_core::types::{ArtifactKind, Stage};
use eyre::Result;
use std::path::PathBuf;

/// SDK location used when neither `--sdk` nor `NEURON_SDK_ROOT` is set.
pub const DEFAULT_SDK_ROOT: &str = "/opt/neuropilot/neuron_sdk";

/// CLI arguments for device compilation.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Target platform
    #[arg(long, default_value = "MT8371")]
    pub platform: String,

    /// Neuron SDK root
    #[arg(long, env = "NEURON_SDK_ROOT", default_value = DEFAULT_SDK_ROOT)]
    pub sdk: PathBuf,

    /// Mobile graph path (default: model_prepare/model/sensevoice_complete.tflite)
    #[arg(long)]
    pub tflite: Option<PathBuf>,

    /// Device binary path (default: compile/sensevoice_<PLATFORM>.dla)
    #[arg(long)]
    pub dla: Option<PathBuf>,
}

/// Resolved configuration for device compilation.
#[derive(Debug)]
pub struct Config {
    pub target: DeviceTarget,
    pub sdk: PathBuf,
    pub tflite: Option<PathBuf>,
    pub dla: Option<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let target = DeviceTarget::from_platform(&args.platform).map_err(explain)?;

        Ok(Self {
            target,
            sdk: args.sdk,
            tflite: args.tflite,
            dla: args.dla,
        })
    }
}

pub fn execute(project: &ProjectConfig, config: Config) -> Result<()> {
    let mut store = project.store();
    if let Some(path) = config.tflite {
        store = store.with_path(ArtifactKind::MobileGraph, path);
    }
    if let Some(path) = config.dla {
        store = store.with_path(ArtifactKind::DeviceBinary, path);
    }
    let mut pipeline = project.pipeline(store);

    report::banner("SenseVoice DLA compilation");
    report::pipeline(&pipeline);
    println!("platform: {}", config.target.platform);
    println!("arch:     {}", config.target.arch);
    println!("sdk:      {:?}", config.sdk.display());
    println!();

    let mut outcomes = Outcomes::new("compile");

    let result = pipeline.compile_device(&config.target, &config.sdk);
    outcomes.record(Stage::DeviceCompile, result.map(|r| report::stage(&r)).map_err(explain));

    outcomes.finish()
}
