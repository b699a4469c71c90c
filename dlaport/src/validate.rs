//! Validate subcommand - logits comparison and transcript decoding.

use crate::config::ProjectConfig;
use crate::hint::explain;
use crate::report::{self, Outcomes};
use dlaport_core::compare::{PASS_THRESHOLD_PCT, compare_files};
use dlaport_core::ctc::decode_file;
use eyre::{Result, bail};
use std::path::{Path, PathBuf};

/// Which validation steps to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ValidateMode {
    /// Compare converted logits against the reference
    Compare,
    /// Decode converted logits to text
    Decode,
    /// Compare, then decode
    All,
}

/// CLI arguments for validation.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Steps to run
    #[arg(short, long, value_enum, default_value_t = ValidateMode::All)]
    pub mode: ValidateMode,

    /// Reference logits (default: output/pytorch_logits.npy)
    #[arg(long, visible_alias = "pytorch")]
    pub reference: Option<PathBuf>,

    /// Converted logits (default: output/tflite_logits.npy)
    #[arg(long, visible_alias = "tflite")]
    pub converted: Option<PathBuf>,

    /// Vocabulary file (default: models/sensevoice-small/tokens.txt)
    #[arg(long)]
    pub tokens: Option<PathBuf>,

    /// Transcript output (default: output/transcription.txt)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Resolved configuration for validation.
#[derive(Debug)]
pub struct Config {
    pub mode: ValidateMode,
    pub reference: Option<PathBuf>,
    pub converted: Option<PathBuf>,
    pub tokens: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            mode: args.mode,
            reference: args.reference,
            converted: args.converted,
            tokens: args.tokens,
            output: args.output,
        })
    }
}

pub fn execute(project: &ProjectConfig, config: Config) -> Result<()> {
    let store = project.store();

    let reference = config.reference.unwrap_or_else(|| store.reference_logits().path);
    let converted = config.converted.unwrap_or_else(|| store.converted_logits());
    let tokens = config.tokens.unwrap_or_else(|| store.vocabulary());
    let output = config.output.unwrap_or_else(|| store.transcript());

    let mut outcomes = Outcomes::new("validate");

    if matches!(config.mode, ValidateMode::Compare | ValidateMode::All) {
        outcomes.record("compare", compare(&reference, &converted));
    }

    if matches!(config.mode, ValidateMode::Decode | ValidateMode::All) {
        outcomes.record("decode", decode(&converted, &tokens, &output));
    }

    outcomes.finish()
}

fn compare(reference: &Path, converted: &Path) -> Result<()> {
    report::banner("SenseVoice logits comparison");

    println!("reference: {:?}", reference.display());
    println!("converted: {:?}", converted.display());
    println!();

    let comparison = compare_files(reference, converted).map_err(explain)?;
    report::comparison(&comparison);

    let result = comparison.result;
    if !result.passed {
        bail!(
            "token accuracy {:.2}% is below {PASS_THRESHOLD_PCT}%",
            result.token_accuracy_pct
        );
    }

    Ok(())
}

fn decode(logits: &Path, tokens: &Path, output: &Path) -> Result<()> {
    report::banner("SenseVoice transcript decoding");

    println!("logits:     {:?}", logits.display());
    println!("vocabulary: {:?}", tokens.display());
    println!();

    let transcript = decode_file(logits, tokens, output).map_err(explain)?;
    report::transcript(&transcript, output);

    Ok(())
}
