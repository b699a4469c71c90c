//! Human-readable progress output on stdout.

use dlaport_core::compare::{Comparison, PASS_THRESHOLD_PCT};
use dlaport_core::ctc::Transcript;
use dlaport_core::stage::{Pipeline, StageReport};
use dlaport_core::traits::ToolInvoker;
use eyre::{Report, Result, eyre};
use std::fmt;
use std::path::Path;

const RULE_WIDTH: usize = 80;

fn rule() {
    println!("{}", "=".repeat(RULE_WIDTH));
}

/// Print a section title between two rules.
pub fn banner(title: &str) {
    rule();
    println!("  {title}");
    rule();
    println!();
}

/// Format a byte count in MiB with two decimal places.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Print the mode and project root a pipeline runs against.
pub fn pipeline<I: ToolInvoker>(pipeline: &Pipeline<I>) {
    println!("mode: {}", pipeline.mode());
    println!("root: {:?}", pipeline.store().root().display());
}

pub fn stage(report: &StageReport) {
    let stdout = report.stdout.trim_end();
    if !stdout.is_empty() {
        println!("{stdout}");
    }

    println!("✓ {} produced {:?}", report.stage, report.artifact.display());
    println!("  size: {}", format_mb(report.size));

    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    println!();
}

pub fn comparison(comparison: &Comparison) {
    let result = &comparison.result;

    for warning in &comparison.warnings {
        println!("warning: {warning}");
    }

    println!("difference:");
    println!("  max abs:  {:.6}", result.max_abs_diff);
    println!("  mean abs: {:.6}", result.mean_abs_diff);
    println!();
    println!("token agreement:");
    println!("  matched:  {} / {}", result.token_match_count, result.token_total);
    println!("  accuracy: {:.2}%", result.token_accuracy_pct);
    println!();

    if result.passed {
        println!("✓ comparison passed");
    } else {
        println!(
            "✗ comparison failed: token accuracy {:.2}% < {PASS_THRESHOLD_PCT}%",
            result.token_accuracy_pct
        );
    }
    println!();
}

pub fn transcript(transcript: &Transcript, output: &Path) {
    println!("tokens:   {}", transcript.token_ids.len());
    println!("raw text: {}", transcript.raw_text);
    println!("text:     {}", transcript.text);
    println!();
    println!("✓ transcript written to {:?}", output.display());
    println!();
}

/// One-line failure message with the error's cause chain, free of ANSI codes.
fn format_failure(step: &impl fmt::Display, e: &Report) -> String {
    format!("✗ {step} failed: {e:#}")
}

/// Tracks step outcomes for a command that runs several independent steps.
///
/// A failed step is printed and recorded; later steps still run. The command
/// succeeds only if every recorded step did.
#[derive(Debug)]
pub struct Outcomes {
    command: &'static str,
    failed: Vec<String>,
    total: usize,
}

impl Outcomes {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            failed: Vec::new(),
            total: 0,
        }
    }

    pub fn record(&mut self, step: impl fmt::Display, result: Result<()>) {
        self.total += 1;

        if let Err(e) = result {
            tracing::error!(command = self.command, %step, error = ?e, "step failed");
            println!("{}", format_failure(&step, &e));
            println!();
            self.failed.push(step.to_string());
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Print the summary and turn the recorded outcomes into a result.
    pub fn finish(self) -> Result<()> {
        rule();

        if self.succeeded() {
            println!("✓ {} complete", self.command);
            rule();
            return Ok(());
        }

        println!("✗ {} failed", self.command);
        rule();

        Err(eyre!(
            "{} failed: {} of {} steps failed ({})",
            self.command,
            self.failed.len(),
            self.total,
            self.failed.join(", ")
        ))
    }
}
