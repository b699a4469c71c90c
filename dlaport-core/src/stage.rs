//! Staged conversion pipeline with mode-gated preconditions.
//!
//! Each stage runs the same sequence:
//!
//! 1. check the pipeline mode, before anything touches the file system;
//! 2. check that the upstream artifact exists;
//! 3. build the tool invocation (the device compile additionally needs the SDK);
//! 4. run the tool, where any non-zero exit fails the stage;
//! 5. verify that the produced artifact exists, was written by this run and is
//!    non-empty, and for the device binary also check its magic bytes.
//!
//! A magic mismatch is reported as a [`Warning`] on the [`StageReport`], not as
//! an error.

use crate::artifact::{Artifact, ArtifactStore};
use crate::error::{Result, StageError};
use crate::invoker::{ToolInvocation, ToolOutput, prepend_search_path};
use crate::platform::DeviceTarget;
use crate::prompt::PromptSpec;
use crate::traits::ToolInvoker;
use crate::types::{PipelineMode, Precision, Stage, Warning};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Progress of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing run yet (native mode)
    Idle,
    /// Nothing run yet, conversion stages allowed
    ExportReady,
    GraphExported,
    MobileExported,
    DeviceCompiled,
    /// Reference logits captured from the native model
    NativeCaptured,
}

/// Summary of a successful stage.
#[derive(Clone, Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub artifact: PathBuf,
    /// Artifact size in bytes
    pub size: u64,
    /// Captured tool stdout
    pub stdout: String,
    pub warnings: Vec<Warning>,
}

/// Conversion pipeline driving external tools through the stage gate.
pub struct Pipeline<I> {
    mode: PipelineMode,
    store: ArtifactStore,
    invoker: I,
    python: PathBuf,
    state: PipelineState,
}

impl<I: ToolInvoker> Pipeline<I> {
    /// Default interpreter for the converter scripts.
    pub const DEFAULT_PYTHON: &'static str = "python3";

    /// Compiler binary under `<sdk>/host/bin`.
    pub const COMPILER: &'static str = "ncc-tflite";

    pub fn new(mode: PipelineMode, store: ArtifactStore, invoker: I) -> Self {
        let state = match mode {
            PipelineMode::Export => PipelineState::ExportReady,
            PipelineMode::Native => PipelineState::Idle,
        };

        Self {
            mode,
            store,
            invoker,
            python: PathBuf::from(Self::DEFAULT_PYTHON),
            state,
        }
    }

    /// Use a different interpreter for the converter scripts.
    pub fn with_python(self, python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            ..self
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Export the checkpoint to a portable graph, conditioned on `prompt`.
    pub fn export_graph(&mut self, prompt: PromptSpec) -> Result<StageReport> {
        let stage = Stage::GraphExport;
        self.require_mode(stage)?;

        let checkpoint = self.store.checkpoint();
        require_artifact(&checkpoint)?;

        let output = self.store.portable_graph();
        create_parent_dir(&output.path)?;

        let invocation = ToolInvocation::new(&self.python)
            .arg(self.store.graph_exporter())
            .arg("--model")
            .arg(&checkpoint.path)
            .arg("--output")
            .arg(&output.path)
            .arg("--prompt")
            .arg(prompt.to_string());

        tracing::info!(%stage, prompt = %prompt, "exporting portable graph");

        let before = modified_time(&output.path);
        let tool_output = self.run_tool(stage, &invocation)?;
        let report = verify_output(stage, &output, before, tool_output)?;

        self.state = PipelineState::GraphExported;
        Ok(report)
    }

    /// Convert the portable graph to a mobile graph.
    pub fn export_mobile(&mut self, precision: Precision) -> Result<StageReport> {
        let stage = Stage::MobileExport;
        self.require_mode(stage)?;

        let graph = self.store.portable_graph();
        require_artifact(&graph)?;

        let output = self.store.mobile_graph();
        create_parent_dir(&output.path)?;

        let invocation = ToolInvocation::new(&self.python)
            .arg(self.store.mobile_converter())
            .arg("-i")
            .arg(&graph.path)
            .arg("-o")
            .arg(&output.path)
            .arg("--float")
            .arg(precision.float_flag());

        tracing::info!(%stage, ?precision, "converting to mobile graph");

        let before = modified_time(&output.path);
        let tool_output = self.run_tool(stage, &invocation)?;
        let report = verify_output(stage, &output, before, tool_output)?;

        self.state = PipelineState::MobileExported;
        Ok(report)
    }

    /// Compile the mobile graph into a device binary for `target`.
    ///
    /// The SDK root is only checked after the mobile graph is known to exist.
    pub fn compile_device(&mut self, target: &DeviceTarget, sdk_root: &Path) -> Result<StageReport> {
        let stage = Stage::DeviceCompile;
        self.require_mode(stage)?;

        let mobile = self.store.mobile_graph();
        require_artifact(&mobile)?;

        if !sdk_root.exists() {
            return Err(StageError::MissingDependency {
                name: "Neuron SDK",
                path: sdk_root.to_path_buf(),
            }
            .into());
        }

        let output = self.store.device_binary(target.platform);
        let output_dir = match output.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&output_dir).map_err(StageError::from)?;

        let output_file = output.path.file_name().map(Path::new).unwrap_or(output.path.as_path());
        let input = std::path::absolute(&mobile.path).map_err(StageError::from)?;

        let sdk_bin = sdk_root.join("host/bin");
        let sdk_lib = sdk_root.join("host/lib");

        let invocation = ToolInvocation::new(sdk_bin.join(Self::COMPILER))
            .args(target.compiler_args(output_file, &input))
            .env("PATH", prepend_search_path("PATH", &sdk_bin).map_err(StageError::from)?)
            .env(
                "LD_LIBRARY_PATH",
                prepend_search_path("LD_LIBRARY_PATH", &sdk_lib).map_err(StageError::from)?,
            )
            .current_dir(&output_dir);

        tracing::info!(
            %stage,
            platform = target.platform,
            arch = target.arch,
            l1_size_kb = target.l1_size_kb,
            "compiling device binary"
        );

        let before = modified_time(&output.path);
        let tool_output = self.run_tool(stage, &invocation)?;
        let report = verify_output(stage, &output, before, tool_output)?;

        self.state = PipelineState::DeviceCompiled;
        Ok(report)
    }

    /// Run the native model on `audio` and save full-precision reference logits.
    pub fn capture_reference(&mut self, audio: &Path) -> Result<StageReport> {
        let stage = Stage::ReferenceCapture;
        self.require_mode(stage)?;

        let checkpoint = self.store.checkpoint();
        require_artifact(&checkpoint)?;

        if !audio.exists() {
            return Err(StageError::MissingDependency {
                name: "test audio",
                path: audio.to_path_buf(),
            }
            .into());
        }

        let output = self.store.reference_logits();
        create_parent_dir(&output.path)?;

        let invocation = ToolInvocation::new(&self.python)
            .arg(self.store.reference_runner())
            .arg("--model")
            .arg(&checkpoint.path)
            .arg("--audio")
            .arg(audio)
            .arg("--output")
            .arg(&output.path);

        tracing::info!(%stage, audio = ?audio.display(), "capturing reference logits");

        let before = modified_time(&output.path);
        let tool_output = self.run_tool(stage, &invocation)?;
        let report = verify_output(stage, &output, before, tool_output)?;

        self.state = PipelineState::NativeCaptured;
        Ok(report)
    }

    fn require_mode(&self, stage: Stage) -> Result<()> {
        let required = stage.required_mode();

        if self.mode != required {
            tracing::error!(%stage, %required, actual = %self.mode, "mode mismatch");
            return Err(StageError::ModeMismatch {
                stage,
                required,
                actual: self.mode,
            }
            .into());
        }

        Ok(())
    }

    fn run_tool(&self, stage: Stage, invocation: &ToolInvocation) -> Result<ToolOutput> {
        tracing::debug!(%stage, command = %invocation.command_line(), "invoking tool");

        let output = self
            .invoker
            .invoke(invocation)
            .map_err(|source| StageError::Spawn {
                stage,
                program: invocation.program.clone(),
                source,
            })?;

        if !output.success() {
            tracing::error!(%stage, code = ?output.code, "tool failed");
            return Err(StageError::ExternalToolFailure {
                stage,
                program: invocation.program.clone(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            }
            .into());
        }

        Ok(output)
    }
}

fn require_artifact(artifact: &Artifact) -> Result<()> {
    if !artifact.exists() {
        tracing::error!(kind = %artifact.kind, path = ?artifact.path.display(), "missing artifact");
        return Err(StageError::MissingArtifact {
            kind: artifact.kind,
            path: artifact.path.clone(),
        }
        .into());
    }

    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StageError::from)?;
    }
    Ok(())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// `before` is the artifact's modification time prior to running the tool.
fn verify_output(
    stage: Stage,
    artifact: &Artifact,
    before: Option<SystemTime>,
    tool_output: ToolOutput,
) -> Result<StageReport> {
    if !artifact.exists() {
        return Err(StageError::OutputMissing {
            stage,
            kind: artifact.kind,
            path: artifact.path.clone(),
        }
        .into());
    }

    if before.is_some() && modified_time(&artifact.path) == before {
        tracing::error!(%stage, path = ?artifact.path.display(), "output was not rewritten");
        return Err(StageError::OutputStale {
            stage,
            kind: artifact.kind,
            path: artifact.path.clone(),
        }
        .into());
    }

    let size = artifact.size().map_err(StageError::from)?;

    if size == 0 {
        return Err(StageError::OutputEmpty {
            stage,
            kind: artifact.kind,
            path: artifact.path.clone(),
        }
        .into());
    }

    let warnings: Vec<Warning> = artifact
        .check_magic()
        .map_err(StageError::from)?
        .into_iter()
        .collect();

    for warning in &warnings {
        tracing::warn!(%stage, %warning, "artifact format check failed");
    }

    tracing::info!(%stage, path = ?artifact.path.display(), size, "stage completed");

    Ok(StageReport {
        stage,
        artifact: artifact.path.clone(),
        size,
        stdout: tool_output.stdout,
        warnings,
    })
}
