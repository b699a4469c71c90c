//! Error types for dlaport-core organized by pipeline stage.

use crate::types::{ArtifactKind, PipelineMode, Stage};
use ndarray::ShapeError;
use ndarray_npy::ReadNpyError;
use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Conversion stage error
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Tensor loading or comparison error
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// Transcript decoding error
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Configuration errors (platform selection, etc.).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Platform has no entry in the device target table
    #[error("unsupported platform: {platform} (supported: {supported})")]
    UnsupportedPlatform { platform: String, supported: String },
}

/// Conversion stage errors raised by the stage gate.
#[derive(Debug, Error)]
pub enum StageError {
    /// Stage invoked under the wrong pipeline mode
    #[error("{stage} requires {required} mode, but the pipeline is in {actual} mode")]
    ModeMismatch {
        stage: Stage,
        required: PipelineMode,
        actual: PipelineMode,
    },

    /// Required upstream artifact is absent
    #[error("{kind} not found: {path:?}")]
    MissingArtifact { kind: ArtifactKind, path: PathBuf },

    /// SDK, tool or input file is absent
    #[error("{name} not found: {path:?}")]
    MissingDependency { name: &'static str, path: PathBuf },

    /// External process could not be started
    #[error("failed to launch {program:?} for {stage}")]
    Spawn {
        stage: Stage,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External process exited unsuccessfully
    #[error(
        "{stage} failed: {program:?} exited with {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}",
        describe_exit(.code)
    )]
    ExternalToolFailure {
        stage: Stage,
        program: PathBuf,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Tool succeeded but the expected artifact is absent
    #[error("{stage} did not produce {kind}: {path:?}")]
    OutputMissing {
        stage: Stage,
        kind: ArtifactKind,
        path: PathBuf,
    },

    /// Tool succeeded but left an earlier artifact untouched
    #[error("{stage} did not rewrite {kind}, {path:?} is left over from an earlier run")]
    OutputStale {
        stage: Stage,
        kind: ArtifactKind,
        path: PathBuf,
    },

    /// Tool succeeded but the produced artifact is empty
    #[error("{stage} produced an empty {kind}: {path:?}")]
    OutputEmpty {
        stage: Stage,
        kind: ArtifactKind,
        path: PathBuf,
    },

    /// Search path could not be assembled for the tool environment
    #[error(transparent)]
    SearchPath(#[from] std::env::JoinPathsError),

    /// IO error while preparing or verifying artifacts
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Tensor loading and comparison errors.
#[derive(Debug, Error)]
pub enum TensorError {
    /// Tensor file is absent
    #[error("tensor file not found: {0:?}")]
    NotFound(PathBuf),

    /// Tensor file could not be parsed as a float32 or float64 `.npy` array
    #[error("failed to read tensor {path:?} (expected a float32 or float64 .npy array): {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ReadNpyError,
    },

    /// Tensor has a shape the operation cannot use
    #[error("invalid tensor shape {shape:?}: expected {expected}")]
    InvalidShape {
        shape: Vec<usize>,
        expected: &'static str,
    },

    /// Batch or vocabulary axes disagree between the two tensors
    #[error("incompatible tensor shapes: reference {reference:?}, converted {converted:?}")]
    IncompatibleShape {
        reference: Vec<usize>,
        converted: Vec<usize>,
    },

    /// Scores of a frame contain NaN, so no token can be picked
    #[error("scores at frame {frame} cannot be ordered (NaN)")]
    UnorderedScores { frame: usize },

    /// Nothing left to compare after alignment
    #[error("no elements to compare (aligned shape {0:?})")]
    Empty(Vec<usize>),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// ndarray-stats argmax error
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Transcript decoding errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Logits file is absent
    #[error("logits file not found: {0:?}")]
    MissingLogits(PathBuf),

    /// Vocabulary file is absent
    #[error("vocabulary file not found: {0:?}")]
    MissingVocabulary(PathBuf),

    /// IO error while reading the vocabulary or writing the transcript
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for dlaport-core operations.
pub type Result<T> = std::result::Result<T, Error>;

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

// Nested From implementations for automatic error conversion chains

// ShapeError → TensorError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Tensor(TensorError::Shape(e))
    }
}

// MinMaxError → TensorError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Tensor(TensorError::MinMax(e))
    }
}
