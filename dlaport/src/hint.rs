//! Turns library errors into reports with actionable suggestions.

use color_eyre::Section;
use dlaport_core::error::{ConfigError, Error, StageError, TensorError};
use dlaport_core::types::ArtifactKind;
use eyre::Report;

/// Command (or manual step) producing an artifact of `kind`.
fn producer(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Checkpoint => "download the SenseVoice-Small checkpoint into models/sensevoice-small",
        ArtifactKind::PortableGraph => "dlaport export --format graph",
        ArtifactKind::MobileGraph => "dlaport export --format mobile",
        ArtifactKind::DeviceBinary => "dlaport compile",
        ArtifactKind::ReferenceLogits => "dlaport --mode native capture",
    }
}

/// Wrap a library error, attaching a suggestion where one is known.
pub fn explain(err: Error) -> Report {
    match err {
        Error::Stage(StageError::ModeMismatch { required, .. }) => {
            let suggestion = format!("rerun with `dlaport --mode {required} ...` or set DLAPORT_MODE={required}");
            Report::new(err).suggestion(suggestion)
        }
        Error::Stage(StageError::MissingArtifact { kind, .. }) => {
            let suggestion = producer(kind);
            Report::new(err).suggestion(suggestion)
        }
        Error::Stage(StageError::MissingDependency { name: "Neuron SDK", .. }) => {
            Report::new(err).suggestion("pass `--sdk <DIR>` or set NEURON_SDK_ROOT")
        }
        Error::Stage(StageError::Spawn { ref program, .. }) => {
            let suggestion = format!("check that {:?} is installed and on PATH", program.display());
            Report::new(err).suggestion(suggestion)
        }
        Error::Stage(StageError::ExternalToolFailure { .. }) => {
            Report::new(err).note("stdout and stderr of the tool are included verbatim")
        }
        Error::Stage(StageError::OutputStale { ref path, .. }) => {
            let suggestion = format!("delete {:?} and rerun to confirm the tool writes it", path.display());
            Report::new(err).suggestion(suggestion)
        }
        Error::Config(ConfigError::UnsupportedPlatform { ref supported, .. }) => {
            let suggestion = format!("choose one of: {supported}");
            Report::new(err).suggestion(suggestion)
        }
        Error::Tensor(TensorError::IncompatibleShape { .. }) => {
            Report::new(err).note("both tensors must come from the same model and vocabulary")
        }
        err => Report::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlaport_core::types::{PipelineMode, Stage};
    use std::path::PathBuf;

    #[test]
    fn keeps_library_message() {
        let err = Error::Stage(StageError::ModeMismatch {
            stage: Stage::MobileExport,
            required: PipelineMode::Export,
            actual: PipelineMode::Native,
        });

        let report = explain(err);

        assert_eq!(
            report.to_string(),
            "export_mobile requires export mode, but the pipeline is in native mode"
        );
    }

    #[test]
    fn downcasts_to_library_error() {
        let err = Error::Stage(StageError::MissingArtifact {
            kind: ArtifactKind::MobileGraph,
            path: PathBuf::from("model.tflite"),
        });

        let report = explain(err);

        assert!(matches!(
            report.downcast_ref::<Error>(),
            Some(Error::Stage(StageError::MissingArtifact { .. }))
        ));
    }

    #[test]
    fn every_artifact_has_a_producer() {
        assert_eq!(producer(ArtifactKind::PortableGraph), "dlaport export --format graph");
        assert_eq!(producer(ArtifactKind::ReferenceLogits), "dlaport --mode native capture");
    }
}
