//! Core types for dlaport-core

use std::fmt;
use std::path::PathBuf;

/// Pipeline mode selected once before a run.
///
/// Conversion stages need the model built for export; capturing a
/// full-precision reference output needs the native model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineMode {
    /// Model prepared for graph export and conversion
    #[default]
    Export,
    /// Model running natively for reference output capture
    Native,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineMode::Export => f.write_str("export"),
            PipelineMode::Native => f.write_str("native"),
        }
    }
}

/// Pipeline stages driven by the stage gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Checkpoint → portable graph
    GraphExport,
    /// Portable graph → mobile graph
    MobileExport,
    /// Mobile graph → device binary
    DeviceCompile,
    /// Checkpoint + audio → reference logits
    ReferenceCapture,
}

impl Stage {
    /// Mode the pipeline must be in for this stage to run.
    pub fn required_mode(self) -> PipelineMode {
        match self {
            Stage::GraphExport | Stage::MobileExport | Stage::DeviceCompile => PipelineMode::Export,
            Stage::ReferenceCapture => PipelineMode::Native,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::GraphExport => "export_graph",
            Stage::MobileExport => "export_mobile",
            Stage::DeviceCompile => "compile_device",
            Stage::ReferenceCapture => "capture_reference",
        };
        f.write_str(name)
    }
}

/// Kinds of on-disk artifacts exchanged between stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Trainable model checkpoint directory
    Checkpoint,
    /// Portable graph (`.pt`)
    PortableGraph,
    /// Mobile inference graph (`.tflite`)
    MobileGraph,
    /// Vendor NPU binary (`.dla`)
    DeviceBinary,
    /// Full-precision reference logits (`.npy`)
    ReferenceLogits,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Checkpoint => "checkpoint",
            ArtifactKind::PortableGraph => "portable graph",
            ArtifactKind::MobileGraph => "mobile graph",
            ArtifactKind::DeviceBinary => "device binary",
            ArtifactKind::ReferenceLogits => "reference logits",
        };
        f.write_str(name)
    }
}

/// Numeric precision of the exported mobile graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precision {
    #[default]
    Float32,
    Int8,
}

impl Precision {
    /// Value passed to the mobile converter's `--float` flag.
    pub fn float_flag(self) -> &'static str {
        match self {
            Precision::Float32 => "1",
            Precision::Int8 => "0",
        }
    }
}

/// Non-fatal anomaly reported alongside a successful result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// Frame counts differed; both tensors were truncated to `compared` frames
    ShapeMismatch {
        reference_frames: usize,
        converted_frames: usize,
        compared: usize,
    },
    /// Positions whose scores contain NaN; each counts as a token mismatch
    UnorderedScores { positions: usize },
    /// Artifact header does not carry the expected magic bytes
    Format {
        path: PathBuf,
        expected: [u8; 4],
        found: Vec<u8>,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ShapeMismatch {
                reference_frames,
                converted_frames,
                compared,
            } => write!(
                f,
                "frame count mismatch (reference {reference_frames}, converted {converted_frames}), compared first {compared} frames"
            ),
            Warning::UnorderedScores { positions } => write!(
                f,
                "{positions} positions have NaN scores and count as token mismatches"
            ),
            Warning::Format {
                path,
                expected,
                found,
            } => write!(
                f,
                "unexpected header in {:?}: expected {}, found {}",
                path.display(),
                hex(expected),
                hex(found)
            ),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_stages_require_export_mode() {
        assert_eq!(Stage::GraphExport.required_mode(), PipelineMode::Export);
        assert_eq!(Stage::MobileExport.required_mode(), PipelineMode::Export);
        assert_eq!(Stage::DeviceCompile.required_mode(), PipelineMode::Export);
        assert_eq!(Stage::ReferenceCapture.required_mode(), PipelineMode::Native);
    }

    #[test]
    fn formats_header_as_hex() {
        let warning = Warning::Format {
            path: PathBuf::from("model.dla"),
            expected: *b"DLAM",
            found: vec![0x7f, 0x45, 0x4c, 0x46],
        };

        let msg = warning.to_string();

        assert!(msg.contains("expected 444c414d"));
        assert!(msg.contains("found 7f454c46"));
    }
}
