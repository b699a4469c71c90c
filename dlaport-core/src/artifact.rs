//! Artifact locations and on-disk checks.

use crate::types::{ArtifactKind, Warning};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every device binary.
pub const DLA_MAGIC: [u8; 4] = *b"DLAM";

/// A pipeline artifact at a fixed location.
///
/// Nothing about the file is cached: every check goes back to the file system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub expected_magic: Option<[u8; 4]>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            expected_magic: None,
        }
    }

    pub fn with_magic(self, magic: [u8; 4]) -> Self {
        Self {
            expected_magic: Some(magic),
            ..self
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size in bytes.
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Compare the file header against `expected_magic`.
    ///
    /// Returns a [`Warning::Format`] on mismatch and `None` when the header
    /// matches or no magic is expected.
    pub fn check_magic(&self) -> std::io::Result<Option<Warning>> {
        let Some(expected) = self.expected_magic else {
            return Ok(None);
        };

        let mut header = Vec::with_capacity(expected.len());
        File::open(&self.path)?
            .take(expected.len() as u64)
            .read_to_end(&mut header)?;

        if header == expected {
            Ok(None)
        } else {
            Ok(Some(Warning::Format {
                path: self.path.clone(),
                expected,
                found: header,
            }))
        }
    }
}

/// Resolves canonical artifact locations under a project root.
///
/// Individual locations can be overridden with [`ArtifactStore::with_path`].
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    overrides: HashMap<ArtifactKind, PathBuf>,
}

impl ArtifactStore {
    const MODEL_DIR: &'static str = "models/sensevoice-small";
    const PREPARE_DIR: &'static str = "model_prepare";
    const COMPILE_DIR: &'static str = "compile";
    const OUTPUT_DIR: &'static str = "output";
    const AUDIO_DIR: &'static str = "audios";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overrides: HashMap::new(),
        }
    }

    /// Override the location of one artifact kind.
    pub fn with_path(mut self, kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(kind, path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, kind: ArtifactKind, default: PathBuf) -> Artifact {
        let path = self.overrides.get(&kind).cloned().unwrap_or(default);
        Artifact::new(kind, path)
    }

    pub fn checkpoint(&self) -> Artifact {
        self.resolve(ArtifactKind::Checkpoint, self.root.join(Self::MODEL_DIR))
    }

    pub fn portable_graph(&self) -> Artifact {
        self.resolve(
            ArtifactKind::PortableGraph,
            self.prepare_dir().join("model/sensevoice_complete.pt"),
        )
    }

    pub fn mobile_graph(&self) -> Artifact {
        self.resolve(
            ArtifactKind::MobileGraph,
            self.prepare_dir().join("model/sensevoice_complete.tflite"),
        )
    }

    /// Device binary for a platform, e.g. `compile/sensevoice_MT8371.dla`.
    pub fn device_binary(&self, platform: &str) -> Artifact {
        let default = self
            .root
            .join(Self::COMPILE_DIR)
            .join(format!("sensevoice_{platform}.dla"));
        self.resolve(ArtifactKind::DeviceBinary, default)
            .with_magic(DLA_MAGIC)
    }

    pub fn reference_logits(&self) -> Artifact {
        self.resolve(
            ArtifactKind::ReferenceLogits,
            self.output_dir().join("pytorch_logits.npy"),
        )
    }

    /// Logits produced by the converted model on device or in the mobile runtime.
    pub fn converted_logits(&self) -> PathBuf {
        self.output_dir().join("tflite_logits.npy")
    }

    pub fn vocabulary(&self) -> PathBuf {
        self.checkpoint().path.join("tokens.txt")
    }

    pub fn transcript(&self) -> PathBuf {
        self.output_dir().join("transcription.txt")
    }

    pub fn test_audio(&self) -> PathBuf {
        self.root.join(Self::AUDIO_DIR).join("test_en.wav")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(Self::OUTPUT_DIR)
    }

    /// Script exporting the checkpoint to a portable graph.
    pub fn graph_exporter(&self) -> PathBuf {
        self.prepare_dir().join("export_torchscript.py")
    }

    /// Script converting the portable graph to a mobile graph.
    pub fn mobile_converter(&self) -> PathBuf {
        self.prepare_dir().join("pt2tflite.py")
    }

    /// Script running the native model to capture reference logits.
    pub fn reference_runner(&self) -> PathBuf {
        self.prepare_dir().join("capture_reference.py")
    }

    fn prepare_dir(&self) -> PathBuf {
        self.root.join(Self::PREPARE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_canonical_layout() {
        let store = ArtifactStore::new("/work");

        assert_eq!(
            store.mobile_graph().path,
            PathBuf::from("/work/model_prepare/model/sensevoice_complete.tflite")
        );
        assert_eq!(
            store.device_binary("MT8371").path,
            PathBuf::from("/work/compile/sensevoice_MT8371.dla")
        );
        assert_eq!(
            store.vocabulary(),
            PathBuf::from("/work/models/sensevoice-small/tokens.txt")
        );
    }

    #[test]
    fn only_device_binary_expects_magic() {
        let store = ArtifactStore::new("/work");

        assert_eq!(store.device_binary("MT8371").expected_magic, Some(DLA_MAGIC));
        assert_eq!(store.mobile_graph().expected_magic, None);
        assert_eq!(store.portable_graph().expected_magic, None);
    }

    #[test]
    fn overrides_single_location() {
        let store = ArtifactStore::new("/work").with_path(ArtifactKind::MobileGraph, "/tmp/m.tflite");

        assert_eq!(store.mobile_graph().path, PathBuf::from("/tmp/m.tflite"));
        assert_eq!(
            store.portable_graph().path,
            PathBuf::from("/work/model_prepare/model/sensevoice_complete.pt")
        );
    }

    #[test]
    fn existence_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::new(ArtifactKind::PortableGraph, dir.path().join("model.pt"));

        assert!(!artifact.exists());
        std::fs::write(&artifact.path, b"graph").unwrap();
        assert!(artifact.exists());
        assert_eq!(artifact.size().unwrap(), 5);
    }

    #[test]
    fn accepts_matching_magic() {
        let dir = tempfile::tempdir().unwrap();
        let artifact =
            Artifact::new(ArtifactKind::DeviceBinary, dir.path().join("m.dla")).with_magic(DLA_MAGIC);
        std::fs::write(&artifact.path, b"DLAM\x01\x02").unwrap();

        assert_eq!(artifact.check_magic().unwrap(), None);
    }

    #[test]
    fn flags_mismatched_magic() {
        let dir = tempfile::tempdir().unwrap();
        let artifact =
            Artifact::new(ArtifactKind::DeviceBinary, dir.path().join("m.dla")).with_magic(DLA_MAGIC);
        std::fs::write(&artifact.path, b"NEU").unwrap();

        let warning = artifact.check_magic().unwrap();

        assert_eq!(
            warning,
            Some(Warning::Format {
                path: artifact.path.clone(),
                expected: DLA_MAGIC,
                found: b"NEU".to_vec(),
            })
        );
    }
}
