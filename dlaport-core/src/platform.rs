//! NPU device targets and compiler flags.

use crate::error::{ConfigError, Result};
use std::ffi::OsString;
use std::path::Path;

/// Compiler settings for one NPU platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceTarget {
    /// Platform name (e.g. `MT8371`)
    pub platform: &'static str,
    /// Comma-separated accelerator architectures passed to `--arch`
    pub arch: &'static str,
    /// L1 cache size hint in KB
    pub l1_size_kb: u32,
}

impl DeviceTarget {
    /// MediaTek Genio MT8371 (MDLA 5.3 + EDMA 3.6).
    pub const MT8371: Self = Self {
        platform: "MT8371",
        arch: "mdla5.3,edma3.6",
        l1_size_kb: 256,
    };

    pub const SUPPORTED: &'static [Self] = &[Self::MT8371];

    /// Compiler optimization level.
    pub const OPT_LEVEL: &'static str = "-O3";

    /// Look up a platform by name (case-insensitive).
    pub fn from_platform(platform: &str) -> Result<Self> {
        Self::SUPPORTED
            .iter()
            .find(|t| t.platform.eq_ignore_ascii_case(platform))
            .copied()
            .ok_or_else(|| {
                ConfigError::UnsupportedPlatform {
                    platform: platform.to_string(),
                    supported: Self::SUPPORTED
                        .iter()
                        .map(|t| t.platform)
                        .collect::<Vec<_>>()
                        .join(", "),
                }
                .into()
            })
    }

    /// Compiler arguments writing `output_file` (relative to the working directory).
    pub fn compiler_args(&self, output_file: &Path, input: &Path) -> Vec<OsString> {
        vec![
            format!("--arch={}", self.arch).into(),
            Self::OPT_LEVEL.into(),
            "--relax-fp32".into(),
            "--opt-accuracy".into(),
            format!("--l1-size={}", self.l1_size_kb).into(),
            "-d".into(),
            output_file.into(),
            input.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn finds_platform_ignoring_case() {
        assert_eq!(DeviceTarget::from_platform("mt8371").unwrap(), DeviceTarget::MT8371);
    }

    #[test]
    fn rejects_unknown_platform() {
        let err = DeviceTarget::from_platform("MT6989").unwrap_err();

        assert!(matches!(
            err,
            Error::Config(ConfigError::UnsupportedPlatform { ref platform, .. }) if platform == "MT6989"
        ));
    }

    #[test]
    fn builds_compiler_flags() {
        let args = DeviceTarget::MT8371.compiler_args(
            Path::new("sensevoice_MT8371.dla"),
            Path::new("/work/model.tflite"),
        );

        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            [
                "--arch=mdla5.3,edma3.6",
                "-O3",
                "--relax-fp32",
                "--opt-accuracy",
                "--l1-size=256",
                "-d",
                "sensevoice_MT8371.dla",
                "/work/model.tflite",
            ]
        );
    }
}
