//! dlaport-core: staged SenseVoice conversion for NPU deployment.
//!
//! The crate has two halves that share only the file system:
//!
//! - a **stage gate** ([`stage::Pipeline`]) that runs the external exporters
//!   and the vendor compiler in order, checking the pipeline mode and every
//!   upstream artifact before a tool is launched;
//! - **validation** of the converted model: [`compare`] measures how far the
//!   converted logits drift from a full-precision reference, and [`ctc`] turns
//!   logits into text with greedy CTC decoding.
//!
//! # Architecture
//!
//! External tools are reached through [`traits::ToolInvoker`], so the stage
//! gate can be driven by [`invoker::ProcessInvoker`] in production and by a
//! canned fake in tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use dlaport_core::artifact::ArtifactStore;
//! use dlaport_core::invoker::ProcessInvoker;
//! use dlaport_core::platform::DeviceTarget;
//! use dlaport_core::prompt::PromptSpec;
//! use dlaport_core::stage::Pipeline;
//! use dlaport_core::types::{PipelineMode, Precision};
//!
//! let store = ArtifactStore::new(".");
//! let mut pipeline = Pipeline::new(PipelineMode::Export, store, ProcessInvoker);
//!
//! pipeline.export_graph(PromptSpec::encode("en", "HAPPY", "Speech", "woitn"))?;
//! pipeline.export_mobile(Precision::Float32)?;
//! pipeline.compile_device(&DeviceTarget::MT8371, "/opt/neuropilot/neuron_sdk".as_ref())?;
//!
//! let comparison = dlaport_core::compare::compare_files(
//!     "output/pytorch_logits.npy",
//!     "output/tflite_logits.npy",
//! )?;
//! println!("token accuracy: {:.2}%", comparison.result.token_accuracy_pct);
//! ```

pub mod artifact;
pub mod compare;
pub mod ctc;
pub mod error;
pub mod invoker;
pub mod platform;
pub mod prompt;
pub mod stage;
pub mod tensor;
pub mod traits;
pub mod types;
pub mod vocab;
