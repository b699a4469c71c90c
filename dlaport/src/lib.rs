//! dlaport: command-line front end for the SenseVoice NPU conversion pipeline.

pub mod capture;
pub mod cli;
pub mod compile;
pub mod config;
pub mod export;
pub mod hint;
pub mod report;
pub mod validate;
