//! Core traits for pipeline components.

use crate::invoker::{ToolInvocation, ToolOutput};

/// Runs external converter and compiler tools.
///
/// The stage gate only sees this interface, so its control flow can be
/// exercised with a fake that returns canned output without spawning anything.
pub trait ToolInvoker {
    /// Run the invocation to completion and capture its output.
    ///
    /// An `Err` means the process could not be started at all; a process that
    /// ran and failed is reported through [`ToolOutput::code`].
    fn invoke(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput>;
}

impl<T: ToolInvoker + ?Sized> ToolInvoker for &T {
    fn invoke(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput> {
        (**self).invoke(invocation)
    }
}
