//! Structured lifecycle callbacks
//!
//! The observer is the kernel's only structured output. Hosts plug in a
//! logger or a console renderer here; every event is also written to the
//! host debug sink and recorded in the syslog.

use coop_kernel_core::ProcessInfo;
use coop_process::ProcessError;

/// Receives kernel and process lifecycle events
pub trait KernelObserver {
    /// An internal invariant was violated and the kernel repaired it
    fn on_kernel_error(&mut self, _message: &str) {}

    /// A process ended itself in an orderly way
    fn on_process_exit(&mut self, _info: &ProcessInfo, _reason: &str) {}

    /// A process failed and was killed
    fn on_process_error(&mut self, _info: &ProcessInfo, _error: &ProcessError) {}
}

/// Observer that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl KernelObserver for NullObserver {}
