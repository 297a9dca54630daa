//! The resumable computation bound to a process

use serde_json::Value;

use coop_kernel_core::Pid;

use crate::error::Interrupt;
use crate::syscall::{Reply, Syscall};

/// What a thread hands back to the kernel after one resumption
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Productive work done; return control to the scheduler
    Yield,
    /// Ask the kernel for something
    Syscall(Syscall),
    /// Finished; the kernel removes the process as if it killed itself
    Done,
}

impl From<Syscall> for Step {
    fn from(syscall: Syscall) -> Self {
        Step::Syscall(syscall)
    }
}

/// A live process computation.
///
/// Threads are never persisted. The kernel rebuilds them from the
/// descriptor's type and memory on construction and on reboot, so any state
/// that must survive belongs in a memory handle obtained via `Allocate`.
pub trait Thread {
    /// Advance until the next yield point
    fn resume(&mut self, reply: Reply) -> Result<Step, Interrupt>;
}

impl<F> Thread for F
where
    F: FnMut(Reply) -> Result<Step, Interrupt>,
{
    fn resume(&mut self, reply: Reply) -> Result<Step, Interrupt> {
        self(reply)
    }
}

/// What a factory sees when the kernel (re)initializes a thread
#[derive(Clone, Copy, Debug)]
pub struct ThreadInit<'a> {
    /// PID of the process
    pub pid: Pid,
    /// Parent PID (`None` for the root)
    pub parent: Option<Pid>,
    /// Registered type name
    pub kind: &'a str,
    /// Construction arguments
    pub args: &'a Value,
}
