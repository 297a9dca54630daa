//! How syscalls fail and how threads end abnormally

use alloc::string::{String, ToString};
use core::fmt;

use coop_kernel_core::{MemoryError, Pid};

/// Kernel refusal of a syscall, delivered as `Reply::Denied`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyscallError {
    /// `spawn` named a type missing from the registry
    UnknownProcessType(String),
    /// `kill` target is not a direct child of the caller
    NotChild(Pid),
    /// Target process does not exist
    NoSuchProcess(Pid),
    /// No free PID
    PidsExhausted,
    /// Operation is never allowed (e.g. killing the root)
    Forbidden,
    /// The kernel answered with a different reply than the caller expected
    UnexpectedReply(&'static str),
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyscallError::UnknownProcessType(kind) => write!(f, "unknown process type {}", kind),
            SyscallError::NotChild(pid) => write!(f, "process {} is not a child", pid),
            SyscallError::NoSuchProcess(pid) => write!(f, "no such process {}", pid),
            SyscallError::PidsExhausted => write!(f, "no free pid"),
            SyscallError::Forbidden => write!(f, "operation not permitted"),
            SyscallError::UnexpectedReply(got) => write!(f, "unexpected reply {}", got),
        }
    }
}

/// Uncaught failure inside a thread
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessError {
    message: String,
}

impl ProcessError {
    /// Create an error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Abnormal end of a resumption.
///
/// `Exit` is an orderly self-termination and is not reported as an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// Terminate with a human-readable reason
    Exit(String),
    /// Uncaught error; the kernel kills the process and reports it
    Fault(ProcessError),
}

impl Interrupt {
    /// Orderly exit with `reason`
    pub fn exit(reason: impl Into<String>) -> Self {
        Interrupt::Exit(reason.into())
    }

    /// Fault with `message`
    pub fn fault(message: impl Into<String>) -> Self {
        Interrupt::Fault(ProcessError::new(message))
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Exit(reason) => write!(f, "exit: {}", reason),
            Interrupt::Fault(e) => write!(f, "fault: {}", e),
        }
    }
}

impl From<ProcessError> for Interrupt {
    fn from(e: ProcessError) -> Self {
        Interrupt::Fault(e)
    }
}

impl From<SyscallError> for Interrupt {
    fn from(e: SyscallError) -> Self {
        Interrupt::Fault(ProcessError::new(e.to_string()))
    }
}

impl From<MemoryError> for Interrupt {
    fn from(e: MemoryError) -> Self {
        Interrupt::Fault(ProcessError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_error_becomes_fault() {
        let interrupt: Interrupt = SyscallError::NotChild(Pid(4)).into();
        assert_eq!(interrupt, Interrupt::fault("process 4 is not a child"));
    }

    #[test]
    fn test_memory_error_becomes_fault() {
        let interrupt: Interrupt = MemoryError::Decode("bad".into()).into();
        match interrupt {
            Interrupt::Fault(e) => assert!(e.message().contains("bad")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
