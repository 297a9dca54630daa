//! Coop OS Kernel
//!
//! A single-threaded, cooperative process-scheduling kernel. Each host
//! invocation grants a small CPU budget; [`Kernel::run`] services as many
//! processes as fit, in the order a pluggable [`Scheduler`] chooses, and
//! commits the process table so it survives a full host restart.
//!
//! This crate provides:
//! - Process lifecycle (create, sleep, kill with cascade, reboot, reset)
//! - Syscall dispatch for `coop-process` threads
//! - Priority and fair-share scheduling disciplines
//! - Error containment per process, with an injected [`KernelObserver`]

#![no_std]
extern crate alloc;

pub mod config;
pub mod error;
pub mod kernel;
pub mod observer;
pub mod scheduler;
pub mod syslog;

pub use config::KernelConfig;
pub use error::KernelError;
pub use kernel::Kernel;
pub use observer::{KernelObserver, NullObserver};
pub use scheduler::{
    run_pass, FairScheduler, Outcome, PriorityScheduler, Quota, Scheduler,
};
pub use syslog::{EventId, SysEvent, SysEventKind, SysLog};

// Re-export the types a host needs to drive the kernel
pub use coop_hal::{Host, HostError};
pub use coop_kernel_core::{
    InvariantViolation, MemoryHandle, Pid, Priority, ProcessInfo, ProcessState, ProcessTable,
    TableError, ROOT_PID,
};
pub use coop_process::{
    Interrupt, ProcessError, ProcessRegistry, Reply, Step, Syscall, SyscallError, Thread,
    ThreadInit,
};
