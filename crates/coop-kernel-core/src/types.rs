//! Core kernel types
//!
//! This module contains the fundamental types used throughout the kernel.
//! All types here are pure data.

use alloc::string::String;
use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Process identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl Pid {
    /// Whether this is the root process
    pub fn is_root(self) -> bool {
        self == crate::constants::ROOT_PID
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority.
///
/// Meaning is scheduler-defined: a strict rank (lower runs first) for the
/// priority scheduler, a fair-share weight for the fair scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process state as seen from outside the kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Descriptor exists but no live thread yet
    Uninitialized,
    /// Thread exists and is schedulable
    Running,
    /// Thread exists but is parked until a wake tick (or forever)
    Sleeping,
}

/// Snapshot of one process, as returned by `ps()`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessInfo {
    /// Process ID
    pub pid: Pid,
    /// Parent PID (`None` for the root)
    pub parent: Option<Pid>,
    /// Registered process type
    #[serde(rename = "type")]
    pub kind: String,
    /// Explicit priority, `None` when inheriting the scheduler default
    pub priority: Option<Priority>,
    /// Derived lifecycle state
    pub state: ProcessState,
}

/// Direct child description returned by the `children` syscall
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChildInfo {
    /// Child PID
    pub pid: Pid,
    /// Registered process type
    #[serde(rename = "type")]
    pub kind: String,
    /// Arguments the child was created with
    pub args: Value,
    /// Explicit priority, if any
    pub priority: Option<Priority>,
}
