//! Centralized constants for the process table
//!
//! Reserved PIDs and table limits are defined here to avoid scatter and
//! enable easy audit.

use crate::types::Pid;

/// The root ("init") process. Always present, never killable.
pub const ROOT_PID: Pid = Pid(0);

/// PIDs are allocated from `1..DEFAULT_PID_CEILING` and wrap around.
pub const DEFAULT_PID_CEILING: u32 = 50_000;

/// Registered type name of the root process unless configured otherwise
pub const DEFAULT_ROOT_TYPE: &str = "init";

/// Smallest usable ceiling: the root plus one allocatable PID
pub const MIN_PID_CEILING: u32 = 2;
