//! Coop OS Kernel Core - Process Table and Persistent Memory
//!
//! This crate contains the **pure, host-free** data layer of the kernel:
//! everything that must survive a full restart of the host lives here.
//!
//! # Design Principles
//!
//! 1. **No host dependency**: clocks, quotas and storage live in `coop-hal`
//! 2. **No threads**: descriptors are plain data; live computations are
//!    owned by `coop-kernel`
//! 3. **Stable layout**: the persisted image round-trips through JSON
//!    unchanged across restarts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    coop-kernel-core                         │
//! │                                                             │
//! │   ┌───────────────┐    ┌───────────────┐                   │
//! │   │ ProcessTable  │    │ ProcessMemory │                   │
//! │   │ - descriptors │───▶│ - args        │◀── MemoryHandle   │
//! │   │ - next_pid    │    │ - heap        │                   │
//! │   └───────────────┘    └───────────────┘                   │
//! │           │                                                 │
//! │           ▼                                                 │
//! │   ┌───────────────┐                                         │
//! │   │  Invariants   │                                         │
//! │   └───────────────┘                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ used by
//!                              ▼
//!                         coop-kernel
//! ```
//!
//! # Module Organization
//!
//! - `constants` - Reserved PIDs, PID ceiling, default root type
//! - `types` - `Pid`, `Priority`, `ProcessState`, `ProcessInfo`, `ChildInfo`
//! - `memory` - Per-process persisted memory and `MemoryHandle`
//! - `table` - `ProcessTable`: descriptors, PID allocation, persisted image
//! - `invariants` - Runtime-checkable table invariants

#![no_std]
extern crate alloc;

pub mod constants;
pub mod invariants;
pub mod memory;
pub mod table;
pub mod types;

// Re-export all public types for convenient access
pub use constants::{DEFAULT_PID_CEILING, DEFAULT_ROOT_TYPE, ROOT_PID};
pub use invariants::{check_all_invariants, InvariantViolation};
pub use memory::{MemoryError, MemoryHandle, ProcessMemory, SharedMemory};
pub use table::{Descriptor, ProcessTable, TableError};
pub use types::{ChildInfo, Pid, Priority, ProcessInfo, ProcessState};

pub use serde_json::{Map, Value};
