//! Process-side syscall contract for Coop OS
//!
//! A process is a resumable computation that talks to the kernel only
//! through the values it yields ([`Step`]) and the values the kernel feeds
//! back on the next resumption ([`Reply`]).
//!
//! ```text
//!   kernel                                   thread
//!     │ resume(Reply::Start)                   │
//!     │───────────────────────────────────────▶│
//!     │◀─────── Step::Syscall(Spawn{..}) ──────│
//!     │ resume(Reply::Pid(7))                  │
//!     │───────────────────────────────────────▶│
//!     │◀─────────────── Step::Yield ───────────│  back to the scheduler
//! ```
//!
//! Process types are registered by name in a [`ProcessRegistry`] that is
//! handed to the kernel at construction.

#![no_std]
extern crate alloc;

pub mod error;
pub mod registry;
pub mod routine;
pub mod syscall;
pub mod thread;

pub use error::{Interrupt, ProcessError, SyscallError};
pub use registry::{Factory, ProcessRegistry};
pub use routine::RoutineThread;
pub use syscall::{Reply, Syscall};
pub use thread::{Step, Thread, ThreadInit};

pub use coop_kernel_core::{ChildInfo, MemoryError, MemoryHandle, Pid, Priority};
