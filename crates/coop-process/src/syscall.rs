//! Syscalls a thread can yield and the replies the kernel feeds back
//!
//! Every syscall except `Sleep`/`Hibernate` is resolved synchronously
//! within the same resumption: the kernel handles it and immediately
//! resumes the thread with the matching [`Reply`].

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use coop_kernel_core::{ChildInfo, MemoryHandle, Pid, Priority};
use serde_json::Value;

use crate::error::SyscallError;

/// A request from a thread to the kernel
#[derive(Clone, Debug, PartialEq)]
pub enum Syscall {
    /// Park for at least this many ticks (0 behaves like 1)
    Sleep(u64),
    /// Park until killed
    Hibernate,
    /// Create a child; replies `Pid`
    Spawn {
        /// Registered type name
        kind: String,
        /// Requested priority, clamped by the scheduler
        priority: Option<Priority>,
        /// Construction arguments
        args: Value,
    },
    /// Kill a direct child and its descendants; replies `Unit`
    Kill(Pid),
    /// Bind a heap slot of the caller's memory; replies `Handle`
    Allocate {
        /// Slot name
        key: String,
        /// Initial value when the slot is new
        default: Value,
    },
    /// Snapshot of direct children; replies `Children`
    Children,
    /// Re-prioritize the caller; replies `Priority` with the clamped value
    RequestPriority(Priority),
}

impl Syscall {
    /// `Spawn` with the scheduler's default priority
    pub fn spawn(kind: &str, args: Value) -> Self {
        Syscall::Spawn {
            kind: kind.to_string(),
            priority: None,
            args,
        }
    }

    /// `Spawn` with an explicit priority
    pub fn spawn_with_priority(kind: &str, priority: Priority, args: Value) -> Self {
        Syscall::Spawn {
            kind: kind.to_string(),
            priority: Some(priority),
            args,
        }
    }

    /// `Allocate` a heap slot
    pub fn allocate(key: &str, default: Value) -> Self {
        Syscall::Allocate {
            key: key.to_string(),
            default,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Syscall::Sleep(_) => "sleep",
            Syscall::Hibernate => "hibernate",
            Syscall::Spawn { .. } => "spawn",
            Syscall::Kill(_) => "kill",
            Syscall::Allocate { .. } => "allocate",
            Syscall::Children => "children",
            Syscall::RequestPriority(_) => "request_priority",
        }
    }
}

/// Value fed back into a thread on resumption
#[derive(Clone, Debug)]
pub enum Reply {
    /// First resumption after (re)initialization
    Start,
    /// Resumed after a bare yield or a sleep
    Resumed,
    /// Syscall completed with no value
    Unit,
    /// PID of a spawned child
    Pid(Pid),
    /// Memory slot handle
    Handle(MemoryHandle),
    /// Direct children of the caller
    Children(BTreeMap<Pid, ChildInfo>),
    /// Effective (clamped) priority
    Priority(Priority),
    /// Syscall refused
    Denied(SyscallError),
}

impl Reply {
    /// Short name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Reply::Start => "start",
            Reply::Resumed => "resumed",
            Reply::Unit => "unit",
            Reply::Pid(_) => "pid",
            Reply::Handle(_) => "handle",
            Reply::Children(_) => "children",
            Reply::Priority(_) => "priority",
            Reply::Denied(_) => "denied",
        }
    }

    /// Expect the reply to `Spawn`
    pub fn into_pid(self) -> Result<Pid, SyscallError> {
        match self {
            Reply::Pid(pid) => Ok(pid),
            other => Err(other.into_error()),
        }
    }

    /// Expect the reply to `Allocate`
    pub fn into_handle(self) -> Result<MemoryHandle, SyscallError> {
        match self {
            Reply::Handle(handle) => Ok(handle),
            other => Err(other.into_error()),
        }
    }

    /// Expect the reply to `Children`
    pub fn into_children(self) -> Result<BTreeMap<Pid, ChildInfo>, SyscallError> {
        match self {
            Reply::Children(children) => Ok(children),
            other => Err(other.into_error()),
        }
    }

    /// Expect the reply to `RequestPriority`
    pub fn into_priority(self) -> Result<Priority, SyscallError> {
        match self {
            Reply::Priority(priority) => Ok(priority),
            other => Err(other.into_error()),
        }
    }

    /// Expect the reply to `Kill`
    pub fn into_unit(self) -> Result<(), SyscallError> {
        match self {
            Reply::Unit => Ok(()),
            other => Err(other.into_error()),
        }
    }

    fn into_error(self) -> SyscallError {
        match self {
            Reply::Denied(e) => e,
            other => SyscallError::UnexpectedReply(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spawn_constructors() {
        assert_eq!(
            Syscall::spawn("worker", json!(1)),
            Syscall::Spawn {
                kind: "worker".to_string(),
                priority: None,
                args: json!(1),
            }
        );
        let with = Syscall::spawn_with_priority("worker", Priority(3), Value::Null);
        assert!(matches!(with, Syscall::Spawn { priority: Some(Priority(3)), .. }));
        assert_eq!(with.name(), "spawn");
    }

    #[test]
    fn test_reply_accessors() {
        assert_eq!(Reply::Pid(Pid(3)).into_pid(), Ok(Pid(3)));
        assert_eq!(
            Reply::Denied(SyscallError::PidsExhausted).into_pid(),
            Err(SyscallError::PidsExhausted)
        );
        assert_eq!(
            Reply::Unit.into_pid(),
            Err(SyscallError::UnexpectedReply("unit"))
        );
        assert_eq!(Reply::Unit.into_unit(), Ok(()));
    }
}
