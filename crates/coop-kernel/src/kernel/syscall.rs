//! Syscall dispatch
//!
//! Everything except `Sleep`/`Hibernate` (handled by the run loop) is
//! resolved here, synchronously, within the caller's resumption.

use alloc::format;

use coop_hal::Host;
use coop_kernel_core::{MemoryHandle, Pid, Priority, TableError};
use coop_process::{Reply, Syscall, SyscallError};
use serde_json::Value;

use super::Kernel;
use crate::error::KernelError;
use crate::scheduler::Scheduler;

impl<H: Host, S: Scheduler> Kernel<H, S> {
    /// Handle one syscall from `pid` and produce its reply
    pub(super) fn dispatch(&mut self, pid: Pid, call: Syscall) -> Reply {
        match call {
            Syscall::Spawn {
                kind,
                priority,
                args,
            } => self.sys_spawn(pid, &kind, priority, args),
            Syscall::Kill(target) => self.sys_kill(pid, target),
            Syscall::Allocate { key, default } => self.sys_allocate(pid, &key, default),
            Syscall::Children => Reply::Children(self.table.child_infos(pid)),
            Syscall::RequestPriority(requested) => self.sys_request_priority(pid, requested),
            // Parking is the run loop's job
            Syscall::Sleep(_) | Syscall::Hibernate => Reply::Unit,
        }
    }

    fn sys_spawn(&mut self, pid: Pid, kind: &str, priority: Option<Priority>, args: Value) -> Reply {
        match self.create_process(kind, pid, priority, args) {
            Ok(child) => Reply::Pid(child),
            Err(KernelError::UnknownProcessType(kind)) => {
                self.kernel_error(format!("pid {} spawned unknown process type {}", pid, kind));
                Reply::Denied(SyscallError::UnknownProcessType(kind))
            }
            Err(KernelError::Table(TableError::PidsExhausted)) => {
                self.kernel_error(format!("pid {} spawn failed: no free pid", pid));
                Reply::Denied(SyscallError::PidsExhausted)
            }
            Err(KernelError::Table(TableError::UnknownParent(parent))) => {
                Reply::Denied(SyscallError::NoSuchProcess(parent))
            }
            Err(e) => {
                self.kernel_error(format!("pid {} spawn failed: {}", pid, e));
                Reply::Denied(SyscallError::Forbidden)
            }
        }
    }

    fn sys_kill(&mut self, pid: Pid, target: Pid) -> Reply {
        if target.is_root() {
            return Reply::Denied(SyscallError::Forbidden);
        }
        let parent = match self.table.get(target) {
            Some(descriptor) => descriptor.parent,
            None => return Reply::Denied(SyscallError::NoSuchProcess(target)),
        };
        if parent != Some(pid) {
            return Reply::Denied(SyscallError::NotChild(target));
        }
        self.kill_tree(target);
        Reply::Unit
    }

    fn sys_allocate(&mut self, pid: Pid, key: &str, default: Value) -> Reply {
        match self.table.memory(pid) {
            Some(memory) => Reply::Handle(MemoryHandle::allocate(&memory, key, default)),
            None => Reply::Denied(SyscallError::NoSuchProcess(pid)),
        }
    }

    fn sys_request_priority(&mut self, pid: Pid, requested: Priority) -> Reply {
        let effective = self.scheduler.clamp_priority(requested);
        if !self.table.set_priority(pid, Some(effective)) {
            return Reply::Denied(SyscallError::NoSuchProcess(pid));
        }
        self.scheduler.add(pid, effective);
        Reply::Priority(effective)
    }
}
