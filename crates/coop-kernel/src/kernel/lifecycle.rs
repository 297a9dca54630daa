//! Process lifecycle: creation, teardown, reboot, reset and persistence

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use coop_hal::Host;
use coop_kernel_core::{Pid, Priority, ProcessTable, ROOT_PID};
use coop_process::{ProcessError, Reply, ThreadInit};
use serde_json::Value;

use super::{Kernel, ThreadSlot};
use crate::error::KernelError;
use crate::scheduler::Scheduler;
use crate::syslog::SysEventKind;

impl<H: Host, S: Scheduler> Kernel<H, S> {
    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a process under `parent` and initialize its thread.
    ///
    /// A requested priority is clamped by the scheduler; `None` inherits the
    /// scheduler default. If the thread factory fails the process is
    /// reported as faulted and removed, but its PID is still returned.
    pub fn create_process(
        &mut self,
        kind: &str,
        parent: Pid,
        priority: Option<Priority>,
        args: Value,
    ) -> Result<Pid, KernelError> {
        if !self.registry.contains(kind) {
            return Err(KernelError::UnknownProcessType(kind.to_string()));
        }

        let priority = priority.map(|p| self.scheduler.clamp_priority(p));
        let pid = self.table.insert(kind, parent, priority, args)?;
        let effective = priority.unwrap_or_else(|| self.scheduler.default_priority());
        self.scheduler.add(pid, effective);

        self.syslog.record(
            self.tick,
            pid,
            SysEventKind::Spawned {
                kind: kind.to_string(),
                parent: Some(parent),
            },
        );
        self.log(&format!(
            "[kernel] spawned {} pid={} parent={} priority={}",
            kind, pid, parent, effective
        ));

        self.init_thread(pid);
        Ok(pid)
    }

    /// Build the thread for `pid` from its descriptor.
    ///
    /// Returns false if the factory failed (the process has been faulted).
    pub(super) fn init_thread(&mut self, pid: Pid) -> bool {
        let Some(descriptor) = self.table.get(pid) else {
            return false;
        };
        let kind = descriptor.kind.clone();
        let args = descriptor.args();
        let init = ThreadInit {
            pid,
            parent: descriptor.parent,
            kind: &kind,
            args: &args,
        };

        match self.registry.instantiate(&init) {
            Ok(thread) => {
                self.threads.insert(
                    pid,
                    ThreadSlot {
                        thread,
                        next_reply: Reply::Start,
                    },
                );
                true
            }
            Err(error) => {
                self.fault(pid, error);
                false
            }
        }
    }

    /// Initialize a thread for every process that lacks one
    fn init_all(&mut self) {
        for pid in self.table.pids() {
            if self.table.contains(pid) && !self.threads.contains_key(&pid) {
                self.init_thread(pid);
            }
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Kill `pid` and all its descendants.
    ///
    /// Returns false for the root or an unknown PID. Commits the table.
    pub fn kill(&mut self, pid: Pid) -> bool {
        if pid.is_root() || !self.table.contains(pid) {
            return false;
        }
        self.kill_tree(pid);
        self.commit();
        true
    }

    /// Remove `pid` and every descendant from the table, the thread map,
    /// the sleeping set and the scheduler. Returns the removed PIDs.
    pub(super) fn kill_tree(&mut self, pid: Pid) -> Vec<Pid> {
        if pid.is_root() || !self.table.contains(pid) {
            return Vec::new();
        }

        let mut victims = Vec::from([pid]);
        victims.extend(self.table.descendants_of(pid));

        for victim in &victims {
            self.table.remove(*victim);
            self.threads.remove(victim);
            self.sleeping.remove(victim);
            self.scheduler.remove(*victim);
            self.syslog.record(self.tick, *victim, SysEventKind::Killed);
        }

        self.log(&format!("[kernel] killed {:?}", victims));
        victims
    }

    /// Orderly termination of `pid`
    pub(super) fn exit(&mut self, pid: Pid, reason: &str) {
        let Some(info) = self.info(pid) else {
            return;
        };
        self.observer.on_process_exit(&info, reason);
        self.syslog.record(
            self.tick,
            pid,
            SysEventKind::Exited {
                reason: reason.to_string(),
            },
        );
        self.log(&format!("[kernel] {} pid={} exited: {}", info.kind, pid, reason));

        if pid.is_root() {
            self.kernel_error(format!("root process exited: {}", reason));
            self.reset();
        } else {
            self.kill_tree(pid);
        }
    }

    /// Failure of `pid`. The root cannot be killed, so its failure resets
    /// the kernel.
    pub(super) fn fault(&mut self, pid: Pid, error: ProcessError) {
        let Some(info) = self.info(pid) else {
            return;
        };
        self.observer.on_process_error(&info, &error);
        self.syslog.record(
            self.tick,
            pid,
            SysEventKind::Faulted {
                message: error.message().to_string(),
            },
        );
        self.log(&format!("[kernel] {} pid={} faulted: {}", info.kind, pid, error));

        if pid.is_root() {
            self.kernel_error(format!("root process faulted: {}", error));
            self.reset();
        } else {
            self.kill_tree(pid);
        }
    }

    // ========================================================================
    // Reboot / reset
    // ========================================================================

    /// Discard threads, the sleeping set and scheduler state, then rebuild
    /// them from the live process table. Descriptors, process memory and the
    /// PID counter are kept as they are, committed or not.
    pub fn reboot(&mut self) {
        self.log("[kernel] reboot");
        self.syslog
            .record(self.tick, ROOT_PID, SysEventKind::Rebooted);
        self.rebuild();
        self.commit();
    }

    /// Wipe the table and start over with a lone root process
    pub fn reset(&mut self) {
        self.log("[kernel] reset");
        self.table = ProcessTable::with_root(&self.config.root_type, self.config.pid_ceiling);
        self.threads.clear();
        self.sleeping.clear();
        self.scheduler.clear();
        let default = self.scheduler.default_priority();
        self.scheduler.add(ROOT_PID, default);
        self.reset_in_pass = true;
        self.syslog.record(self.tick, ROOT_PID, SysEventKind::Reset);
        self.commit();
    }

    /// Load the table from host storage (keeping the fresh table if the
    /// host has none), then repair it and rebuild all live state.
    pub(super) fn restore(&mut self) {
        let image = match self.host.load_image() {
            Ok(image) => image,
            Err(e) => {
                self.kernel_error(format!("failed to load process table: {}", e));
                None
            }
        };

        if let Some(image) = image {
            match ProcessTable::from_json(&image, &self.config.root_type, self.config.pid_ceiling)
            {
                Ok(table) => self.table = table,
                Err(e) => {
                    self.kernel_error(format!("discarding process table: {}", e));
                    self.table =
                        ProcessTable::with_root(&self.config.root_type, self.config.pid_ceiling);
                }
            }
        }

        self.rebuild();
    }

    /// Prune the table, then rebuild scheduler state and every thread
    fn rebuild(&mut self) {
        let registry = &self.registry;
        let dropped = self.table.prune(|kind| registry.contains(kind));
        if !dropped.is_empty() {
            self.kernel_error(format!(
                "dropped processes with unknown type or parent: {:?}",
                dropped
            ));
        }

        self.threads.clear();
        self.sleeping.clear();
        self.scheduler.clear();
        let default = self.scheduler.default_priority();
        for descriptor in self.table.iter() {
            self.scheduler
                .add(descriptor.pid, descriptor.priority.unwrap_or(default));
        }

        self.init_all();
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the process table to host storage
    pub fn persist(&self) -> Result<(), KernelError> {
        let image = self.table.to_json()?;
        self.host.store_image(&image)?;
        Ok(())
    }

    /// Persist, reporting failure as a kernel error
    pub(super) fn commit(&mut self) {
        if let Err(e) = self.persist() {
            self.kernel_error(format!("commit failed: {}", e));
        }
    }

    /// Report an internal invariant violation
    pub(super) fn kernel_error(&mut self, message: String) {
        self.log(&format!("[kernel] error: {}", message));
        self.observer.on_kernel_error(&message);
        self.syslog
            .record(self.tick, ROOT_PID, SysEventKind::KernelError { message });
    }
}
