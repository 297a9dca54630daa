//! The kernel: process table, threads, sleeping set and run loop
//!
//! ```text
//!  Host ──tick/quota──▶ Kernel::run()
//!                          │ wake due sleepers
//!                          │ scheduler.begin()
//!                          │ loop scheduler.next(quota)
//!                          │     service(pid): resume thread, drain syscalls
//!                          │     scheduler.report(outcome, cpu)
//!                          └ commit table ──▶ Host::store_image
//! ```

mod lifecycle;
mod syscall;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

use coop_hal::Host;
use coop_kernel_core::{
    check_all_invariants, InvariantViolation, Pid, ProcessInfo, ProcessState, ProcessTable,
};
use coop_process::{Interrupt, ProcessRegistry, Reply, Step, Syscall, Thread};
use serde_json::Value;

use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::observer::{KernelObserver, NullObserver};
use crate::scheduler::{Outcome, Scheduler};
use crate::syslog::{SysEventKind, SysLog};

/// When a sleeping process wakes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Wake {
    /// At or after this tick
    At(u64),
    /// Only an external kill ends it
    Never,
}

/// A live thread plus the reply it receives on its next resumption
struct ThreadSlot {
    thread: Box<dyn Thread>,
    next_reply: Reply,
}

/// Cooperative process-scheduling kernel
pub struct Kernel<H: Host, S: Scheduler> {
    host: H,
    scheduler: S,
    registry: ProcessRegistry,
    observer: Box<dyn KernelObserver>,
    config: KernelConfig,
    table: ProcessTable,
    threads: BTreeMap<Pid, ThreadSlot>,
    sleeping: BTreeMap<Pid, Wake>,
    syslog: SysLog,
    tick: u64,
    /// PID whose thread is being resumed
    current: Option<Pid>,
    /// Set when a reset happens mid-pass; ends the pass
    reset_in_pass: bool,
}

impl<H: Host, S: Scheduler> Kernel<H, S> {
    /// Boot a kernel that reports nothing beyond the debug sink and syslog
    pub fn new(
        host: H,
        scheduler: S,
        registry: ProcessRegistry,
        config: KernelConfig,
    ) -> Result<Self, KernelError> {
        Self::with_observer(host, scheduler, registry, config, Box::new(NullObserver))
    }

    /// Boot a kernel.
    ///
    /// Loads the persisted table from the host, repairing it if needed, and
    /// initializes a thread for every surviving process. Fails only if the
    /// configuration is invalid or the root type is not registered.
    pub fn with_observer(
        host: H,
        scheduler: S,
        registry: ProcessRegistry,
        config: KernelConfig,
        observer: Box<dyn KernelObserver>,
    ) -> Result<Self, KernelError> {
        config.validate()?;
        if !registry.contains(&config.root_type) {
            return Err(KernelError::RootTypeNotRegistered(config.root_type.clone()));
        }

        let tick = host.tick();
        let table = ProcessTable::with_root(&config.root_type, config.pid_ceiling);
        let syslog = SysLog::new(config.syslog_capacity);
        let mut kernel = Self {
            host,
            scheduler,
            registry,
            observer,
            config,
            table,
            threads: BTreeMap::new(),
            sleeping: BTreeMap::new(),
            syslog,
            tick,
            current: None,
            reset_in_pass: false,
        };

        kernel.restore();
        kernel.log(&format!(
            "[kernel] booted at tick {} with {} processes",
            kernel.tick,
            kernel.table.len()
        ));
        Ok(kernel)
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Run one tick.
    ///
    /// Wakes due sleepers, then services PIDs in the order the scheduler
    /// yields them until it ends the pass. Returns the number of
    /// resumptions performed.
    pub fn run(&mut self) -> usize {
        self.tick = self.host.tick();
        self.reset_in_pass = false;
        self.wake_due();

        let reserve = self.config.cpu_reserve;
        let mut serviced = 0;
        self.scheduler.begin();
        loop {
            let next = {
                let host = &self.host;
                let quota = move || host.cpu_remaining() - reserve;
                self.scheduler.next(&quota)
            };
            let Some(pid) = next else { break };

            let before = self.host.cpu_remaining();
            let outcome = self.service(pid);
            let used = before - self.host.cpu_remaining();
            serviced += 1;

            if self.reset_in_pass {
                break;
            }
            self.scheduler.report(pid, outcome, used.max(0.0));
        }

        if self.config.persist_every_tick {
            self.commit();
        }
        serviced
    }

    /// Resume `pid` once, draining syscalls until it yields, sleeps or ends
    fn service(&mut self, pid: Pid) -> Outcome {
        if !self.table.contains(pid) {
            self.scheduler.remove(pid);
            return Outcome::Exited;
        }
        if self.sleeping.contains_key(&pid) {
            return Outcome::Sleep;
        }

        let Some(mut slot) = self.threads.remove(&pid) else {
            return if self.init_thread(pid) {
                Outcome::NotReady
            } else {
                Outcome::Exited
            };
        };

        self.current = Some(pid);
        let mut reply = core::mem::replace(&mut slot.next_reply, Reply::Resumed);
        let outcome = loop {
            match slot.thread.resume(reply) {
                Ok(Step::Yield) => {
                    self.threads.insert(pid, slot);
                    break Outcome::Continue;
                }
                Ok(Step::Syscall(Syscall::Sleep(ticks))) => {
                    let until = self.tick.saturating_add(ticks.max(1));
                    self.threads.insert(pid, slot);
                    self.sleep(pid, Wake::At(until));
                    break Outcome::Sleep;
                }
                Ok(Step::Syscall(Syscall::Hibernate)) => {
                    self.threads.insert(pid, slot);
                    self.sleep(pid, Wake::Never);
                    break Outcome::Sleep;
                }
                Ok(Step::Syscall(call)) => {
                    reply = self.dispatch(pid, call);
                }
                Ok(Step::Done) => {
                    self.exit(pid, "completed");
                    break Outcome::Exited;
                }
                Err(Interrupt::Exit(reason)) => {
                    self.exit(pid, &reason);
                    break Outcome::Exited;
                }
                Err(Interrupt::Fault(error)) => {
                    self.fault(pid, error);
                    break Outcome::Exited;
                }
            }
        };
        self.current = None;
        outcome
    }

    /// Park `pid` until `wake`
    fn sleep(&mut self, pid: Pid, wake: Wake) {
        let until = match wake {
            Wake::At(tick) => Some(tick),
            Wake::Never => None,
        };
        self.sleeping.insert(pid, wake);
        self.syslog
            .record(self.tick, pid, SysEventKind::Slept { until });
    }

    /// Release every sleeper whose wake tick has arrived
    fn wake_due(&mut self) {
        let tick = self.tick;
        let due: Vec<Pid> = self
            .sleeping
            .iter()
            .filter(|(_, wake)| matches!(wake, Wake::At(at) if *at <= tick))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in due {
            self.sleeping.remove(&pid);
            self.scheduler.wake(pid);
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Snapshot of every process, in PID order
    pub fn ps(&self) -> Vec<ProcessInfo> {
        self.table
            .pids()
            .into_iter()
            .filter_map(|pid| self.info(pid))
            .collect()
    }

    /// Private memory of `pid` as JSON (`{"args": .., "heap": {..}}`)
    pub fn inspect(&self, pid: Pid) -> Option<Value> {
        let memory = self.table.memory(pid)?;
        let value = serde_json::to_value(&*memory.borrow()).ok();
        value
    }

    /// Snapshot of one process
    pub fn info(&self, pid: Pid) -> Option<ProcessInfo> {
        let descriptor = self.table.get(pid)?;
        Some(ProcessInfo {
            pid,
            parent: descriptor.parent,
            kind: descriptor.kind.clone(),
            priority: descriptor.priority,
            state: self.state_of(pid)?,
        })
    }

    /// Derived lifecycle state of `pid`, `None` if it does not exist
    pub fn state_of(&self, pid: Pid) -> Option<ProcessState> {
        if !self.table.contains(pid) {
            return None;
        }
        if self.sleeping.contains_key(&pid) {
            Some(ProcessState::Sleeping)
        } else if self.threads.contains_key(&pid) || self.current == Some(pid) {
            Some(ProcessState::Running)
        } else {
            Some(ProcessState::Uninitialized)
        }
    }

    /// Tick seen at the start of the last `run()` (or at boot)
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of live processes, root included
    pub fn process_count(&self) -> usize {
        self.table.len()
    }

    /// Process table
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// Event log
    pub fn syslog(&self) -> &SysLog {
        &self.syslog
    }

    /// Active configuration
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Active scheduler
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Check process table invariants. Empty when healthy.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        check_all_invariants(&self.table, &self.config.root_type)
    }

    fn log(&self, msg: &str) {
        self.host.debug_write(msg);
    }
}
