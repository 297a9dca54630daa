//! Init Process (PID 0) for Coop OS
//!
//! The root process every kernel boots. Its job is small:
//!
//! - **Supervise**: keep a declared list of services running as its children
//! - **Ledger**: count spawns per service in its own memory, so the numbers
//!   survive reboots and host restarts
//! - **Idle**: sleep `check_interval` ticks between checks
//!
//! # Cycle
//!
//! ```text
//!   Start ──▶ Allocate("services") ──▶ Children ──▶ Spawn missing ... ──▶ Sleep(n)
//!                                          ▲                                 │
//!                                          └─────────────────────────────────┘
//! ```
//!
//! A service counts as alive while a child of the same type with the same
//! arguments exists. Services that exit or are killed are spawned again on
//! the next check.

#![no_std]
extern crate alloc;

pub mod service;

use alloc::collections::VecDeque;

use coop_kernel_core::DEFAULT_ROOT_TYPE;
use coop_process::{
    Interrupt, MemoryHandle, Pid, ProcessError, ProcessRegistry, Reply, Step, Syscall,
    SyscallError, Thread, ThreadInit,
};
use serde_json::json;

pub use service::{
    missing_services, InitConfig, Ledger, ServiceRecord, ServiceSpec, DEFAULT_CHECK_INTERVAL,
    LEDGER_KEY,
};

/// The syscall Init is waiting on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Waiting {
    /// Nothing issued yet
    Boot,
    /// `Allocate` of the ledger
    Ledger,
    /// `Children`
    Children,
    /// `Spawn` of the service at this index
    Spawn(usize),
    /// `Sleep` between checks
    Sleep,
}

/// Init process state
pub struct Init {
    config: InitConfig,
    /// Persisted spawn counts
    ledger: Option<MemoryHandle>,
    /// Services still to spawn this check
    pending: VecDeque<usize>,
    waiting: Waiting,
}

impl Init {
    /// Init supervising `config`
    pub fn new(config: InitConfig) -> Self {
        Self {
            config,
            ledger: None,
            pending: VecDeque::new(),
            waiting: Waiting::Boot,
        }
    }

    /// Build from a thread init record.
    ///
    /// Arguments stored on the process win over `fallback`, so a persisted
    /// root keeps supervising what it was created with.
    pub fn from_init(init: &ThreadInit<'_>, fallback: &InitConfig) -> Result<Self, ProcessError> {
        let config = InitConfig::from_args(init.args)?.unwrap_or_else(|| fallback.clone());
        Ok(Self::new(config))
    }

    /// Supervised services
    pub fn config(&self) -> &InitConfig {
        &self.config
    }

    fn survey(&mut self) -> Step {
        self.waiting = Waiting::Children;
        Syscall::Children.into()
    }

    fn spawn_next(&mut self) -> Step {
        let Some(index) = self.pending.pop_front() else {
            self.waiting = Waiting::Sleep;
            return Syscall::Sleep(self.config.check_interval.max(1)).into();
        };
        let spec = &self.config.services[index];
        self.waiting = Waiting::Spawn(index);
        Syscall::Spawn {
            kind: spec.kind.clone(),
            priority: spec.priority,
            args: spec.args.clone(),
        }
        .into()
    }

    /// Apply `f` to the ledger record of the service at `index`
    fn record(
        &self,
        index: usize,
        f: impl FnOnce(&mut ServiceRecord),
    ) -> Result<(), Interrupt> {
        let Some(ledger) = &self.ledger else {
            return Ok(());
        };
        let mut entries: Ledger = ledger.get_as()?;
        let key = self.config.services[index].key();
        f(entries.entry(key.into()).or_default());
        ledger.set_as(&entries)?;
        Ok(())
    }

    fn spawned(&self, index: usize, pid: Pid) -> Result<(), Interrupt> {
        self.record(index, |record| {
            record.pid = Some(pid);
            record.spawns += 1;
            record.last_error = None;
        })
    }

    fn refused(&self, index: usize, error: SyscallError) -> Result<(), Interrupt> {
        self.record(index, |record| {
            record.last_error = Some(alloc::format!("{}", error));
        })
    }
}

impl Thread for Init {
    fn resume(&mut self, reply: Reply) -> Result<Step, Interrupt> {
        match self.waiting {
            Waiting::Boot => {
                if self.config.services.is_empty() {
                    return Ok(Syscall::Hibernate.into());
                }
                self.waiting = Waiting::Ledger;
                Ok(Syscall::allocate(LEDGER_KEY, json!({})).into())
            }
            Waiting::Ledger => {
                self.ledger = Some(reply.into_handle()?);
                Ok(self.survey())
            }
            Waiting::Children => {
                let children = reply.into_children()?;
                self.pending = missing_services(&self.config.services, &children).into();
                Ok(self.spawn_next())
            }
            Waiting::Spawn(index) => {
                match reply {
                    Reply::Pid(pid) => self.spawned(index, pid)?,
                    Reply::Denied(error) => self.refused(index, error)?,
                    other => return Err(SyscallError::UnexpectedReply(other.name()).into()),
                }
                Ok(self.spawn_next())
            }
            Waiting::Sleep => Ok(self.survey()),
        }
    }
}

/// Register Init as the default root type, supervising `config` unless the
/// root process carries its own arguments.
pub fn register(registry: &mut ProcessRegistry, config: InitConfig) -> &mut ProcessRegistry {
    register_as(registry, DEFAULT_ROOT_TYPE, config)
}

/// Register Init under a custom type name
pub fn register_as<'r>(
    registry: &'r mut ProcessRegistry,
    kind: &str,
    config: InitConfig,
) -> &'r mut ProcessRegistry {
    registry.register(kind, move |init: &ThreadInit<'_>| Init::from_init(init, &config))
}
