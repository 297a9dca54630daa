//! Kernel assembly and JSON snapshots
//!
//! Everything here is host-agnostic so it can be exercised natively against
//! `MockHost`; the wasm surface in `supervisor.rs` only adds JS conversions.

use coop_hal::Host;
use coop_init::InitConfig;
use coop_kernel::{
    FairScheduler, Interrupt, Kernel, KernelConfig, KernelError, Pid, PriorityScheduler,
    ProcessRegistry, Reply, Scheduler, Step, Syscall, ThreadInit,
};
use serde::Deserialize;

use crate::constants::IDLE_TYPE;

/// Kernel with the scheduler picked at runtime
pub type DynKernel<H> = Kernel<H, Box<dyn Scheduler>>;

/// Scheduling discipline selected by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Strict priority, FIFO within a level
    #[default]
    Priority,
    /// Weighted fair share
    Fair,
}

impl SchedulerKind {
    /// Fresh scheduler of this kind
    pub fn build(self) -> Box<dyn Scheduler> {
        match self {
            SchedulerKind::Priority => Box::new(PriorityScheduler::new()),
            SchedulerKind::Fair => Box::new(FairScheduler::new()),
        }
    }
}

/// Supervisor configuration, passed as JSON by the page.
///
/// ```json
/// {
///   "kernel": { "pid_ceiling": 1000 },
///   "scheduler": "fair",
///   "init": { "services": [{ "type": "idle" }], "check_interval": 5 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Kernel tunables
    pub kernel: KernelConfig,
    /// Scheduling discipline, `"priority"` unless set
    pub scheduler: SchedulerKind,
    /// Services the root keeps alive
    pub init: InitConfig,
}

impl SupervisorConfig {
    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, KernelError> {
        let config: SupervisorConfig = serde_json::from_str(json)
            .map_err(|e| KernelError::Config(format!("{}", e)))?;
        config.kernel.validate()?;
        Ok(config)
    }
}

/// Registry with Init as the root type plus the built-in `idle` type
pub fn builtin_registry(config: &SupervisorConfig) -> ProcessRegistry {
    let mut registry = ProcessRegistry::new();
    coop_init::register_as(&mut registry, &config.kernel.root_type, config.init.clone());
    registry.register(IDLE_TYPE, |_init: &ThreadInit<'_>| {
        Ok(|_reply: Reply| -> Result<Step, Interrupt> { Ok(Syscall::Hibernate.into()) })
    });
    registry
}

/// Boot a kernel for `config` over `host`
pub fn build_kernel<H: Host>(
    host: H,
    config: &SupervisorConfig,
    registry: ProcessRegistry,
) -> Result<DynKernel<H>, KernelError> {
    Kernel::new(host, config.scheduler.build(), registry, config.kernel.clone())
}

/// `ps()` as a JSON array
pub fn ps_json<H: Host, S: Scheduler>(kernel: &Kernel<H, S>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&kernel.ps())
}

/// Private memory of `pid` as JSON
pub fn inspect_json<H: Host, S: Scheduler>(kernel: &Kernel<H, S>, pid: Pid) -> Option<String> {
    kernel.inspect(pid).map(|memory| memory.to_string())
}

/// Most recent `count` syslog events as a JSON array, newest first
pub fn syslog_json<H: Host, S: Scheduler>(
    kernel: &Kernel<H, S>,
    count: usize,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&kernel.syslog().get_recent(count))
}

/// Invariant violations, one `"name: description"` line each
pub fn violations<H: Host, S: Scheduler>(kernel: &Kernel<H, S>) -> Vec<String> {
    kernel
        .check_invariants()
        .into_iter()
        .map(|v| format!("{}: {}", v.invariant, v.description))
        .collect()
}
