//! Pluggable scheduling disciplines
//!
//! The kernel owns process lifecycle; a [`Scheduler`] only decides which
//! registered PID to service next. One pass per kernel tick looks like:
//!
//! ```text
//! begin()
//! while let Some(pid) = next(quota) {
//!     outcome = <kernel resumes pid once>
//!     report(pid, outcome, cpu_used)
//! }
//! ```
//!
//! `report` tells the scheduler whether the PID is still runnable, so it can
//! decide whether to offer it again in the same pass. PIDs removed while a
//! pass is in progress are skipped silently.

mod fair;
mod priority;

pub use fair::{FairScheduler, WEIGHT_DEFAULT, WEIGHT_MAX, WEIGHT_MIN};
pub use priority::{PriorityScheduler, PRIORITY_DEFAULT, PRIORITY_MAX, PRIORITY_MIN};

use alloc::boxed::Box;

use coop_kernel_core::{Pid, Priority};

/// Live CPU-remaining probe for the current tick
pub trait Quota {
    /// Budget left; `<= 0.0` means spent
    fn remaining(&self) -> f64;
}

impl<F> Quota for F
where
    F: Fn() -> f64,
{
    fn remaining(&self) -> f64 {
        self()
    }
}

/// What happened when the kernel serviced a PID once
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The thread yielded and is still runnable
    Continue,
    /// The thread was only (re)initialized; nothing ran yet
    NotReady,
    /// The thread went to sleep
    Sleep,
    /// The process is gone
    Exited,
}

impl Outcome {
    /// Whether the PID may be offered again this pass
    pub fn is_runnable(self) -> bool {
        matches!(self, Outcome::Continue | Outcome::NotReady)
    }
}

/// Scheduling discipline consumed by the kernel
pub trait Scheduler {
    /// Priority used when a process does not request one
    fn default_priority(&self) -> Priority;

    /// Normalize a requested priority into this scheduler's valid band
    fn clamp_priority(&self, requested: Priority) -> Priority;

    /// Register `pid`, or update its priority if already registered
    fn add(&mut self, pid: Pid, priority: Priority);

    /// Unregister `pid`. Safe while a pass is in progress.
    fn remove(&mut self, pid: Pid);

    /// Whether `pid` is registered
    fn contains(&self, pid: Pid) -> bool;

    /// Make a sleeping `pid` runnable again
    fn wake(&mut self, pid: Pid);

    /// Forget every PID
    fn clear(&mut self);

    /// Start a pass
    fn begin(&mut self);

    /// Next PID to service, or `None` when the pass is over
    fn next(&mut self, quota: &dyn Quota) -> Option<Pid>;

    /// Feed back the result of servicing `pid`
    fn report(&mut self, pid: Pid, outcome: Outcome, cpu_used: f64);
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn default_priority(&self) -> Priority {
        (**self).default_priority()
    }

    fn clamp_priority(&self, requested: Priority) -> Priority {
        (**self).clamp_priority(requested)
    }

    fn add(&mut self, pid: Pid, priority: Priority) {
        (**self).add(pid, priority)
    }

    fn remove(&mut self, pid: Pid) {
        (**self).remove(pid)
    }

    fn contains(&self, pid: Pid) -> bool {
        (**self).contains(pid)
    }

    fn wake(&mut self, pid: Pid) {
        (**self).wake(pid)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn begin(&mut self) {
        (**self).begin()
    }

    fn next(&mut self, quota: &dyn Quota) -> Option<Pid> {
        (**self).next(quota)
    }

    fn report(&mut self, pid: Pid, outcome: Outcome, cpu_used: f64) {
        (**self).report(pid, outcome, cpu_used)
    }
}

/// Drive one full pass of `scheduler`, calling `service` for every PID it
/// yields. `service` returns the outcome and the CPU it used.
///
/// Returns the number of times `service` was called.
pub fn run_pass<S, F>(scheduler: &mut S, quota: &dyn Quota, mut service: F) -> usize
where
    S: Scheduler + ?Sized,
    F: FnMut(Pid) -> (Outcome, f64),
{
    let mut serviced = 0;
    scheduler.begin();
    while let Some(pid) = scheduler.next(quota) {
        let (outcome, used) = service(pid);
        scheduler.report(pid, outcome, used);
        serviced += 1;
    }
    serviced
}
