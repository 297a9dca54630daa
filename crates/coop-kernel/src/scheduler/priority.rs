//! Strict priority scheduler
//!
//! Lower numbers run first. Each pass snapshots the registered PIDs sorted
//! by `(priority, registration order)` and services each one until it stops
//! being runnable or the quota runs out, then moves to the next. A PID that is
//! removed and registered again mid-pass is a newcomer and waits for the next
//! pass.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use coop_kernel_core::{Pid, Priority};

use super::{Outcome, Quota, Scheduler};

/// Highest priority (served first)
pub const PRIORITY_MIN: i32 = 0;
/// Lowest priority
pub const PRIORITY_MAX: i32 = 139;
/// Priority of processes that do not request one
pub const PRIORITY_DEFAULT: i32 = 120;

#[derive(Clone, Copy, Debug)]
struct Entry {
    priority: Priority,
    seq: u64,
    asleep: bool,
}

/// Linux-style 0..=139 strict priority scheduler
#[derive(Debug, Default)]
pub struct PriorityScheduler {
    entries: BTreeMap<Pid, Entry>,
    next_seq: u64,
    /// Order fixed at `begin()`, with the registration each slot belongs to
    order: Vec<(Pid, u64)>,
    cursor: usize,
}

impl PriorityScheduler {
    /// Empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered priority of `pid`
    pub fn priority_of(&self, pid: Pid) -> Option<Priority> {
        self.entries.get(&pid).map(|e| e.priority)
    }

    /// Number of registered PIDs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_runnable(&self, pid: Pid, seq: u64) -> bool {
        self.entries
            .get(&pid)
            .map_or(false, |e| e.seq == seq && !e.asleep)
    }
}

impl Scheduler for PriorityScheduler {
    fn default_priority(&self) -> Priority {
        Priority(PRIORITY_DEFAULT)
    }

    fn clamp_priority(&self, requested: Priority) -> Priority {
        Priority(requested.0.clamp(PRIORITY_MIN, PRIORITY_MAX))
    }

    fn add(&mut self, pid: Pid, priority: Priority) {
        let priority = self.clamp_priority(priority);
        if let Some(entry) = self.entries.get_mut(&pid) {
            entry.priority = priority;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            pid,
            Entry {
                priority,
                seq,
                asleep: false,
            },
        );
    }

    fn remove(&mut self, pid: Pid) {
        self.entries.remove(&pid);
    }

    fn contains(&self, pid: Pid) -> bool {
        self.entries.contains_key(&pid)
    }

    fn wake(&mut self, pid: Pid) {
        if let Some(entry) = self.entries.get_mut(&pid) {
            entry.asleep = false;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.cursor = 0;
    }

    fn begin(&mut self) {
        let mut order: Vec<(Priority, u64, Pid)> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.asleep)
            .map(|(pid, e)| (e.priority, e.seq, *pid))
            .collect();
        order.sort();
        self.order = order.into_iter().map(|(_, seq, pid)| (pid, seq)).collect();
        self.cursor = 0;
    }

    fn next(&mut self, quota: &dyn Quota) -> Option<Pid> {
        while let Some(&(pid, seq)) = self.order.get(self.cursor) {
            if quota.remaining() <= 0.0 {
                return None;
            }
            if self.is_runnable(pid, seq) {
                return Some(pid);
            }
            self.cursor += 1;
        }
        None
    }

    fn report(&mut self, pid: Pid, outcome: Outcome, _cpu_used: f64) {
        if outcome == Outcome::Sleep {
            if let Some(entry) = self.entries.get_mut(&pid) {
                entry.asleep = true;
            }
        }
        let at_cursor = self.order.get(self.cursor).map(|(current, _)| *current);
        if !outcome.is_runnable() && at_cursor == Some(pid) {
            self.cursor += 1;
        }
    }
}
