//! Fair-share scheduler (CFS-like)
//!
//! Every PID accumulates virtual runtime: CPU used scaled by
//! `WEIGHT_DEFAULT / weight`, so heavier PIDs age more slowly. A pass splits
//! the remaining quota evenly between runnable PIDs and services them in
//! ascending virtual-runtime order, each up to its share. If PIDs finish
//! early the leftover quota is redistributed in another round.
//!
//! New and newly woken PIDs start at the current minimum virtual runtime,
//! never at zero.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;

use coop_kernel_core::{Pid, Priority};

use super::{Outcome, Quota, Scheduler};

/// Lightest weight
pub const WEIGHT_MIN: i32 = 1;
/// Heaviest weight
pub const WEIGHT_MAX: i32 = 1000;
/// Weight of processes that do not request one
pub const WEIGHT_DEFAULT: i32 = 100;

#[derive(Clone, Copy, Debug)]
struct Entry {
    weight: i32,
    vruntime: f64,
    asleep: bool,
}

/// Weighted fair-share scheduler
#[derive(Debug, Default)]
pub struct FairScheduler {
    entries: BTreeMap<Pid, Entry>,
    min_vruntime: f64,
    /// PIDs left in the current round, head is being serviced
    round: VecDeque<Pid>,
    /// Share for each PID in the current round
    share: f64,
    /// Budget left for the head of `round`
    budget: f64,
    /// PIDs that slept or exited during this pass
    done: BTreeSet<Pid>,
}

impl FairScheduler {
    /// Empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual runtime of `pid`
    pub fn vruntime(&self, pid: Pid) -> Option<f64> {
        self.entries.get(&pid).map(|e| e.vruntime)
    }

    /// Weight of `pid`
    pub fn weight(&self, pid: Pid) -> Option<i32> {
        self.entries.get(&pid).map(|e| e.weight)
    }

    /// Floor at which new and woken PIDs join
    pub fn min_vruntime(&self) -> f64 {
        self.min_vruntime
    }

    /// Number of registered PIDs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raise `min_vruntime` to the smallest runnable virtual runtime.
    /// Never moves backwards.
    fn update_min_vruntime(&mut self) {
        let smallest = self
            .entries
            .values()
            .filter(|e| !e.asleep)
            .map(|e| e.vruntime)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
        if let Some(v) = smallest {
            self.min_vruntime = self.min_vruntime.max(v);
        }
    }

    fn is_candidate(&self, pid: Pid) -> bool {
        !self.done.contains(&pid) && self.entries.get(&pid).map_or(false, |e| !e.asleep)
    }

    /// Start a new round over every runnable PID not done this pass
    fn start_round(&mut self, available: f64) -> bool {
        let mut runnable: Vec<(f64, Pid)> = self
            .entries
            .iter()
            .filter(|(pid, e)| !e.asleep && !self.done.contains(pid))
            .map(|(pid, e)| (e.vruntime, *pid))
            .collect();
        if runnable.is_empty() {
            return false;
        }
        runnable.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        self.share = available / runnable.len() as f64;
        self.budget = self.share;
        self.round = runnable.into_iter().map(|(_, pid)| pid).collect();
        true
    }

    fn advance(&mut self) {
        self.round.pop_front();
        self.budget = self.share;
    }
}

impl Scheduler for FairScheduler {
    fn default_priority(&self) -> Priority {
        Priority(WEIGHT_DEFAULT)
    }

    fn clamp_priority(&self, requested: Priority) -> Priority {
        Priority(requested.0.clamp(WEIGHT_MIN, WEIGHT_MAX))
    }

    fn add(&mut self, pid: Pid, priority: Priority) {
        let weight = self.clamp_priority(priority).0;
        if let Some(entry) = self.entries.get_mut(&pid) {
            entry.weight = weight;
            return;
        }
        self.update_min_vruntime();
        self.entries.insert(
            pid,
            Entry {
                weight,
                vruntime: self.min_vruntime,
                asleep: false,
            },
        );
    }

    fn remove(&mut self, pid: Pid) {
        self.entries.remove(&pid);
        self.done.remove(&pid);
    }

    fn contains(&self, pid: Pid) -> bool {
        self.entries.contains_key(&pid)
    }

    fn wake(&mut self, pid: Pid) {
        self.update_min_vruntime();
        let floor = self.min_vruntime;
        if let Some(entry) = self.entries.get_mut(&pid) {
            if entry.asleep {
                entry.asleep = false;
                entry.vruntime = entry.vruntime.max(floor);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.round.clear();
        self.done.clear();
        self.min_vruntime = 0.0;
        self.share = 0.0;
        self.budget = 0.0;
    }

    fn begin(&mut self) {
        self.done.clear();
        self.round.clear();
        self.update_min_vruntime();
    }

    fn next(&mut self, quota: &dyn Quota) -> Option<Pid> {
        loop {
            let available = quota.remaining();
            if available <= 0.0 {
                self.round.clear();
                return None;
            }

            while let Some(&pid) = self.round.front() {
                if self.budget > 0.0 && self.is_candidate(pid) {
                    return Some(pid);
                }
                self.advance();
            }

            if !self.start_round(available) {
                return None;
            }
        }
    }

    fn report(&mut self, pid: Pid, outcome: Outcome, cpu_used: f64) {
        let used = cpu_used.max(0.0);
        if let Some(entry) = self.entries.get_mut(&pid) {
            entry.vruntime += used * WEIGHT_DEFAULT as f64 / entry.weight as f64;
            if outcome == Outcome::Sleep {
                entry.asleep = true;
            }
        }

        let is_head = self.round.front() == Some(&pid);
        if !outcome.is_runnable() {
            self.done.insert(pid);
            if is_head {
                self.advance();
            }
            return;
        }
        if is_head {
            self.budget -= used;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::run_pass;
    use alloc::vec;
    use core::cell::Cell;

    fn approx(a: f64, b: f64) -> bool {
        let d = a - b;
        d < 1e-9 && d > -1e-9
    }

    // ========================================================================
    // Weights
    // ========================================================================

    #[test]
    fn test_clamp_weight() {
        let sched = FairScheduler::new();
        assert_eq!(sched.clamp_priority(Priority(0)), Priority(1));
        assert_eq!(sched.clamp_priority(Priority(5000)), Priority(1000));
        assert_eq!(sched.default_priority(), Priority(100));
    }

    #[test]
    fn test_vruntime_scales_with_weight() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(200));

        sched.begin();
        sched.report(Pid(1), Outcome::Continue, 4.0);
        sched.report(Pid(2), Outcome::Continue, 4.0);

        assert!(approx(sched.vruntime(Pid(1)).unwrap(), 4.0));
        assert!(approx(sched.vruntime(Pid(2)).unwrap(), 2.0));
    }

    // ========================================================================
    // Shares
    // ========================================================================

    #[test]
    fn test_pass_splits_quota_evenly() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));

        let remaining = Cell::new(10.0);
        let quota = || remaining.get();
        let mut trace = Vec::new();
        run_pass(&mut sched, &quota, |pid| {
            remaining.set(remaining.get() - 1.0);
            trace.push(pid);
            (Outcome::Continue, 1.0)
        });

        let ones = trace.iter().filter(|p| **p == Pid(1)).count();
        let twos = trace.iter().filter(|p| **p == Pid(2)).count();
        assert_eq!(ones + twos, 10);
        assert_eq!(ones, 5);
        assert_eq!(trace[0], Pid(1));
        assert!(approx(
            sched.vruntime(Pid(1)).unwrap(),
            sched.vruntime(Pid(2)).unwrap()
        ));
    }

    #[test]
    fn test_slack_is_redistributed() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));

        let remaining = Cell::new(10.0);
        let quota = || remaining.get();
        let mut trace = Vec::new();
        run_pass(&mut sched, &quota, |pid| {
            remaining.set(remaining.get() - 1.0);
            trace.push(pid);
            if pid == Pid(1) {
                (Outcome::Sleep, 1.0)
            } else {
                (Outcome::Continue, 1.0)
            }
        });

        assert_eq!(trace[0], Pid(1));
        assert_eq!(trace.iter().filter(|p| **p == Pid(1)).count(), 1);
        assert_eq!(trace.iter().filter(|p| **p == Pid(2)).count(), 9);
    }

    #[test]
    fn test_lowest_vruntime_served_first() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));
        sched.begin();
        sched.report(Pid(1), Outcome::Continue, 3.0);

        sched.begin();
        assert_eq!(sched.next(&|| 10.0), Some(Pid(2)));
    }

    // ========================================================================
    // Join point
    // ========================================================================

    #[test]
    fn test_newcomer_joins_at_min_vruntime() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));

        for _ in 0..3 {
            let remaining = Cell::new(10.0);
            let quota = || remaining.get();
            run_pass(&mut sched, &quota, |_pid| {
                remaining.set(remaining.get() - 1.0);
                (Outcome::Continue, 1.0)
            });
        }

        let floor = sched.vruntime(Pid(1)).unwrap().min(sched.vruntime(Pid(2)).unwrap());
        assert!(floor > 0.0);

        sched.add(Pid(3), Priority(100));
        let joined = sched.vruntime(Pid(3)).unwrap();
        assert!(approx(joined, floor));
        assert!(approx(joined, sched.min_vruntime()));
    }

    #[test]
    fn test_woken_pid_catches_up_to_floor() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));

        sched.begin();
        sched.report(Pid(1), Outcome::Sleep, 1.0);
        sched.report(Pid(2), Outcome::Continue, 50.0);
        sched.begin();
        assert!(approx(sched.min_vruntime(), 50.0));

        sched.wake(Pid(1));
        assert!(approx(sched.vruntime(Pid(1)).unwrap(), 50.0));
    }

    #[test]
    fn test_sleeping_pid_excluded_from_pass() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));
        sched.begin();
        sched.report(Pid(1), Outcome::Sleep, 0.0);

        let remaining = Cell::new(4.0);
        let quota = || remaining.get();
        let mut trace = Vec::new();
        run_pass(&mut sched, &quota, |pid| {
            remaining.set(remaining.get() - 1.0);
            trace.push(pid);
            (Outcome::Continue, 1.0)
        });
        assert_eq!(trace, vec![Pid(2), Pid(2), Pid(2), Pid(2)]);
    }

    #[test]
    fn test_removed_mid_pass_is_skipped() {
        let mut sched = FairScheduler::new();
        sched.add(Pid(1), Priority(100));
        sched.add(Pid(2), Priority(100));
        sched.add(Pid(3), Priority(100));

        sched.begin();
        let quota = || 9.0;
        assert_eq!(sched.next(&quota), Some(Pid(1)));
        sched.remove(Pid(2));
        sched.report(Pid(1), Outcome::Exited, 1.0);
        assert_eq!(sched.next(&quota), Some(Pid(3)));
    }
}
