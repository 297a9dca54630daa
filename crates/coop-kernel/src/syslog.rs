//! Kernel event log (SysLog)
//!
//! Records process lifecycle events for audit and for the supervisor's
//! console. Events are append-only with monotonic IDs; the oldest are
//! dropped once the configured capacity is exceeded.

use alloc::string::String;
use alloc::vec::Vec;

use coop_kernel_core::Pid;
use serde::Serialize;

/// Event ID (monotonic, never reused)
pub type EventId = u64;

/// A kernel event
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SysEvent {
    /// Unique event ID
    pub id: EventId,
    /// Kernel tick at which it happened
    pub tick: u64,
    /// Process concerned (the root for kernel-wide events)
    pub pid: Pid,
    /// What happened
    pub kind: SysEventKind,
}

/// Type of kernel event
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SysEventKind {
    /// Process created
    Spawned {
        /// Registered type
        #[serde(rename = "type")]
        kind: String,
        /// Creating process
        parent: Option<Pid>,
    },
    /// Process removed by a kill (directly or by cascade)
    Killed,
    /// Process ended itself
    Exited {
        /// Reason given by the process
        reason: String,
    },
    /// Process failed
    Faulted {
        /// Error message
        message: String,
    },
    /// Process parked
    Slept {
        /// Wake tick, `None` when hibernating
        until: Option<u64>,
    },
    /// Threads discarded and rebuilt from the table
    Rebooted,
    /// Table wiped back to a lone root
    Reset,
    /// Kernel invariant violation
    KernelError {
        /// Description
        message: String,
    },
}

/// Bounded kernel event log
#[derive(Debug)]
pub struct SysLog {
    /// Event entries (append-only)
    events: Vec<SysEvent>,
    /// Next event ID to assign
    next_id: EventId,
    /// Maximum number of events kept
    capacity: usize,
}

impl SysLog {
    /// Create an empty log keeping at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
            capacity,
        }
    }

    /// Append an event and return its ID
    pub fn record(&mut self, tick: u64, pid: Pid, kind: SysEventKind) -> EventId {
        let id = self.next_id;
        self.next_id += 1;

        self.events.push(SysEvent {
            id,
            tick,
            pid,
            kind,
        });

        self.trim_if_needed();
        id
    }

    /// Get all retained events, oldest first.
    pub fn events(&self) -> &[SysEvent] {
        &self.events
    }

    /// Get the most recent N events, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<&SysEvent> {
        self.events.iter().rev().take(count).collect()
    }

    /// Events concerning `pid`, oldest first
    pub fn for_pid(&self, pid: Pid) -> Vec<&SysEvent> {
        self.events.iter().filter(|e| e.pid == pid).collect()
    }

    /// Get the number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the next event ID.
    pub fn next_id(&self) -> EventId {
        self.next_id
    }

    /// Trim old events if exceeding capacity.
    fn trim_if_needed(&mut self) {
        if self.events.len() > self.capacity {
            let drain_count = self.events.len() - self.capacity;
            self.events.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syslog_ids_are_monotonic() {
        let mut log = SysLog::new(10);
        let a = log.record(1, Pid(1), SysEventKind::Killed);
        let b = log.record(1, Pid(2), SysEventKind::Rebooted);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.next_id(), 2);
    }

    #[test]
    fn test_syslog_trims_oldest() {
        let mut log = SysLog::new(3);
        for i in 0..5 {
            log.record(i, Pid(0), SysEventKind::Reset);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[0].id, 2);
        assert_eq!(log.get_recent(1)[0].id, 4);
    }

    #[test]
    fn test_syslog_for_pid() {
        let mut log = SysLog::new(10);
        log.record(1, Pid(4), SysEventKind::Killed);
        log.record(1, Pid(5), SysEventKind::Killed);
        log.record(2, Pid(4), SysEventKind::Slept { until: Some(5) });
        assert_eq!(log.for_pid(Pid(4)).len(), 2);
    }

    #[test]
    fn test_syslog_event_json() {
        let mut log = SysLog::new(10);
        log.record(
            3,
            Pid(2),
            SysEventKind::Exited {
                reason: "done".into(),
            },
        );
        let json = serde_json::to_value(&log.events()[0]).unwrap();
        assert_eq!(json["kind"]["event"], "exited");
        assert_eq!(json["kind"]["reason"], "done");
        assert_eq!(json["tick"], 3);
    }
}
