//! Runtime-checkable process table invariants
//!
//! Used for assertion checking in tests and by `Kernel::check_invariants`.
//!
//! # Invariants
//!
//! 1. **Root Present**: PID 0 exists, has no parent and has the root type
//! 2. **Descriptor Consistency**: every descriptor is stored under its own PID
//! 3. **Parent Tracked**: every non-root parent link names a tracked process
//! 4. **Acyclic Hierarchy**: following parent links always reaches the root
//! 5. **PID Range**: live PIDs and the allocation counter lie below the ceiling

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::constants::ROOT_PID;
use crate::table::ProcessTable;

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all table invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(table: &ProcessTable, root_kind: &str) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_root_present(table, root_kind));
    violations.extend(check_descriptor_consistency(table));
    violations.extend(check_parent_tracked(table));
    violations.extend(check_acyclic_hierarchy(table));
    violations.extend(check_pid_range(table));

    violations
}

/// Invariant 1: PID 0 exists with the root type and no parent
fn check_root_present(table: &ProcessTable, root_kind: &str) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    match table.get(ROOT_PID) {
        None => violations.push(InvariantViolation {
            invariant: "root_present",
            description: String::from("Root process 0 is missing"),
        }),
        Some(root) => {
            if root.kind != root_kind {
                violations.push(InvariantViolation {
                    invariant: "root_present",
                    description: format!(
                        "Root process has type {}, expected {}",
                        root.kind, root_kind
                    ),
                });
            }
            if let Some(parent) = root.parent {
                violations.push(InvariantViolation {
                    invariant: "root_present",
                    description: format!("Root process has parent {}", parent),
                });
            }
        }
    }

    violations
}

/// Invariant 2: descriptors are keyed by their own PID
fn check_descriptor_consistency(table: &ProcessTable) -> Vec<InvariantViolation> {
    table
        .pids()
        .into_iter()
        .filter_map(|key| {
            let descriptor = table.get(key)?;
            (descriptor.pid != key).then(|| InvariantViolation {
                invariant: "descriptor_consistency",
                description: format!("Slot {} holds descriptor for {}", key, descriptor.pid),
            })
        })
        .collect()
}

/// Invariant 3: every parent link names a tracked process
fn check_parent_tracked(table: &ProcessTable) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for descriptor in table.iter().filter(|d| !d.pid.is_root()) {
        match descriptor.parent {
            None => violations.push(InvariantViolation {
                invariant: "parent_tracked",
                description: format!("Process {} has no parent", descriptor.pid),
            }),
            Some(parent) if !table.contains(parent) => violations.push(InvariantViolation {
                invariant: "parent_tracked",
                description: format!(
                    "Process {} has untracked parent {}",
                    descriptor.pid, parent
                ),
            }),
            Some(_) => {}
        }
    }

    violations
}

/// Invariant 4: parent links never loop
fn check_acyclic_hierarchy(table: &ProcessTable) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for descriptor in table.iter().filter(|d| !d.pid.is_root()) {
        let mut current = descriptor.parent;
        let mut steps = 0usize;
        while let Some(pid) = current {
            if pid == descriptor.pid {
                violations.push(InvariantViolation {
                    invariant: "acyclic_hierarchy",
                    description: format!("Process {} is its own ancestor", descriptor.pid),
                });
                break;
            }
            steps += 1;
            if steps > table.len() {
                break;
            }
            current = table.get(pid).and_then(|d| d.parent);
        }
    }

    violations
}

/// Invariant 5: PIDs and the counter stay below the ceiling
fn check_pid_range(table: &ProcessTable) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for pid in table.pids() {
        if pid.0 >= table.ceiling() {
            violations.push(InvariantViolation {
                invariant: "pid_range",
                description: format!("Pid {} at or above ceiling {}", pid, table.ceiling()),
            });
        }
    }

    if table.next_pid() == 0 || table.next_pid() >= table.ceiling() {
        violations.push(InvariantViolation {
            invariant: "pid_range",
            description: format!(
                "Allocation counter {} outside 1..{}",
                table.next_pid(),
                table.ceiling()
            ),
        });
    }

    violations
}


#[cfg(kani)]
mod proofs {
    use super::*;
    use crate::types::Pid;
    use serde_json::Value;

    /// Proof: Allocation never hands out the root PID or a PID at or past
    /// the ceiling
    #[kani::proof]
    #[kani::unwind(6)]
    fn alloc_pid_stays_in_range() {
        let ceiling: u32 = kani::any();
        kani::assume(ceiling >= 2 && ceiling <= 5);
        let mut table = ProcessTable::with_root("init", ceiling);

        if let Ok(pid) = table.alloc_pid() {
            assert!(pid != ROOT_PID);
            assert!(pid.0 < ceiling);
        }
    }

    /// Proof: Inserting under the root keeps every invariant
    #[kani::proof]
    #[kani::unwind(5)]
    fn insert_maintains_invariants() {
        let mut table = ProcessTable::with_root("init", 4);

        let first = table.insert("worker", ROOT_PID, None, Value::Null);
        assert!(first.is_ok());
        if let Ok(parent) = first {
            let _ = table.insert("worker", parent, None, Value::Null);
        }

        assert!(check_all_invariants(&table, "init").is_empty());
        assert!(!table.contains(Pid(4)));
    }
}
