//! Process table
//!
//! Owns every process descriptor and the PID allocator. The table is pure
//! data: it knows nothing about threads or schedulers, and it round-trips
//! through the persisted JSON image unchanged.
//!
//! # Persisted layout
//!
//! ```text
//! {
//!   "next_pid": 4,
//!   "processes": {
//!     "0": ["init", 0, null, null, {"args": {...}, "heap": {...}}],
//!     "3": ["worker", 3, 0, 120, {"args": {...}, "heap": {...}}]
//!   }
//! }
//! ```

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{MIN_PID_CEILING, ROOT_PID};
use crate::memory::{ProcessMemory, SharedMemory};
use crate::types::{ChildInfo, Pid, Priority};

/// Errors from process table operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableError {
    /// Every PID below the ceiling is in use
    PidsExhausted,
    /// Parent is not tracked by the table
    UnknownParent(Pid),
    /// Loaded image has no process at PID 0
    MissingRoot,
    /// Loaded image has a root of another type
    RootTypeMismatch {
        /// Configured root type
        expected: String,
        /// Type found at PID 0
        found: String,
    },
    /// Image could not be decoded or is internally inconsistent
    Corrupt(String),
    /// Image could not be encoded
    Encode(String),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::PidsExhausted => write!(f, "no free pid below the ceiling"),
            TableError::UnknownParent(pid) => write!(f, "parent {} is not tracked", pid),
            TableError::MissingRoot => write!(f, "root process missing"),
            TableError::RootTypeMismatch { expected, found } => {
                write!(f, "root process has type {}, expected {}", found, expected)
            }
            TableError::Corrupt(msg) => write!(f, "corrupt process table: {}", msg),
            TableError::Encode(msg) => write!(f, "process table encode failed: {}", msg),
        }
    }
}

/// One live process, as persisted
#[derive(Clone, Debug)]
pub struct Descriptor {
    /// Registered process type
    pub kind: String,
    /// Process ID
    pub pid: Pid,
    /// Creating process (`None` only for the root)
    pub parent: Option<Pid>,
    /// Explicit priority, `None` to inherit the scheduler default
    pub priority: Option<Priority>,
    /// Arguments and heap
    pub memory: SharedMemory,
}

impl Descriptor {
    /// Construction arguments (cloned)
    pub fn args(&self) -> Value {
        self.memory.borrow().args.clone()
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedDescriptor(String, Pid, Option<Pid>, Option<Priority>, ProcessMemory);

#[derive(Serialize, Deserialize)]
struct PersistedImage {
    next_pid: u32,
    processes: BTreeMap<Pid, PersistedDescriptor>,
}

/// Descriptor store plus wrapping PID allocator
#[derive(Debug)]
pub struct ProcessTable {
    processes: BTreeMap<Pid, Descriptor>,
    next_pid: u32,
    ceiling: u32,
}

impl ProcessTable {
    /// Empty table. PIDs will be drawn from `1..ceiling`.
    pub fn new(ceiling: u32) -> Self {
        Self {
            processes: BTreeMap::new(),
            next_pid: 1,
            ceiling: ceiling.max(MIN_PID_CEILING),
        }
    }

    /// Fresh table holding only a root process of type `root_kind`
    pub fn with_root(root_kind: &str, ceiling: u32) -> Self {
        let mut table = Self::new(ceiling);
        table.processes.insert(
            ROOT_PID,
            Descriptor {
                kind: root_kind.to_string(),
                pid: ROOT_PID,
                parent: None,
                priority: None,
                memory: ProcessMemory::new(Value::Null).shared(),
            },
        );
        table
    }

    /// PID ceiling (exclusive)
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Next PID the allocator will try
    pub fn next_pid(&self) -> u32 {
        self.next_pid
    }

    /// Number of tracked processes, root included
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Whether `pid` is tracked
    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Look up a descriptor
    pub fn get(&self, pid: Pid) -> Option<&Descriptor> {
        self.processes.get(&pid)
    }

    /// All descriptors in PID order
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.processes.values()
    }

    /// All PIDs in ascending order
    pub fn pids(&self) -> Vec<Pid> {
        self.processes.keys().copied().collect()
    }

    /// Type of the root process, if present
    pub fn root_kind(&self) -> Option<&str> {
        self.processes.get(&ROOT_PID).map(|d| d.kind.as_str())
    }

    /// Allocate the next free PID.
    ///
    /// The counter wraps from `ceiling - 1` back to 1, and PIDs still in the
    /// table are skipped.
    pub fn alloc_pid(&mut self) -> Result<Pid, TableError> {
        for _ in 1..self.ceiling {
            let candidate = Pid(self.next_pid);
            self.next_pid = if self.next_pid + 1 >= self.ceiling {
                1
            } else {
                self.next_pid + 1
            };
            if !self.processes.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(TableError::PidsExhausted)
    }

    /// Create a descriptor under `parent` and return its PID
    pub fn insert(
        &mut self,
        kind: &str,
        parent: Pid,
        priority: Option<Priority>,
        args: Value,
    ) -> Result<Pid, TableError> {
        if !self.processes.contains_key(&parent) {
            return Err(TableError::UnknownParent(parent));
        }
        let pid = self.alloc_pid()?;
        self.processes.insert(
            pid,
            Descriptor {
                kind: kind.to_string(),
                pid,
                parent: Some(parent),
                priority,
                memory: ProcessMemory::new(args).shared(),
            },
        );
        Ok(pid)
    }

    /// Remove a single descriptor (children are left alone)
    pub fn remove(&mut self, pid: Pid) -> Option<Descriptor> {
        self.processes.remove(&pid)
    }

    /// Set or clear the explicit priority of `pid`
    pub fn set_priority(&mut self, pid: Pid, priority: Option<Priority>) -> bool {
        match self.processes.get_mut(&pid) {
            Some(descriptor) => {
                descriptor.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Shared memory of `pid`
    pub fn memory(&self, pid: Pid) -> Option<SharedMemory> {
        self.processes.get(&pid).map(|d| d.memory.clone())
    }

    /// Direct children of `pid`, ascending
    pub fn children_of(&self, pid: Pid) -> Vec<Pid> {
        self.processes
            .values()
            .filter(|d| d.parent == Some(pid))
            .map(|d| d.pid)
            .collect()
    }

    /// Direct children of `pid` in the form the `children` syscall returns
    pub fn child_infos(&self, pid: Pid) -> BTreeMap<Pid, ChildInfo> {
        self.processes
            .values()
            .filter(|d| d.parent == Some(pid))
            .map(|d| {
                (
                    d.pid,
                    ChildInfo {
                        pid: d.pid,
                        kind: d.kind.clone(),
                        args: d.args(),
                        priority: d.priority,
                    },
                )
            })
            .collect()
    }

    /// Every transitive descendant of `pid`, parents before children
    pub fn descendants_of(&self, pid: Pid) -> Vec<Pid> {
        let mut out = Vec::new();
        let mut queue: VecDeque<Pid> = self.children_of(pid).into();
        let mut seen = BTreeSet::new();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            queue.extend(self.children_of(next));
        }
        out
    }

    /// Whether `ancestor` is reachable from `pid` by following parent links
    pub fn is_descendant(&self, pid: Pid, ancestor: Pid) -> bool {
        let mut current = self.processes.get(&pid).and_then(|d| d.parent);
        let mut steps = 0;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.processes.len() {
                return false;
            }
            current = self.processes.get(&p).and_then(|d| d.parent);
        }
        false
    }

    /// Drop every descriptor whose type fails `is_known` or whose parent
    /// chain does not reach the root. Returns the removed PIDs.
    pub fn prune(&mut self, is_known: impl Fn(&str) -> bool) -> Vec<Pid> {
        let mut removed = Vec::new();
        let unknown: Vec<Pid> = self
            .processes
            .values()
            .filter(|d| !d.pid.is_root() && !is_known(&d.kind))
            .map(|d| d.pid)
            .collect();
        for pid in unknown {
            if self.processes.remove(&pid).is_some() {
                removed.push(pid);
            }
        }

        // Anything left that no longer reaches the root is an orphan.
        let orphans: Vec<Pid> = self
            .processes
            .keys()
            .copied()
            .filter(|pid| !pid.is_root() && !self.is_descendant(*pid, ROOT_PID))
            .collect();
        for pid in orphans {
            if self.processes.remove(&pid).is_some() {
                removed.push(pid);
            }
        }
        removed
    }

    /// Encode the table in the persisted layout
    pub fn to_json(&self) -> Result<String, TableError> {
        let image = PersistedImage {
            next_pid: self.next_pid,
            processes: self
                .processes
                .iter()
                .map(|(pid, d)| {
                    (
                        *pid,
                        PersistedDescriptor(
                            d.kind.clone(),
                            d.pid,
                            d.parent,
                            d.priority,
                            d.memory.borrow().clone(),
                        ),
                    )
                })
                .collect(),
        };
        serde_json::to_string(&image).map_err(|e| TableError::Encode(format!("{}", e)))
    }

    /// Decode a persisted image and validate its root.
    ///
    /// Fails if the image is undecodable, a descriptor's key and PID
    /// disagree, or PID 0 is missing or not of type `root_kind`.
    pub fn from_json(json: &str, root_kind: &str, ceiling: u32) -> Result<Self, TableError> {
        let image: PersistedImage =
            serde_json::from_str(json).map_err(|e| TableError::Corrupt(format!("{}", e)))?;

        let mut table = Self::new(ceiling);
        for (key, PersistedDescriptor(kind, pid, parent, priority, memory)) in image.processes {
            if key != pid {
                return Err(TableError::Corrupt(format!(
                    "entry {} holds descriptor for pid {}",
                    key, pid
                )));
            }
            let parent = if pid.is_root() { None } else { parent };
            table.processes.insert(
                pid,
                Descriptor {
                    kind,
                    pid,
                    parent,
                    priority,
                    memory: memory.shared(),
                },
            );
        }

        match table.root_kind() {
            None => return Err(TableError::MissingRoot),
            Some(found) if found != root_kind => {
                return Err(TableError::RootTypeMismatch {
                    expected: root_kind.to_string(),
                    found: found.to_string(),
                })
            }
            Some(_) => {}
        }

        table.next_pid = if image.next_pid == 0 || image.next_pid >= table.ceiling {
            1
        } else {
            image.next_pid
        };
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> ProcessTable {
        ProcessTable::with_root("init", 50_000)
    }

    // ========================================================================
    // PID allocation
    // ========================================================================

    #[test]
    fn test_pids_are_sequential() {
        let mut t = table();
        let a = t.insert("worker", ROOT_PID, None, Value::Null).unwrap();
        let b = t.insert("worker", ROOT_PID, None, Value::Null).unwrap();
        assert_eq!(a, Pid(1));
        assert_eq!(b, Pid(2));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_pid_wraps_and_skips_live() {
        let mut t = ProcessTable::with_root("init", 4);
        let a = t.insert("w", ROOT_PID, None, Value::Null).unwrap();
        let b = t.insert("w", ROOT_PID, None, Value::Null).unwrap();
        let c = t.insert("w", ROOT_PID, None, Value::Null).unwrap();
        assert_eq!((a, b, c), (Pid(1), Pid(2), Pid(3)));

        assert_eq!(
            t.insert("w", ROOT_PID, None, Value::Null),
            Err(TableError::PidsExhausted)
        );

        t.remove(Pid(2));
        assert_eq!(t.insert("w", ROOT_PID, None, Value::Null), Ok(Pid(2)));
    }

    #[test]
    fn test_pid_never_allocates_root() {
        let mut t = ProcessTable::with_root("init", 3);
        for _ in 0..10 {
            let pid = t.alloc_pid().unwrap();
            assert!(!pid.is_root());
        }
    }

    #[test]
    fn test_insert_unknown_parent() {
        let mut t = table();
        assert_eq!(
            t.insert("w", Pid(9), None, Value::Null),
            Err(TableError::UnknownParent(Pid(9)))
        );
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    #[test]
    fn test_descendants() {
        let mut t = table();
        let a = t.insert("w", ROOT_PID, None, Value::Null).unwrap();
        let b = t.insert("w", a, None, Value::Null).unwrap();
        let c = t.insert("w", b, None, Value::Null).unwrap();
        let d = t.insert("w", ROOT_PID, None, Value::Null).unwrap();

        assert_eq!(t.children_of(ROOT_PID), alloc::vec![a, d]);
        assert_eq!(t.descendants_of(a), alloc::vec![b, c]);
        assert!(t.is_descendant(c, a));
        assert!(!t.is_descendant(d, a));
    }

    #[test]
    fn test_child_infos() {
        let mut t = table();
        let a = t
            .insert("w", ROOT_PID, Some(Priority(5)), json!({"room": "W1N1"}))
            .unwrap();

        let children = t.child_infos(ROOT_PID);
        let info = children.get(&a).unwrap();
        assert_eq!(info.kind, "w");
        assert_eq!(info.args, json!({"room": "W1N1"}));
        assert_eq!(info.priority, Some(Priority(5)));
    }

    #[test]
    fn test_prune_unknown_and_orphans() {
        let mut t = table();
        let a = t.insert("ghost", ROOT_PID, None, Value::Null).unwrap();
        let b = t.insert("w", a, None, Value::Null).unwrap();
        let c = t.insert("w", ROOT_PID, None, Value::Null).unwrap();

        let removed = t.prune(|kind| kind == "w");
        assert_eq!(removed, alloc::vec![a, b]);
        assert!(t.contains(c));
        assert!(t.contains(ROOT_PID));
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    #[test]
    fn test_json_layout() {
        let mut t = table();
        let pid = t
            .insert("worker", ROOT_PID, Some(Priority(120)), json!({"n": 1}))
            .unwrap();
        t.memory(pid)
            .unwrap()
            .borrow_mut()
            .heap
            .insert("count".to_string(), json!(3));

        let value: Value = serde_json::from_str(&t.to_json().unwrap()).unwrap();
        assert_eq!(value["next_pid"], 2);
        assert_eq!(
            value["processes"]["1"],
            json!(["worker", 1, 0, 120, {"args": {"n": 1}, "heap": {"count": 3}}])
        );
        assert_eq!(value["processes"]["0"][2], Value::Null);
    }

    #[test]
    fn test_json_round_trip_keeps_memory_and_counter() {
        let mut t = table();
        let pid = t.insert("worker", ROOT_PID, None, json!([1, 2])).unwrap();
        t.memory(pid)
            .unwrap()
            .borrow_mut()
            .heap
            .insert("k".to_string(), json!("v"));

        let loaded = ProcessTable::from_json(&t.to_json().unwrap(), "init", 50_000).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.next_pid(), 2);
        let d = loaded.get(pid).unwrap();
        assert_eq!(d.args(), json!([1, 2]));
        assert_eq!(d.memory.borrow().heap.get("k"), Some(&json!("v")));
        assert_eq!(d.parent, Some(ROOT_PID));
    }

    #[test]
    fn test_from_json_rejects_bad_root() {
        let t = ProcessTable::with_root("other", 100);
        let json = t.to_json().unwrap();

        assert!(matches!(
            ProcessTable::from_json(&json, "init", 100),
            Err(TableError::RootTypeMismatch { .. })
        ));
        assert_eq!(
            ProcessTable::from_json(r#"{"next_pid":1,"processes":{}}"#, "init", 100).unwrap_err(),
            TableError::MissingRoot
        );
        assert!(matches!(
            ProcessTable::from_json("not json", "init", 100),
            Err(TableError::Corrupt(_))
        ));
    }

    #[test]
    fn test_from_json_clamps_counter() {
        let json = r#"{"next_pid":900,"processes":{"0":["init",0,null,null,{"args":null,"heap":{}}]}}"#;
        let t = ProcessTable::from_json(json, "init", 100).unwrap();
        assert_eq!(t.next_pid(), 1);
    }
}
