//! Per-process persisted memory
//!
//! Each process owns one `ProcessMemory`: the immutable arguments it was
//! spawned with plus a JSON heap of named slots. The heap is part of the
//! persisted image, so anything written through a `MemoryHandle` survives
//! a reboot or a host restart once the kernel commits.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cell::RefCell;
use core::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Memory shared between the process table and the handles it has issued
pub type SharedMemory = Rc<RefCell<ProcessMemory>>;

/// Errors from typed memory access
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// Stored value could not be decoded into the requested type
    Decode(String),
    /// Value could not be encoded as JSON
    Encode(String),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::Decode(msg) => write!(f, "memory decode failed: {}", msg),
            MemoryError::Encode(msg) => write!(f, "memory encode failed: {}", msg),
        }
    }
}

/// Persisted state of one process
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessMemory {
    /// Spawn arguments
    #[serde(default)]
    pub args: Value,
    /// Named slots created via the `allocate` syscall
    #[serde(default)]
    pub heap: Map<String, Value>,
}

impl ProcessMemory {
    /// Fresh memory holding only the spawn arguments
    pub fn new(args: Value) -> Self {
        Self {
            args,
            heap: Map::new(),
        }
    }

    /// Wrap into the shared form stored by the table
    pub fn shared(self) -> SharedMemory {
        Rc::new(RefCell::new(self))
    }
}

/// Handle to one named heap slot of a process.
///
/// Cloning a handle yields another view of the same slot. Reads and writes
/// go straight to the table's copy of the memory.
#[derive(Clone)]
pub struct MemoryHandle {
    memory: SharedMemory,
    key: String,
}

impl MemoryHandle {
    /// Bind `key` in `memory`, initializing it to `default` if absent.
    ///
    /// An existing value is never overwritten.
    pub fn allocate(memory: &SharedMemory, key: &str, default: Value) -> Self {
        memory
            .borrow_mut()
            .heap
            .entry(key.to_string())
            .or_insert(default);
        Self {
            memory: memory.clone(),
            key: key.to_string(),
        }
    }

    /// Slot name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value (cloned); `Null` if the slot is empty
    pub fn get(&self) -> Value {
        self.memory
            .borrow()
            .heap
            .get(&self.key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Replace the value
    pub fn set(&self, value: Value) {
        self.memory.borrow_mut().heap.insert(self.key.clone(), value);
    }

    /// Mutate the value in place and return whatever `f` returns
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut memory = self.memory.borrow_mut();
        let slot = memory.heap.entry(self.key.clone()).or_insert(Value::Null);
        f(slot)
    }

    /// Decode the value into `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<T, MemoryError> {
        serde_json::from_value(self.get()).map_err(|e| MemoryError::Decode(format!("{}", e)))
    }

    /// Encode `value` and store it
    pub fn set_as<T: Serialize>(&self, value: &T) -> Result<(), MemoryError> {
        let encoded =
            serde_json::to_value(value).map_err(|e| MemoryError::Encode(format!("{}", e)))?;
        self.set(encoded);
        Ok(())
    }
}

impl fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHandle")
            .field("key", &self.key)
            .field("value", &self.get())
            .finish()
    }
}
