//! Injected mapping from process type names to thread factories

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::ProcessError;
use crate::thread::{Thread, ThreadInit};

/// Builds a fresh thread for a descriptor
pub type Factory = Box<dyn Fn(&ThreadInit<'_>) -> Result<Box<dyn Thread>, ProcessError>>;

/// Registry of process types known to a kernel
#[derive(Default)]
pub struct ProcessRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ProcessRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `kind`, replacing any earlier registration
    pub fn register<F, T>(&mut self, kind: &str, factory: F) -> &mut Self
    where
        F: Fn(&ThreadInit<'_>) -> Result<T, ProcessError> + 'static,
        T: Thread + 'static,
    {
        let boxed: Factory = Box::new(move |init: &ThreadInit<'_>| {
            factory(init).map(|thread| Box::new(thread) as Box<dyn Thread>)
        });
        self.factories.insert(kind.to_string(), boxed);
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F, T>(mut self, kind: &str, factory: F) -> Self
    where
        F: Fn(&ThreadInit<'_>) -> Result<T, ProcessError> + 'static,
        T: Thread + 'static,
    {
        self.register(kind, factory);
        self
    }

    /// Whether `kind` is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered type names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a thread for `init.kind`
    pub fn instantiate(&self, init: &ThreadInit<'_>) -> Result<Box<dyn Thread>, ProcessError> {
        match self.factories.get(init.kind) {
            Some(factory) => factory(init),
            None => Err(ProcessError::new(format!(
                "unknown process type {}",
                init.kind
            ))),
        }
    }
}
