//! Host abstraction layer for Coop OS
//!
//! The kernel never talks to its environment directly. Everything it needs
//! from the outside world goes through the [`Host`] trait:
//!
//! - **Clock**: the logical tick, advanced once per external invocation
//! - **CPU quota**: a live probe of how much budget is left for this tick
//! - **Debug output**: a line-oriented diagnostic sink
//! - **Durable storage**: one opaque text image that survives host restarts
//!
//! # Host Implementations
//!
//! - **WASM**: `coop-supervisor::WebHost`, backed by a JavaScript host object
//! - **Tests**: `coop-hal-mock::MockHost`, scripted clock and in-memory storage

#![no_std]

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// Host abstraction trait
///
/// Implementations are single-threaded: the kernel calls them from one
/// thread only and never re-enters.
pub trait Host {
    // === Clock ===

    /// Current logical tick.
    ///
    /// Must be non-decreasing across calls within one host lifetime. The
    /// kernel reads it once at the start of every `run()`.
    fn tick(&self) -> u64;

    // === CPU quota ===

    /// Remaining CPU budget for the current tick.
    ///
    /// The unit is host-defined (milliseconds on most hosts). Values `<= 0.0`
    /// mean the budget is spent. The kernel only consults this between
    /// process resumptions; it is advisory, never enforced.
    fn cpu_remaining(&self) -> f64;

    // === Debug ===

    /// Write a debug message to the platform's console/log
    ///
    /// On WASM: Uses `console.log()`
    fn debug_write(&self, msg: &str);

    // === Durable storage ===

    /// Load the persisted kernel image.
    ///
    /// # Returns
    /// * `Ok(Some(image))` - A previously stored image
    /// * `Ok(None)` - Nothing stored yet (first boot)
    /// * `Err(HostError)` - Storage could not be read
    fn load_image(&self) -> Result<Option<String>, HostError>;

    /// Replace the persisted kernel image.
    ///
    /// # Arguments
    /// * `image` - Serialized process table
    ///
    /// # Returns
    /// * `Ok(())` - Image stored
    /// * `Err(HostError::StorageFull)` - Image exceeds the host's limit
    /// * `Err(HostError)` - Storage could not be written
    fn store_image(&self, image: &str) -> Result<(), HostError>;
}

/// Host errors
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// Storage is not available on this host
    StorageUnavailable,
    /// Image exceeds the host's storage limit
    StorageFull,
    /// Host-specific failure
    Other(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::StorageUnavailable => write!(f, "storage unavailable"),
            HostError::StorageFull => write!(f, "storage full"),
            HostError::Other(msg) => write!(f, "host error: {}", msg),
        }
    }
}

impl<H: Host + ?Sized> Host for &H {
    fn tick(&self) -> u64 {
        (**self).tick()
    }

    fn cpu_remaining(&self) -> f64 {
        (**self).cpu_remaining()
    }

    fn debug_write(&self, msg: &str) {
        (**self).debug_write(msg)
    }

    fn load_image(&self) -> Result<Option<String>, HostError> {
        (**self).load_image()
    }

    fn store_image(&self, image: &str) -> Result<(), HostError> {
        (**self).store_image(image)
    }
}
