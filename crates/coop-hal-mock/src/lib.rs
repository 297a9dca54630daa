//! Mock host implementation for testing Coop OS
//!
//! This provides a mock implementation of the [`Host`] trait that can be used
//! for unit testing the kernel without a real platform.
//!
//! Every piece of state sits behind an `Rc`, so clones of a `MockHost` share
//! the same clock, CPU meter, storage and log. Tests keep one clone to drive
//! the clock and hand another to the kernel. Dropping the kernel and building
//! a new one over a clone simulates a full host restart.

#![no_std]
extern crate alloc;

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use coop_hal::{Host, HostError};

/// Default per-tick CPU budget
pub const DEFAULT_CPU_LIMIT: f64 = 100.0;

/// Shared CPU accounting for one simulated tick.
///
/// Test processes hold a clone and call [`CpuMeter::burn`] to model work.
/// Every probe through [`Host::cpu_remaining`] also costs `probe_cost`, so a
/// process that never burns still drains the budget eventually.
#[derive(Debug)]
pub struct CpuMeter {
    limit: Cell<f64>,
    used: Cell<f64>,
    probe_cost: Cell<f64>,
}

impl CpuMeter {
    fn new(limit: f64) -> Self {
        Self {
            limit: Cell::new(limit),
            used: Cell::new(0.0),
            probe_cost: Cell::new(0.01),
        }
    }

    /// Consume `cost` units of this tick's budget
    pub fn burn(&self, cost: f64) {
        self.used.set(self.used.get() + cost);
    }

    /// CPU used so far this tick
    pub fn used(&self) -> f64 {
        self.used.get()
    }

    /// Budget left this tick (does not count as a probe)
    pub fn remaining(&self) -> f64 {
        self.limit.get() - self.used.get()
    }

    fn reset(&self) {
        self.used.set(0.0);
    }
}

/// Mock host for unit testing
///
/// Provides a scripted tick clock, CPU meter, in-memory image storage and a
/// captured debug log.
#[derive(Clone, Debug)]
pub struct MockHost {
    /// Current tick
    tick: Rc<Cell<u64>>,
    /// CPU accounting
    cpu: Rc<CpuMeter>,
    /// Persisted image
    storage: Rc<RefCell<Option<String>>>,
    /// Number of successful stores
    store_count: Rc<Cell<usize>>,
    /// Fail storage writes when set
    storage_broken: Rc<Cell<bool>>,
    /// Captured debug messages
    debug_log: Rc<RefCell<Vec<String>>>,
}

impl MockHost {
    /// Create a new mock host at tick 0 with the default CPU limit
    pub fn new() -> Self {
        Self::with_cpu_limit(DEFAULT_CPU_LIMIT)
    }

    /// Create a mock host with a specific per-tick CPU limit
    pub fn with_cpu_limit(limit: f64) -> Self {
        Self {
            tick: Rc::new(Cell::new(0)),
            cpu: Rc::new(CpuMeter::new(limit)),
            storage: Rc::new(RefCell::new(None)),
            store_count: Rc::new(Cell::new(0)),
            storage_broken: Rc::new(Cell::new(false)),
            debug_log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Advance to the next tick and refill the CPU budget
    pub fn advance_tick(&self) -> u64 {
        self.tick.set(self.tick.get() + 1);
        self.cpu.reset();
        self.tick.get()
    }

    /// Jump to a specific tick and refill the CPU budget
    pub fn set_tick(&self, tick: u64) {
        self.tick.set(tick);
        self.cpu.reset();
    }

    /// Shared CPU meter (clone it into test processes)
    pub fn cpu(&self) -> Rc<CpuMeter> {
        self.cpu.clone()
    }

    /// Change the per-tick CPU limit
    pub fn set_cpu_limit(&self, limit: f64) {
        self.cpu.limit.set(limit);
    }

    /// Change the cost charged for each quota probe
    pub fn set_probe_cost(&self, cost: f64) {
        self.cpu.probe_cost.set(cost);
    }

    /// Currently stored image, if any
    pub fn stored_image(&self) -> Option<String> {
        self.storage.borrow().clone()
    }

    /// Overwrite the stored image (simulates external tampering)
    pub fn set_stored_image(&self, image: &str) {
        *self.storage.borrow_mut() = Some(image.to_string());
    }

    /// Number of successful `store_image` calls
    pub fn store_count(&self) -> usize {
        self.store_count.get()
    }

    /// Make subsequent storage writes fail
    pub fn break_storage(&self, broken: bool) {
        self.storage_broken.set(broken);
    }

    /// Get all captured debug messages
    pub fn get_debug_log(&self) -> Vec<String> {
        self.debug_log.borrow().clone()
    }

    /// Clear the debug log
    pub fn clear_debug_log(&self) {
        self.debug_log.borrow_mut().clear();
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        self.debug_log
            .borrow()
            .iter()
            .any(|msg| msg.contains(substr))
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MockHost {
    fn tick(&self) -> u64 {
        self.tick.get()
    }

    fn cpu_remaining(&self) -> f64 {
        let remaining = self.cpu.remaining();
        self.cpu.burn(self.cpu.probe_cost.get());
        remaining
    }

    fn debug_write(&self, msg: &str) {
        self.debug_log.borrow_mut().push(msg.to_string());
    }

    fn load_image(&self) -> Result<Option<String>, HostError> {
        Ok(self.storage.borrow().clone())
    }

    fn store_image(&self, image: &str) -> Result<(), HostError> {
        if self.storage_broken.get() {
            return Err(HostError::StorageUnavailable);
        }
        *self.storage.borrow_mut() = Some(image.to_string());
        self.store_count.set(self.store_count.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        let d = a - b;
        d < 1e-9 && d > -1e-9
    }

    #[test]
    fn test_advance_tick_refills_budget() {
        let host = MockHost::with_cpu_limit(10.0);
        host.cpu().burn(7.0);
        assert!(approx(host.cpu().remaining(), 3.0));

        assert_eq!(host.advance_tick(), 1);
        assert!(approx(host.cpu().remaining(), 10.0));
    }

    #[test]
    fn test_probe_charges_cost() {
        let host = MockHost::with_cpu_limit(1.0);
        host.set_probe_cost(0.5);

        assert!(host.cpu_remaining() > 0.0);
        assert!(host.cpu_remaining() > 0.0);
        assert!(host.cpu_remaining() <= 0.0);
    }

    #[test]
    fn test_clones_share_storage() {
        let host = MockHost::new();
        let other = host.clone();

        host.store_image("{}").unwrap();
        assert_eq!(other.load_image().unwrap().as_deref(), Some("{}"));
        assert_eq!(other.store_count(), 1);
    }

    #[test]
    fn test_broken_storage_rejects_writes() {
        let host = MockHost::new();
        host.break_storage(true);

        assert_eq!(host.store_image("{}"), Err(HostError::StorageUnavailable));
        assert_eq!(host.stored_image(), None);
    }

    #[test]
    fn test_debug_log_capture() {
        let host = MockHost::new();
        host.debug_write("[kernel] hello");

        assert!(host.has_log_containing("hello"));
        host.clear_debug_log();
        assert!(host.get_debug_log().is_empty());
    }
}
