//! Tick-driven timers
//!
//! Lets routines hosted by a [`crate::Runner`] sleep by awaiting a Future
//! instead of calling into the kernel. The owner advances the clock once per
//! tick; every timer whose deadline has passed resolves, earliest first.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::mem;

use crate::future::{Future, Resolver};

/// A set of pending tick deadlines
pub struct Timers {
    now: u64,
    due: BTreeMap<u64, Vec<Resolver<()>>>,
}

impl Timers {
    /// Create a timer set whose clock starts at `now`
    pub fn new(now: u64) -> Self {
        Self {
            now,
            due: BTreeMap::new(),
        }
    }

    /// Current tick as last seen by [`Timers::advance`]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// A future that resolves once `ticks` ticks have elapsed.
    ///
    /// `after(0)` is already resolved.
    pub fn after(&mut self, ticks: u64) -> Future<()> {
        if ticks == 0 {
            return Future::resolved(());
        }
        let (future, resolver) = Future::pending();
        let deadline = self.now.saturating_add(ticks);
        self.due.entry(deadline).or_default().push(resolver);
        future
    }

    /// Move the clock to `tick` and resolve every timer that is due.
    ///
    /// The clock never moves backwards. Returns how many timers fired.
    pub fn advance(&mut self, tick: u64) -> usize {
        self.now = self.now.max(tick);

        let fired = match self.now.checked_add(1) {
            Some(after_now) => {
                let later = self.due.split_off(&after_now);
                mem::replace(&mut self.due, later)
            }
            None => mem::take(&mut self.due),
        };

        let mut count = 0;
        for (_, resolvers) in fired {
            for resolver in resolvers {
                let _ = resolver.resolve(());
                count += 1;
            }
        }
        count
    }

    /// Number of timers still pending
    pub fn pending(&self) -> usize {
        self.due.values().map(Vec::len).sum()
    }
}
