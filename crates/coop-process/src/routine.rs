//! Hosting a coroutine runner inside a process
//!
//! [`RoutineThread`] lets a process multiplex many lightweight routines
//! over one kernel-scheduled thread. Each resumption runs one routine step;
//! when every routine is blocked on a future the thread sleeps instead of
//! spinning, and when the runner drains the process completes.
//!
//! Unless the process installs its own hook, an error raised inside a
//! routine faults the whole process on that resumption.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::RefCell;

use coop_async::{Routine, RoutineError, Runner};

use crate::error::Interrupt;
use crate::syscall::{Reply, Syscall};
use crate::thread::{Step, Thread};

/// Ticks to sleep while every routine is waiting
pub const DEFAULT_IDLE_SLEEP: u64 = 1;

/// A thread that drives a [`Runner`]
pub struct RoutineThread<T> {
    runner: Runner<T>,
    idle_sleep: u64,
    /// Routine errors not yet turned into a fault
    failures: Rc<RefCell<VecDeque<RoutineError>>>,
}

impl<T: Clone + 'static> RoutineThread<T> {
    /// Wrap an existing runner, replacing its error hook with one that
    /// faults the process
    pub fn new(mut runner: Runner<T>) -> Self {
        let failures = Rc::new(RefCell::new(VecDeque::new()));
        let sink = failures.clone();
        runner.set_error_hook(move |e| sink.borrow_mut().push_back(e));
        Self {
            runner,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            failures,
        }
    }

    /// Change how long the thread sleeps when nothing is ready
    pub fn with_idle_sleep(mut self, ticks: u64) -> Self {
        self.idle_sleep = ticks.max(1);
        self
    }

    /// Start another routine
    pub fn go<R>(&mut self, routine: R)
    where
        R: Routine<T> + 'static,
    {
        self.runner.go(routine);
    }

    /// Route routine errors to `hook` instead of faulting the process
    pub fn set_error_hook<F>(&mut self, hook: F)
    where
        F: FnMut(RoutineError) + 'static,
    {
        self.runner.set_error_hook(hook);
    }

    /// Number of live routines
    pub fn len(&self) -> usize {
        self.runner.len()
    }

    /// Whether all routines have finished
    pub fn is_empty(&self) -> bool {
        self.runner.is_empty()
    }
}

impl<T: Clone + 'static> Thread for RoutineThread<T> {
    fn resume(&mut self, _reply: Reply) -> Result<Step, Interrupt> {
        let progressed = self.runner.run();
        if let Some(error) = self.failures.borrow_mut().pop_front() {
            return Err(Interrupt::fault(alloc::format!("routine failed: {}", error)));
        }
        if progressed {
            return Ok(Step::Yield);
        }
        if self.runner.is_empty() {
            Ok(Step::Done)
        } else {
            Ok(Step::Syscall(Syscall::Sleep(self.idle_sleep)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use coop_async::{Future, Suspend};
    use core::cell::Cell;

    #[test]
    fn test_runs_then_completes() {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let mut thread = RoutineThread::new(Runner::<u32>::new());
        thread.go(move |_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            seen.set(seen.get() + 1);
            if seen.get() < 2 {
                Ok(Suspend::Yield)
            } else {
                Ok(Suspend::Return)
            }
        });

        assert_eq!(thread.resume(Reply::Start), Ok(Step::Yield));
        assert_eq!(thread.resume(Reply::Resumed), Ok(Step::Yield));
        assert_eq!(thread.resume(Reply::Resumed), Ok(Step::Done));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_routine_error_faults_process() {
        let mut thread = RoutineThread::new(Runner::<u32>::new());
        thread.go(|_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            Err(RoutineError::new("no path to W2N2"))
        });

        assert_eq!(
            thread.resume(Reply::Start),
            Err(Interrupt::fault("routine failed: no path to W2N2"))
        );
        assert!(thread.is_empty());
    }

    #[test]
    fn test_custom_hook_keeps_process_alive() {
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        let mut thread = RoutineThread::new(Runner::<u32>::new());
        thread.set_error_hook(move |_e| sink.set(sink.get() + 1));
        thread.go(|_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            Err(RoutineError::new("boom"))
        });

        assert_eq!(thread.resume(Reply::Start), Ok(Step::Yield));
        assert_eq!(thread.resume(Reply::Resumed), Ok(Step::Done));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_sleeps_while_blocked() {
        let (future, resolver) = Future::<u32>::pending();
        let mut awaited = false;
        let mut thread = RoutineThread::new(Runner::<u32>::new()).with_idle_sleep(5);
        thread.go(move |input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            if !awaited {
                awaited = true;
                return Ok(Suspend::Await(future.clone()));
            }
            assert_eq!(input, Some(9));
            Ok(Suspend::Return)
        });

        assert_eq!(thread.resume(Reply::Start), Ok(Step::Yield));
        assert_eq!(
            thread.resume(Reply::Resumed),
            Ok(Step::Syscall(Syscall::Sleep(5)))
        );

        resolver.resolve(9).unwrap();
        assert_eq!(thread.resume(Reply::Resumed), Ok(Step::Yield));
        assert_eq!(thread.resume(Reply::Resumed), Ok(Step::Done));
    }
}
