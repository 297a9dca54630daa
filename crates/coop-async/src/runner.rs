//! Coroutine runner
//!
//! A minimal, non-prioritized scheduler for ad-hoc background routines
//! ("go"-style spawning). Each routine is a step function: the runner resumes
//! it with the value it was last waiting for and the routine answers with a
//! [`Suspend`] telling the runner what to do next.
//!
//! # Routine States
//!
//! - **ready**: has input to consume (or nothing to wait for)
//! - **waiting**: parked on a [`Future`] that has not resolved yet
//!
//! A routine that was just resumed goes back to the *front* of the queue, so
//! among ready routines the most recently scheduled runs first. Callers must
//! not rely on this as a fairness guarantee.
//!
//! There is no cancellation: a routine stops by returning, by failing, or by
//! waiting on a Future that never resolves.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;
use core::fmt;

use crate::future::{Future, FutureError};

/// What a routine asks for after a step
pub enum Suspend<T> {
    /// Park until the future resolves, then resume with its value
    Await(Future<T>),
    /// Cooperative yield; resume again with no input
    Yield,
    /// Finished; drop the routine
    Return,
}

/// Error raised inside a routine.
///
/// Routed to the runner's error hook; the failing routine is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutineError {
    message: String,
}

impl RoutineError {
    /// Create an error with a human-readable message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RoutineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<FutureError> for RoutineError {
    fn from(e: FutureError) -> Self {
        Self::new(alloc::format!("{}", e))
    }
}

/// A resumable computation driven by [`Runner`].
///
/// `input` is the value of the future the routine last awaited, or `None` on
/// the first step and after a [`Suspend::Yield`].
pub trait Routine<T> {
    /// Run until the next suspension point
    fn resume(&mut self, input: Option<T>) -> Result<Suspend<T>, RoutineError>;
}

impl<T, F> Routine<T> for F
where
    F: FnMut(Option<T>) -> Result<Suspend<T>, RoutineError>,
{
    fn resume(&mut self, input: Option<T>) -> Result<Suspend<T>, RoutineError> {
        self(input)
    }
}

/// Readiness shared between a task and the future it waits on
struct Slot<T> {
    ready: bool,
    input: Option<T>,
}

struct Task<T> {
    body: Box<dyn Routine<T>>,
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Task<T> {
    fn is_ready(&self) -> bool {
        self.slot.borrow().ready
    }
}

type ErrorHook = Box<dyn FnMut(RoutineError)>;

/// Non-prioritized coroutine runner
pub struct Runner<T> {
    queue: VecDeque<Task<T>>,
    on_error: Option<ErrorHook>,
}

impl<T: Clone + 'static> Runner<T> {
    /// Create an empty runner. Routine errors are discarded until a hook is set.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            on_error: None,
        }
    }

    /// Install the hook that receives errors raised inside routines
    pub fn set_error_hook<F>(&mut self, hook: F)
    where
        F: FnMut(RoutineError) + 'static,
    {
        self.on_error = Some(Box::new(hook));
    }

    /// Spawn a routine. It is ready immediately and queued behind the others.
    pub fn go<R>(&mut self, routine: R)
    where
        R: Routine<T> + 'static,
    {
        self.queue.push_back(Task {
            body: Box::new(routine),
            slot: Rc::new(RefCell::new(Slot {
                ready: true,
                input: None,
            })),
        });
    }

    /// Run one step of one routine.
    ///
    /// Pops the head of the queue. A waiting routine is re-queued at the back
    /// and the return value reports whether any routine is ready. A ready
    /// routine is resumed with its pending input and `true` is returned.
    pub fn run(&mut self) -> bool {
        let Some(task) = self.queue.pop_front() else {
            return false;
        };

        if !task.is_ready() {
            self.queue.push_back(task);
            return self.has_ready();
        }

        let Task { mut body, slot } = task;
        let input = slot.borrow_mut().input.take();

        match body.resume(input) {
            Err(e) => {
                if let Some(hook) = self.on_error.as_mut() {
                    hook(e);
                }
                return true;
            }
            Ok(Suspend::Return) => return true,
            Ok(Suspend::Yield) => {}
            Ok(Suspend::Await(future)) => {
                slot.borrow_mut().ready = false;
                let waker = slot.clone();
                future.listen(move |value| {
                    let mut slot = waker.borrow_mut();
                    slot.input = Some(value);
                    slot.ready = true;
                });
            }
        }

        self.queue.push_front(Task { body, slot });
        true
    }

    /// Call [`Runner::run`] while it makes progress and `quota` stays positive.
    ///
    /// Returns the number of routine resumptions. Calls that only moved a
    /// waiting routine to the back are not counted.
    pub fn run_until<Q>(&mut self, quota: Q) -> usize
    where
        Q: Fn() -> f64,
    {
        let mut steps = 0;
        while quota() > 0.0 && self.has_ready() {
            let resumes = self.queue.front().map_or(false, Task::is_ready);
            if !self.run() {
                break;
            }
            if resumes {
                steps += 1;
            }
        }
        steps
    }

    /// Whether any routine can make progress now
    pub fn has_ready(&self) -> bool {
        self.queue.iter().any(Task::is_ready)
    }

    /// Number of live routines
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if every routine has finished
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T: Clone + 'static> Default for Runner<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    /// Routine that records its name and yields `steps` times
    fn yielder(
        name: &'static str,
        steps: u32,
        log: Rc<RefCell<Vec<&'static str>>>,
    ) -> impl Routine<u32> {
        let mut left = steps;
        move |_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            log.borrow_mut().push(name);
            if left == 0 {
                return Ok(Suspend::Return);
            }
            left -= 1;
            Ok(Suspend::Yield)
        }
    }

    // ========================================================================
    // Scheduling order
    // ========================================================================

    #[test]
    fn test_run_on_empty_runner() {
        let mut runner = Runner::<u32>::new();
        assert!(!runner.run());
        assert!(runner.is_empty());
    }

    #[test]
    fn test_resumed_routine_goes_to_front() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut runner = Runner::new();
        runner.go(yielder("a", 1, log.clone()));
        runner.go(yielder("b", 1, log.clone()));

        while runner.run() {}

        // "a" keeps the front until it finishes, then "b" runs
        assert_eq!(*log.borrow(), vec!["a", "a", "b", "b"]);
        assert!(runner.is_empty());
    }

    #[test]
    fn test_waiting_routine_is_skipped_until_resolved() {
        let (future, resolver) = Future::<u32>::pending();
        let got = Rc::new(Cell::new(0));
        let mut runner = Runner::new();

        let sink = got.clone();
        let mut awaited = Some(future);
        runner.go(move |input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            match input {
                None => {
                    let future = awaited
                        .take()
                        .ok_or_else(|| RoutineError::new("resumed twice"))?;
                    Ok(Suspend::Await(future))
                }
                Some(v) => {
                    sink.set(v);
                    Ok(Suspend::Return)
                }
            }
        });

        assert!(runner.run());
        assert!(!runner.has_ready());
        assert!(!runner.run());
        assert_eq!(runner.len(), 1);

        resolver.resolve(42).unwrap();
        assert!(runner.has_ready());
        assert!(runner.run());
        assert_eq!(got.get(), 42);
        assert!(runner.is_empty());
    }

    #[test]
    fn test_already_resolved_future_resumes_next_step() {
        let got = Rc::new(Cell::new(0));
        let mut runner = Runner::new();

        let sink = got.clone();
        runner.go(move |input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            match input {
                None => Ok(Suspend::Await(Future::resolved(7))),
                Some(v) => {
                    sink.set(v);
                    Ok(Suspend::Return)
                }
            }
        });

        assert!(runner.run());
        assert!(runner.has_ready());
        assert!(runner.run());
        assert_eq!(got.get(), 7);
    }

    // ========================================================================
    // Errors
    // ========================================================================

    #[test]
    fn test_error_routed_to_hook_and_routine_dropped() {
        let errors = Rc::new(RefCell::new(vec![]));
        let mut runner = Runner::<u32>::new();
        let sink = errors.clone();
        runner.set_error_hook(move |e| sink.borrow_mut().push(e));

        runner.go(|_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            Err(RoutineError::new("boom"))
        });
        let log = Rc::new(RefCell::new(vec![]));
        runner.go(yielder("ok", 0, log.clone()));

        while runner.run() {}

        assert_eq!(*errors.borrow(), vec![RoutineError::new("boom")]);
        assert_eq!(*log.borrow(), vec!["ok"]);
        assert!(runner.is_empty());
    }

    // ========================================================================
    // Channels between routines
    // ========================================================================

    #[test]
    fn test_producer_consumer_over_rendezvous_channel() {
        let chan = Channel::<u32>::rendezvous();
        let received = Rc::new(RefCell::new(vec![]));
        let mut runner = Runner::new();

        let tx = chan.clone();
        let mut next = 0u32;
        runner.go(move |_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            if next == 3 {
                return Ok(Suspend::Return);
            }
            next += 1;
            Ok(Suspend::Await(tx.send(next).then(|()| 0)))
        });

        let rx = chan.clone();
        let sink = received.clone();
        let mut started = false;
        runner.go(move |input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            if started {
                if let Some(v) = input {
                    sink.borrow_mut().push(v);
                }
            }
            started = true;
            if sink.borrow().len() == 3 {
                return Ok(Suspend::Return);
            }
            Ok(Suspend::Await(rx.get()))
        });

        let steps = runner.run_until(|| 1.0);
        assert!(steps > 0);
        assert_eq!(*received.borrow(), vec![1, 2, 3]);
        assert!(runner.is_empty());
    }

    #[test]
    fn test_run_until_counts_only_resumptions() {
        let (future, _resolver) = Future::<u32>::pending();
        let log = Rc::new(RefCell::new(vec![]));
        let mut runner = Runner::new();
        let mut parked = Some(future);
        runner.go(move |_input: Option<u32>| -> Result<Suspend<u32>, RoutineError> {
            match parked.take() {
                Some(future) => Ok(Suspend::Await(future)),
                None => Ok(Suspend::Return),
            }
        });
        assert!(runner.run());
        runner.go(yielder("b", 1, log.clone()));

        // The parked head is requeued once before "b" runs twice
        assert_eq!(runner.run_until(|| 1.0), 2);
        assert_eq!(*log.borrow(), vec!["b", "b"]);
        assert_eq!(runner.len(), 1);
    }

    #[test]
    fn test_run_until_stops_when_quota_spent() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut runner = Runner::new();
        runner.go(yielder("spin", 100, log.clone()));

        let budget = Cell::new(3.0);
        let steps = runner.run_until(|| {
            let left = budget.get();
            budget.set(left - 1.0);
            left
        });

        assert_eq!(steps, 3);
        assert_eq!(runner.len(), 1);
    }
}
