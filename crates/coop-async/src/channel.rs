//! Bounded and rendezvous channels
//!
//! A [`Channel`] pairs producers with consumers through [`Future`]s. Both
//! sides are served strictly FIFO.
//!
//! - `capacity == 0`: rendezvous. Every `send` stays pending until a `get`
//!   takes its value, and every `get` stays pending until a `send` arrives.
//! - `capacity == N`: up to N sent-but-unconsumed values are buffered and
//!   their sends resolve immediately. Further sends block until a `get`
//!   frees a slot.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::future::{Future, Resolver};

/// A value waiting to be consumed
struct Pending<T> {
    value: T,
    /// Present while the producer is still blocked
    unblock: Option<Resolver<()>>,
}

struct State<T> {
    capacity: usize,
    consumers: VecDeque<Resolver<T>>,
    producers: VecDeque<Pending<T>>,
}

/// A FIFO queue of values exchanged through futures.
///
/// Cloning yields another handle to the same channel.
pub struct Channel<T> {
    state: Rc<RefCell<State<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + 'static> Channel<T> {
    /// Create a channel buffering up to `capacity` unconsumed values
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                capacity,
                consumers: VecDeque::new(),
                producers: VecDeque::new(),
            })),
        }
    }

    /// Create a fully synchronous channel (`capacity == 0`)
    pub fn rendezvous() -> Self {
        Self::new(0)
    }

    /// Receive the next value.
    ///
    /// Resolves immediately if a value is waiting. Taking a value frees a
    /// buffer slot, which unblocks the oldest producer still waiting for one.
    pub fn get(&self) -> Future<T> {
        let (value, unblocked) = {
            let mut state = self.state.borrow_mut();
            let Some(head) = state.producers.pop_front() else {
                let (future, resolver) = Future::pending();
                state.consumers.push_back(resolver);
                return future;
            };

            let mut unblocked: Vec<Resolver<()>> = Vec::new();
            unblocked.extend(head.unblock);

            // The producer that just moved into the last buffer slot
            let capacity = state.capacity;
            if capacity > 0 {
                if let Some(next) = state.producers.get_mut(capacity - 1) {
                    unblocked.extend(next.unblock.take());
                }
            }
            (head.value, unblocked)
        };

        for resolver in unblocked {
            let _ = resolver.resolve(());
        }
        Future::resolved(value)
    }

    /// Send a value.
    ///
    /// Hands off directly to a waiting consumer if there is one; otherwise
    /// buffers it. The returned future resolves once the value has been
    /// accepted (immediately unless the buffer is full).
    pub fn send(&self, value: T) -> Future<()> {
        let consumer = {
            let mut state = self.state.borrow_mut();
            match state.consumers.pop_front() {
                Some(consumer) => consumer,
                None => {
                    if state.producers.len() < state.capacity {
                        state.producers.push_back(Pending {
                            value,
                            unblock: None,
                        });
                        return Future::resolved(());
                    }
                    let (future, resolver) = Future::pending();
                    state.producers.push_back(Pending {
                        value,
                        unblock: Some(resolver),
                    });
                    return future;
                }
            }
        };

        let _ = consumer.resolve(value);
        Future::resolved(())
    }

    /// Buffer bound
    pub fn capacity(&self) -> usize {
        self.state.borrow().capacity
    }

    /// Number of sent-but-unconsumed values (buffered and blocked)
    pub fn len(&self) -> usize {
        self.state.borrow().producers.len()
    }

    /// True if no value is waiting to be consumed
    pub fn is_empty(&self) -> bool {
        self.state.borrow().producers.is_empty()
    }

    /// Number of consumers waiting for a value
    pub fn waiting_consumers(&self) -> usize {
        self.state.borrow().consumers.len()
    }
}
