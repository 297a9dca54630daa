//! Single-assignment futures
//!
//! A [`Future`] holds either nothing yet or its final value. Resolution goes
//! through a separate [`Resolver`] handle and happens at most once. Listeners
//! run synchronously, in attachment order, on the resolving call's stack.
//! A listener attached after resolution runs immediately.
//!
//! These are not `core::future::Future`s: there is no polling and no waker.
//! They are driven by [`crate::Runner`] or by plain callbacks.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

type Listener<T> = Box<dyn FnOnce(T)>;

struct Inner<T> {
    value: Option<T>,
    listeners: Vec<Listener<T>>,
}

/// Errors from misusing a [`Resolver`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FutureError {
    /// The future already holds a value
    AlreadyResolved,
}

impl fmt::Display for FutureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureError::AlreadyResolved => write!(f, "future already resolved"),
        }
    }
}

/// An eventually-resolved value.
///
/// Cloning is cheap and yields another view of the same future.
pub struct Future<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

/// The write side of a [`Future`].
pub struct Resolver<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Future<T> {
    /// Create a future and hand its resolver to `executor`.
    ///
    /// `executor` runs synchronously, exactly once, before this returns. It
    /// may resolve right away or stash the resolver for later.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T>),
    {
        let (future, resolver) = Self::pending();
        executor(resolver);
        future
    }

    /// Create an unresolved future together with its resolver
    pub fn pending() -> (Self, Resolver<T>) {
        let inner = Rc::new(RefCell::new(Inner {
            value: None,
            listeners: Vec::new(),
        }));
        (
            Self {
                inner: inner.clone(),
            },
            Resolver { inner },
        )
    }

    /// Create an already-resolved future
    pub fn resolved(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: Some(value),
                listeners: Vec::new(),
            })),
        }
    }

    /// Whether a value is available
    pub fn is_resolved(&self) -> bool {
        self.inner.borrow().value.is_some()
    }

    /// The resolved value, if any
    pub fn value(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Chain a computation on the resolved value.
    ///
    /// If this future is already resolved, `f` runs now and the returned
    /// future is already resolved. Otherwise `f` is queued behind earlier
    /// listeners and the returned future resolves when `f` has run.
    pub fn then<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        let current = self.value();
        if let Some(value) = current {
            return Future::resolved(f(value));
        }

        let (next, resolver) = Future::pending();
        self.inner.borrow_mut().listeners.push(Box::new(move |value| {
            let _ = resolver.resolve(f(value));
        }));
        next
    }

    /// Chain a computation that itself produces a future.
    ///
    /// The returned future resolves with the inner future's value.
    pub fn then_future<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Future<U> + 'static,
    {
        let (next, resolver) = Future::pending();
        self.listen(move |value| {
            f(value).listen(move |inner| {
                let _ = resolver.resolve(inner);
            });
        });
        next
    }

    /// Attach a listener without producing a new future.
    pub fn listen<F>(&self, f: F)
    where
        F: FnOnce(T) + 'static,
    {
        let current = self.value();
        match current {
            Some(value) => f(value),
            None => self.inner.borrow_mut().listeners.push(Box::new(f)),
        }
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Resolve the future.
    ///
    /// Stores `value` and runs every listener attached so far, in order.
    /// Fails with [`FutureError::AlreadyResolved`] on any call after the first.
    #[must_use = "resolving twice is a bug; handle the error"]
    pub fn resolve(&self, value: T) -> Result<(), FutureError> {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if inner.value.is_some() {
                return Err(FutureError::AlreadyResolved);
            }
            inner.value = Some(value.clone());
            mem::take(&mut inner.listeners)
        };

        for listener in listeners {
            listener(value.clone());
        }
        Ok(())
    }

    /// Whether the future has been resolved (by this or another resolver)
    pub fn is_resolved(&self) -> bool {
        self.inner.borrow().value.is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        match &inner.value {
            Some(value) => f.debug_tuple("Future::Resolved").field(value).finish(),
            None => f
                .debug_struct("Future::Pending")
                .field("listeners", &inner.listeners.len())
                .finish(),
        }
    }
}
