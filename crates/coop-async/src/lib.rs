//! Coop OS cooperative concurrency runtime
//!
//! Single-threaded building blocks for application code layered above the
//! kernel. Nothing here is `Send`: every value lives on the one thread that
//! drives the kernel.
//!
//! # Module Organization
//!
//! - `future` - Single-assignment [`Future`] with synchronous callback chaining
//! - `channel` - Bounded / rendezvous [`Channel`] built on Futures
//! - `runner` - [`Runner`], a non-prioritized coroutine scheduler ("go"-style)
//! - `timer` - [`Timers`], tick-driven Futures for sleeping inside routines
//!
//! # Suspension Contract
//!
//! A routine suspends by returning [`Suspend::Await`] with a Future. The
//! runner parks it until that Future resolves and then resumes it with the
//! resolved value. This is the only blocking mechanism: channel I/O and timed
//! sleeps are both expressed as Futures.

#![no_std]
extern crate alloc;

pub mod channel;
pub mod future;
pub mod runner;
pub mod timer;

pub use channel::Channel;
pub use future::{Future, FutureError, Resolver};
pub use runner::{Routine, RoutineError, Runner, Suspend};
pub use timer::Timers;
