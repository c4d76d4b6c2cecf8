//! Task-parallel core: single-assignment futures, pluggable schedulers and
//! typed dependency graphs.
//!
//! This crate provides a small runtime for composing units of work
//! ("tasks") into dependency graphs that execute on pluggable schedulers.
//! It:
//! - Stores each task's result in a single-assignment [`future::Future`]
//!   cell with blocking waiters and one-shot fan-out listeners.
//! - Wires composites to their parents through per-parent subscriptions and
//!   an atomic pending-count, so the last parent to complete — whichever
//!   thread it runs on — is the sole starter of the child.
//! - Keeps every node alive exactly as long as some consumer can still need
//!   its value: user handles, pending parent subscriptions and in-flight
//!   scheduler submissions all extend the node's lifetime, without cycles.
//!
//! Key modules:
//! - `future`: the single-assignment cell, its wait/subscribe surface and
//!   the `WaitStatus` of a bounded wait.
//! - `scheduler`: the `Scheduler` trait, the bundled worker pool, the
//!   caller-driven loop scheduler, a rayon adapter and the process-wide
//!   default-scheduler hook.
//! - `task`: the `Task` handle, composite wiring over typed parent tuples,
//!   the `then` and `unwrap` combinators and the `make` family.
//!
//! Quick start:
//!
//! ```
//! use std::{num::NonZeroUsize, sync::Arc};
//! use tpl::{scheduler::PoolScheduler, task::Task};
//!
//! let pool = Arc::new(PoolScheduler::new(NonZeroUsize::new(2).unwrap()));
//!
//! let leaf = Task::new(|| 21, pool.clone());
//! let doubled = leaf.then(|t: Task<i32>| t.future().get() * 2);
//!
//! leaf.start();
//! assert_eq!(*doubled.future().get(), 42);
//! ```
//!
//! Leaves are started explicitly; composites (anything built over parents,
//! including `then` continuations) start themselves once every parent's
//! future is Ready, and each node is scheduled exactly once. Producers run
//! to completion on their scheduler and never block it on core locks.

/// The single-assignment result cell.
///
/// Defines `Future`, the `WaitStatus` returned by bounded waits and the
/// `ValueAlreadySet` error of the fallible setter. Listener callbacks run
/// either on the publishing thread or, when registered after publication,
/// synchronously on the registering thread.
pub mod future;
/// Schedulers: the submission trait and the bundled implementations.
///
/// Contains the worker-pool scheduler (FIFO queue, drained on drop), the
/// caller-driven `CurrentThreadScheduler` loop, the `RayonScheduler`
/// adapter and the process-wide default-scheduler hook consumed by the
/// `make` family.
pub mod scheduler;
mod sync;
/// Task handles and graph wiring.
///
/// Defines `Task`, composite construction over typed parent tuples
/// (`ParentSet` / `TaskFn`), the `then` and `unwrap` combinators and the
/// free `make` / `make_and_start` / `make_from_value` constructors.
pub mod task;
mod types;
