use crate::{
    sync::{AtomicBool, Condvar, Mutex, Ordering},
    types::SyncUnsafeCell,
};
use core::fmt;
use derive_more::Debug;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::trace;

#[cfg(not(feature = "loom"))]
use std::time::Duration;

/// Outcome of a bounded wait on a [`Future`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    /// The value was published within the allotted time.
    Ready,
    /// The timer expired first. The future is still empty and usable.
    Timeout,
}

/// Error returned by [`Future::try_set`] when the cell already holds a value.
///
/// Carries the rejected value back to the caller.
#[derive(Error)]
#[error("the future already holds a value")]
pub struct ValueAlreadySet<T>(
    /// The rejected value.
    pub T,
);

// Deliberately unconditional (the payload is not printed), so the error is
// usable with value types that are not `Debug` themselves.
impl<T> fmt::Debug for ValueAlreadySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueAlreadySet").finish_non_exhaustive()
    }
}

type Listener<T> = Box<dyn FnOnce(&T) + Send>;

/// A single-assignment cell with fan-out listeners.
///
/// The cell transitions Empty → Ready exactly once, via [`set`](Self::set)
/// or [`try_set`](Self::try_set). Consumers observe the value by blocking
/// ([`wait`](Self::wait), [`get`](Self::get)), by polling
/// ([`is_ready`](Self::is_ready), [`wait_for`](Self::wait_for)) or by
/// registering a one-shot callback ([`subscribe`](Self::subscribe)).
///
/// Every listener registered before the transition is invoked exactly once
/// with the final value, in registration order, by the thread that called
/// `set`; a listener registered after the transition is invoked synchronously
/// on the registering thread. Listeners must therefore be thread-agnostic.
/// No listener ever runs with the cell's lock held, so a listener may itself
/// subscribe further work or drop task handles.
///
/// Once Ready the stored value is immutable; [`get`](Self::get) hands out
/// plain shared references to it.
#[must_use]
#[derive(Debug)]
pub struct Future<T> {
    /// Written once, under the `listeners` mutex, before `is_set` is
    /// published with release ordering. Read freely after an acquire load
    /// of `is_set` observes `true`.
    #[debug(skip)]
    value: SyncUnsafeCell<Option<T>>,
    is_set: AtomicBool,
    #[debug(skip)]
    listeners: Mutex<VecDeque<Listener<T>>>,
    #[debug(skip)]
    has_value: Condvar,
}

impl<T> Future<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            value: SyncUnsafeCell::new(None),
            is_set: AtomicBool::new(false),
            listeners: Mutex::new(VecDeque::new()),
            has_value: Condvar::new(),
        }
    }

    /// Creates a cell that is already Ready with `value`.
    pub fn ready(value: T) -> Self {
        Self {
            value: SyncUnsafeCell::new(Some(value)),
            is_set: AtomicBool::new(true),
            listeners: Mutex::new(VecDeque::new()),
            has_value: Condvar::new(),
        }
    }

    /// Returns whether the value has been published. Non-blocking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.is_set.load(Ordering::Acquire)
    }

    /// Blocks the calling thread until the value is published.
    pub fn wait(&self) {
        if self.is_ready() {
            return;
        }
        let mut queue = self.listeners.lock().expect("Future::wait");
        while !self.is_set.load(Ordering::Relaxed) {
            queue = self.has_value.wait(queue).expect("Future::wait");
        }
    }

    /// Blocks for at most `timeout`.
    ///
    /// [`WaitStatus::Timeout`] is a status, not a failure: the future stays
    /// empty and a later [`set`](Self::set) still succeeds.
    #[cfg(not(feature = "loom"))]
    pub fn wait_for(&self, timeout: Duration) -> WaitStatus {
        if self.is_ready() {
            return WaitStatus::Ready;
        }
        let queue = self.listeners.lock().expect("Future::wait_for");
        let (_queue, result) = self
            .has_value
            .wait_timeout_while(queue, timeout, |_queue| {
                !self.is_set.load(Ordering::Relaxed)
            })
            .expect("Future::wait_for");
        if result.timed_out() {
            WaitStatus::Timeout
        } else {
            WaitStatus::Ready
        }
    }

    /// Waits for the value and returns a shared reference to it.
    ///
    /// For `Future<()>` this returns `&()` but still waits for publication.
    pub fn get(&self) -> &T {
        self.wait();
        // SAFETY: `wait` returned, so the ready flag was observed set.
        unsafe { self.value_unchecked() }
    }

    /// Publishes `value`, wakes every waiter and drains the listener queue
    /// in FIFO order.
    ///
    /// # Panics
    /// If the cell is already Ready. Use [`try_set`](Self::try_set) for the
    /// recoverable form.
    pub fn set(&self, value: T) {
        if self.try_set(value).is_err() {
            panic!("Future::set: the value was already set");
        }
    }

    /// Publishes `value` unless the cell is already Ready, in which case the
    /// rejected value is handed back.
    ///
    /// On success this behaves exactly like [`set`](Self::set): waiters are
    /// woken and pending listeners run on the calling thread, one at a time,
    /// with no lock held.
    pub fn try_set(&self, value: T) -> Result<(), ValueAlreadySet<T>> {
        {
            let queue = self.listeners.lock().expect("Future::try_set");
            if self.is_set.load(Ordering::Relaxed) {
                return Err(ValueAlreadySet(value));
            }
            // SAFETY: the ready flag is clear and we hold the queue mutex,
            // so no other thread accesses the cell concurrently.
            unsafe { *self.value.get() = Some(value) };
            self.is_set.store(true, Ordering::Release);
            drop(queue);
        }
        self.has_value.notify_all();
        trace!("future became ready");
        self.drain_listeners();
        Ok(())
    }

    /// Registers a one-shot callback invoked with the final value.
    ///
    /// If the cell is already Ready the callback runs synchronously on the
    /// calling thread; otherwise it is enqueued and later run by whichever
    /// thread publishes the value. The callback thread is unspecified and
    /// listeners must not assume either.
    pub fn subscribe(&self, listener: impl FnOnce(&T) + Send + 'static) {
        {
            let mut queue = self.listeners.lock().expect("Future::subscribe");
            if !self.is_set.load(Ordering::Relaxed) {
                queue.push_back(Box::new(listener));
                return;
            }
        }
        // Already Ready: invoke on the caller, with the lock released.
        // SAFETY: the ready flag was observed set under the mutex above.
        listener(unsafe { self.value_unchecked() });
    }

    /// Pops and invokes pending listeners one at a time, reacquiring the
    /// lock between invocations so listeners can register further work.
    fn drain_listeners(&self) {
        loop {
            let listener = {
                let mut queue = self.listeners.lock().expect("Future::drain_listeners");
                queue.pop_front()
            };
            let Some(listener) = listener else {
                break;
            };
            // SAFETY: draining only happens after publication.
            listener(unsafe { self.value_unchecked() });
        }
    }

    /// # Safety
    /// The ready flag must have been observed `true` with acquire ordering,
    /// or under the `listeners` mutex, before the call.
    unsafe fn value_unchecked(&self) -> &T {
        // SAFETY: after publication the cell is never written again, so a
        // shared reference is valid for as long as `self` is borrowed.
        unsafe { (*self.value.get()).as_ref() }.expect("Future: ready without a value")
    }
}

impl<T> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}
