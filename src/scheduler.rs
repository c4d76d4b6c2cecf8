mod current_thread;
mod pool;
mod rayon_pool;

pub use current_thread::CurrentThreadScheduler;
pub use pool::PoolScheduler;
pub use rayon_pool::RayonScheduler;

use crate::sync::Arc;
use std::sync::Mutex;

/// A unit of work accepted by a [`Scheduler`].
pub type Job = Box<dyn FnOnce() + Send>;

/// Submission endpoint for producer callables.
///
/// A scheduler either runs the submitted job or enqueues it for later
/// execution; a job runs exactly once unless the scheduler is torn down
/// first. `submit` must be callable from arbitrary threads.
///
/// The graph core is scheduler-agnostic: a thread pool
/// ([`PoolScheduler`]), a caller-driven loop ([`CurrentThreadScheduler`]),
/// a rayon adapter ([`RayonScheduler`]) and user-provided implementations
/// may all be mixed within one dependency graph. Tasks hold their scheduler
/// through an `Arc`, so a scheduler outlives every task bound to it.
pub trait Scheduler: Send + Sync {
    /// Accepts a callable for execution.
    fn submit(&self, job: Job);
}

static DEFAULT_SCHEDULER: Mutex<Option<Arc<dyn Scheduler>>> = Mutex::new(None);

/// Installs the process-wide default scheduler.
///
/// The default is consulted by the `make` family
/// ([`make`](crate::task::make), [`make_and_start`](crate::task::make_and_start))
/// and by nothing else; `then` without an override always inherits the
/// parent's scheduler. Installing a new default only affects tasks
/// constructed afterwards.
pub fn set_default_scheduler(scheduler: Arc<dyn Scheduler>) {
    *DEFAULT_SCHEDULER.lock().expect("set_default_scheduler") = Some(scheduler);
}

/// Returns the process-wide default scheduler, if one was installed.
#[must_use]
pub fn default_scheduler() -> Option<Arc<dyn Scheduler>> {
    DEFAULT_SCHEDULER.lock().expect("default_scheduler").clone()
}

/// Resolves an optional explicit scheduler against the process-wide default.
///
/// # Panics
/// If neither an explicit scheduler nor a default is available. Omitting the
/// scheduler without installing a default is a contract violation.
pub(crate) fn resolve(scheduler: Option<Arc<dyn Scheduler>>) -> Arc<dyn Scheduler> {
    scheduler
        .or_else(default_scheduler)
        .expect("no scheduler given and no default scheduler installed")
}
