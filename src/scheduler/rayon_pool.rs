use crate::scheduler::{Job, Scheduler};

/// Adapter submitting jobs to the global rayon thread pool.
///
/// Useful when the surrounding application already runs on rayon and the
/// task graph should share its workers instead of owning a dedicated
/// [`PoolScheduler`](crate::scheduler::PoolScheduler). Jobs are handed to
/// [`rayon::spawn`] and therefore follow rayon's lifecycle: there is no
/// per-instance shutdown or drain.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonScheduler;

impl Scheduler for RayonScheduler {
    fn submit(&self, job: Job) {
        rayon::spawn(job);
    }
}
