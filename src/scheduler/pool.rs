use crate::{
    scheduler::{Job, Scheduler},
    sync::{Arc, Condvar, Mutex, thread},
};
use core::num::NonZeroUsize;
use derive_more::Debug;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// The bundled worker-pool scheduler.
///
/// Owns a FIFO queue guarded by a mutex and a condition variable, plus a
/// fixed set of worker threads. Each worker pops one job, releases the lock
/// and invokes the job, so user code never runs under the scheduler's lock.
///
/// Dropping the pool signals shutdown, wakes every worker and joins them.
/// Work enqueued before the drop is still drained: workers only exit once
/// the shutdown flag is set *and* the queue is empty.
#[must_use]
#[derive(Debug)]
pub struct PoolScheduler {
    shared: Arc<PoolShared>,
    #[debug(skip)]
    workers: Vec<thread::JoinHandle<()>>,
}

#[derive(Debug)]
struct PoolShared {
    #[debug(skip)]
    queue: Mutex<JobQueue>,
    #[debug(skip)]
    has_work: Condvar,
}

struct JobQueue {
    jobs: VecDeque<Job>,
    is_shutdown: bool,
}

impl PoolScheduler {
    /// Creates a pool running `workers` worker threads.
    pub fn new(workers: NonZeroUsize) -> Self {
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(JobQueue {
                jobs: VecDeque::new(),
                is_shutdown: false,
            }),
            has_work: Condvar::new(),
        });
        let workers = (0..workers.get())
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.worker_routine())
            })
            .collect::<Vec<_>>();
        debug!(workers = workers.len(), "pool scheduler started");
        Self { shared, workers }
    }

    /// Number of worker threads owned by the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Default for PoolScheduler {
    /// Falls back to the machine's available parallelism.
    fn default() -> Self {
        let workers = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self::new(workers)
    }
}

impl Scheduler for PoolScheduler {
    fn submit(&self, job: Job) {
        {
            let mut queue = self.shared.queue.lock().expect("PoolScheduler::submit");
            queue.jobs.push_back(job);
        }
        self.shared.has_work.notify_one();
    }
}

impl Drop for PoolScheduler {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock().expect("PoolScheduler::drop");
            queue.is_shutdown = true;
        }
        self.shared.has_work.notify_all();
        for worker in self.workers.drain(..) {
            worker.join().expect("PoolScheduler: a worker thread panicked");
        }
        debug!("pool scheduler shut down");
    }
}

impl PoolShared {
    fn worker_routine(&self) {
        loop {
            let job = {
                let mut queue = self.queue.lock().expect("PoolScheduler: worker");
                loop {
                    if let Some(job) = queue.jobs.pop_front() {
                        break job;
                    }
                    if queue.is_shutdown {
                        trace!("pool worker exiting");
                        return;
                    }
                    queue = self.has_work.wait(queue).expect("PoolScheduler: worker");
                }
            };
            // The job runs with the queue lock released.
            job();
        }
    }
}
