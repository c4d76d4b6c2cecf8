use crate::{
    scheduler::{Job, Scheduler},
    sync::{Condvar, Mutex},
};
use derive_more::Debug;
use std::collections::VecDeque;
use tracing::debug;

/// A scheduler driven from the caller's thread.
///
/// [`submit`](Scheduler::submit) only enqueues; nothing runs until some
/// thread calls [`run`](Self::run), which dequeues and invokes jobs serially
/// on itself. [`stop`](Self::stop) may be called from any thread, including
/// from inside a running job: `run` returns once the stop signal is set and
/// the queue has drained.
///
/// The stop signal is sticky. A later `run` call drains whatever was
/// enqueued in the meantime and returns immediately afterwards.
#[must_use]
#[derive(Debug)]
pub struct CurrentThreadScheduler {
    #[debug(skip)]
    state: Mutex<LoopState>,
    #[debug(skip)]
    wake: Condvar,
}

struct LoopState {
    jobs: VecDeque<Job>,
    stop_requested: bool,
}

impl CurrentThreadScheduler {
    /// Creates an empty, not-yet-stopped scheduler.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoopState {
                jobs: VecDeque::new(),
                stop_requested: false,
            }),
            wake: Condvar::new(),
        }
    }

    /// Runs queued jobs on the calling thread until [`stop`](Self::stop)
    /// has been signalled and the queue is empty.
    pub fn run(&self) {
        loop {
            let job = {
                let mut state = self.state.lock().expect("CurrentThreadScheduler::run");
                loop {
                    if let Some(job) = state.jobs.pop_front() {
                        break Some(job);
                    }
                    if state.stop_requested {
                        break None;
                    }
                    state = self.wake.wait(state).expect("CurrentThreadScheduler::run");
                }
            };
            let Some(job) = job else {
                return;
            };
            // The job runs with the queue lock released.
            job();
        }
    }

    /// Signals the loop to exit once the queue becomes empty.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().expect("CurrentThreadScheduler::stop");
            state.stop_requested = true;
        }
        self.wake.notify_all();
        debug!("loop scheduler stop requested");
    }
}

impl Default for CurrentThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for CurrentThreadScheduler {
    fn submit(&self, job: Job) {
        {
            let mut state = self.state.lock().expect("CurrentThreadScheduler::submit");
            state.jobs.push_back(job);
        }
        self.wake.notify_one();
    }
}
