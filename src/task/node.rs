use crate::{
    future::Future,
    scheduler::Scheduler,
    sync::{Arc, AtomicBool, Mutex, Ordering},
};
use derive_more::Debug;
use tracing::trace;

pub(crate) type ProducerBox<T> = Box<dyn FnOnce() -> T + Send>;

/// Graph-internal node behind a [`Task`](crate::task::Task) handle.
///
/// Lifetime is governed by three additive retention roots, none of which
/// forms a cycle: live user handles, not-yet-fired parent-subscription
/// closures (which hold the child node strongly) and in-flight scheduler
/// submissions. The node is destroyed once all three are gone.
#[derive(Debug)]
pub(crate) struct TaskNode<T> {
    future: Future<T>,
    /// Taken (not merely borrowed) by the submission closure, so the
    /// producer and everything it captures are released as soon as it has
    /// run.
    #[debug(skip)]
    producer: Mutex<Option<ProducerBox<T>>>,
    #[debug(skip)]
    scheduler: Arc<dyn Scheduler>,
    #[debug(skip)]
    name: Mutex<String>,
    is_started: AtomicBool,
}

impl<T: Send + Sync + 'static> TaskNode<T> {
    /// A leaf: producer present, no parents, started explicitly.
    pub(crate) fn leaf(
        producer: impl FnOnce() -> T + Send + 'static,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            future: Future::new(),
            producer: Mutex::new(Some(Box::new(producer))),
            scheduler,
            name: Mutex::new(String::new()),
            is_started: AtomicBool::new(false),
        })
    }

    /// A composite before wiring: the producer thunk is installed
    /// afterwards, and the last completing parent starts the node.
    pub(crate) fn pending(scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            future: Future::new(),
            producer: Mutex::new(None),
            scheduler,
            name: Mutex::new(String::new()),
            is_started: AtomicBool::new(false),
        })
    }

    /// A proxy: no producer, born started so it is never submitted; its
    /// future is fed by an external forwarding chain.
    pub(crate) fn pre_started(scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            future: Future::new(),
            producer: Mutex::new(None),
            scheduler,
            name: Mutex::new(String::new()),
            is_started: AtomicBool::new(true),
        })
    }

    /// An already-Ready node lifting `value` into the graph.
    pub(crate) fn from_value(value: T, scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            future: Future::ready(value),
            producer: Mutex::new(None),
            scheduler,
            name: Mutex::new(String::new()),
            is_started: AtomicBool::new(true),
        })
    }

    pub(crate) fn install_producer(&self, producer: ProducerBox<T>) {
        let prev = self
            .producer
            .lock()
            .expect("TaskNode::install_producer")
            .replace(producer);
        assert!(prev.is_none(), "TaskNode: producer installed twice");
    }

    /// Submits the node to its scheduler.
    ///
    /// The submission closure holds the node strongly for the duration of
    /// dispatch and execution; when it runs it takes the producer, invokes
    /// it and publishes the result on the node's future.
    ///
    /// # Panics
    /// If the node was already started. The atomic swap doubles as the
    /// at-most-once-start guarantee under arbitrary interleavings.
    pub(crate) fn start(self: Arc<Self>) {
        let was_started = self.is_started.swap(true, Ordering::AcqRel);
        assert!(!was_started, "task started twice");
        trace!(task = %self.name(), "task submitted");
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.submit(Box::new(move || {
            let producer = self
                .producer
                .lock()
                .expect("TaskNode: producer")
                .take()
                .expect("TaskNode: started without a producer");
            self.future.set(producer());
        }));
    }

    pub(crate) fn future(&self) -> &Future<T> {
        &self.future
    }

    pub(crate) fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub(crate) fn name(&self) -> String {
        self.name.lock().expect("TaskNode::name").clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.lock().expect("TaskNode::set_name") = name;
    }
}
