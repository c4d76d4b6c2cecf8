mod node;
mod parents;

pub use parents::{ParentSet, TaskFn};

use crate::{
    future::Future,
    scheduler::{self, Scheduler},
    sync::Arc,
    task::node::TaskNode,
};
use core::fmt;

/// A cheaply clonable strong handle to a node in the dependency graph.
///
/// Copies share the node's lifetime; the node itself stays alive while any
/// handle, any not-yet-fired parent subscription or any in-flight scheduler
/// submission still references it. Dropping every handle to a leaf that was
/// never started destroys the node and its producer — a legal
/// "cancelled before start". Dropping every handle to a composite whose
/// parents have not all fired does *not* destroy it: the pending listeners
/// keep it alive until it completes.
///
/// `Task::default()` is the distinguishable empty handle
/// ([`valid`](Self::valid) returns `false`); every other operation on an
/// empty handle panics.
///
/// A node is scheduled at most once. Leaves require an explicit
/// [`start`](Self::start); composites auto-start when their last parent's
/// future fires, and starting one manually is a contract violation caught
/// by the double-start check.
#[must_use]
pub struct Task<T> {
    node: Option<Arc<TaskNode<T>>>,
}

impl<T> Task<T> {
    /// The empty handle. Same as `Task::default()`.
    pub fn empty() -> Self {
        Self { node: None }
    }

    /// Whether the handle refers to a node.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.node.is_some()
    }

    pub(crate) fn from_node(node: Arc<TaskNode<T>>) -> Self {
        Self { node: Some(node) }
    }

    fn node(&self) -> &Arc<TaskNode<T>> {
        self.node
            .as_ref()
            .expect("Task: operation on an empty handle")
    }
}

impl<T: Send + Sync + 'static> Task<T> {
    /// Constructs a leaf from a producer and a scheduler binding.
    ///
    /// The node is not submitted yet; call [`start`](Self::start) exactly
    /// once.
    pub fn new(
        producer: impl FnOnce() -> T + Send + 'static,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::from_node(TaskNode::leaf(producer, scheduler))
    }

    /// Constructs a composite over `parents`.
    ///
    /// `producer` receives one handle per parent and runs only after every
    /// parent's future is Ready, so reading a parent value inside it never
    /// blocks. The composite auto-starts when the last parent fires; do not
    /// call [`start`](Self::start) on it. An empty `parents` list degrades
    /// to a leaf.
    pub fn with_parents<P, F>(producer: F, scheduler: Arc<dyn Scheduler>, parents: P) -> Self
    where
        P: ParentSet,
        F: TaskFn<P, T>,
    {
        let task = Self::from_node(TaskNode::pending(scheduler));
        parents.wire(&task, producer);
        task
    }

    /// Lifts a plain value into an already-Ready task.
    pub fn from_value(value: T, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_node(TaskNode::from_value(value, scheduler))
    }

    /// Submits the node to its scheduler.
    ///
    /// # Panics
    /// If the node was already started, is a composite that auto-started,
    /// or is a proxy / value-lifted node (those are born started).
    pub fn start(&self) {
        Arc::clone(self.node()).start();
    }

    /// The node's result cell.
    pub fn future(&self) -> &Future<T> {
        self.node().future()
    }

    /// The scheduler the node was bound to at construction.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        self.node().scheduler()
    }

    /// The node's debug name. Empty unless [`set_name`](Self::set_name) was
    /// called.
    #[must_use]
    pub fn name(&self) -> String {
        self.node().name()
    }

    /// Sets the node's debug name.
    pub fn set_name(&self, name: impl Into<String>) {
        self.node().set_name(name.into());
    }

    /// Chains a one-parent composite on `self`, inheriting `self`'s
    /// scheduler.
    pub fn then<U, F>(&self, continuation: F) -> Task<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(Task<T>) -> U + Send + 'static,
    {
        self.then_on(continuation, Arc::clone(self.scheduler()))
    }

    /// Chains a one-parent composite on `self`, bound to `scheduler`.
    pub fn then_on<U, F>(&self, continuation: F, scheduler: Arc<dyn Scheduler>) -> Task<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(Task<T>) -> U + Send + 'static,
    {
        Task::with_parents(continuation, scheduler, (self.clone(),))
    }
}

impl<U: Clone + Send + Sync + 'static> Task<Task<U>> {
    /// Flattens a task producing a task into a proxy task of the inner
    /// value type, bound to `self`'s scheduler.
    ///
    /// See [`unwrap_on`](Self::unwrap_on).
    pub fn unwrap(&self) -> Task<U> {
        self.unwrap_on(Arc::clone(self.scheduler()))
    }

    /// Flattens a task producing a task into a proxy task of the inner
    /// value type.
    ///
    /// The proxy's future becomes Ready with the inner task's value once
    /// both the outer and the inner future have fired; the value is
    /// forwarded by clone, hence the `U: Clone` bound (`U = ()` is fine).
    /// The proxy is never submitted to `scheduler`; the binding only
    /// determines what continuations chained on the proxy inherit. The
    /// subscription closures keep the proxy alive until the forwarding
    /// chain completes.
    pub fn unwrap_on(&self, scheduler: Arc<dyn Scheduler>) -> Task<U> {
        let proxy = TaskNode::pre_started(scheduler);
        let forward = Arc::clone(&proxy);
        self.future().subscribe(move |inner: &Task<U>| {
            let inner = inner.clone();
            inner.future().subscribe(move |value: &U| {
                forward.future().set(value.clone());
            });
        });
        Task::from_node(proxy)
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T> Default for Task<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => f
                .debug_struct("Task")
                .field("ready", &node.future().is_ready())
                .finish_non_exhaustive(),
            None => f.write_str("Task(empty)"),
        }
    }
}

/// Constructs a task over `parents`, resolving an omitted scheduler to the
/// process-wide default.
///
/// With `()` parents the result is a leaf (start it explicitly); with a
/// non-empty parent tuple it is an auto-starting composite.
///
/// # Panics
/// If `scheduler` is `None` and no default scheduler was installed.
pub fn make<T, P, F>(producer: F, scheduler: Option<Arc<dyn Scheduler>>, parents: P) -> Task<T>
where
    T: Send + Sync + 'static,
    P: ParentSet,
    F: TaskFn<P, T>,
{
    Task::with_parents(producer, scheduler::resolve(scheduler), parents)
}

/// Constructs a leaf and immediately starts it.
///
/// # Panics
/// If `scheduler` is `None` and no default scheduler was installed.
pub fn make_and_start<T, F>(producer: F, scheduler: Option<Arc<dyn Scheduler>>) -> Task<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let task = make(producer, scheduler, ());
    task.start();
    task
}

/// Lifts a plain value into an already-Ready task bound to `scheduler`.
pub fn make_from_value<T: Send + Sync + 'static>(
    value: T,
    scheduler: Arc<dyn Scheduler>,
) -> Task<T> {
    Task::from_value(value, scheduler)
}
