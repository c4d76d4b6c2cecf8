#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

use std::{
    num::NonZeroUsize,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};
use tpl::{
    scheduler::{
        CurrentThreadScheduler, Job, PoolScheduler, Scheduler, default_scheduler,
        set_default_scheduler,
    },
    task::{Task, make, make_and_start, make_from_value},
};

fn pool(workers: usize) -> Arc<PoolScheduler> {
    Arc::new(PoolScheduler::new(NonZeroUsize::new(workers).unwrap()))
}

fn as_dyn(scheduler: &Arc<PoolScheduler>) -> Arc<dyn Scheduler> {
    Arc::clone(scheduler) as Arc<dyn Scheduler>
}

/// Counts submissions before forwarding them to an inner scheduler.
struct CountingScheduler {
    inner: Arc<dyn Scheduler>,
    submissions: AtomicUsize,
}

impl CountingScheduler {
    fn new(inner: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            submissions: AtomicUsize::new(0),
        })
    }

    fn submissions(&self) -> usize {
        self.submissions.load(Ordering::Relaxed)
    }
}

impl Scheduler for CountingScheduler {
    fn submit(&self, job: Job) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        self.inner.submit(job);
    }
}

#[test]
fn fan_in_fan_out_respects_dependencies_and_parallelism() {
    let pool = pool(8);
    let started = Instant::now();

    let a = Task::new(
        || {
            thread::sleep(Duration::from_millis(1000));
            1
        },
        as_dyn(&pool),
    );
    let b = Task::new(
        || {
            thread::sleep(Duration::from_millis(2000));
            3.4f32
        },
        as_dyn(&pool),
    );
    let c = Task::new(
        || {
            thread::sleep(Duration::from_millis(500));
        },
        as_dyn(&pool),
    );

    let d = Task::with_parents(
        |a: Task<i32>, b: Task<f32>, c: Task<()>| {
            assert!(a.future().is_ready());
            assert!(b.future().is_ready());
            assert!(c.future().is_ready());
            assert_eq!(*a.future().get(), 1);
            assert_eq!(*b.future().get(), 3.4);
            2
        },
        as_dyn(&pool),
        (a.clone(), b.clone(), c.clone()),
    );
    let e = d.then(|d: Task<i32>| {
        let value = *d.future().get();
        thread::sleep(Duration::from_millis(3000));
        value
    });

    a.start();
    b.start();
    c.start();

    assert_eq!(*e.future().get(), 2);
    let elapsed = started.elapsed();
    // The critical path is b (2000 ms) -> d -> e (3000 ms).
    assert!(elapsed >= Duration::from_millis(5000), "elapsed: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(8000), "elapsed: {elapsed:?}");
}

#[test]
fn composite_auto_starts_when_its_parents_complete() {
    let pool = pool(2);
    let left = Task::new(|| 2, as_dyn(&pool));
    let right = Task::new(|| 3, as_dyn(&pool));
    let sum = Task::with_parents(
        |l: Task<i32>, r: Task<i32>| l.future().get() + r.future().get(),
        as_dyn(&pool),
        (left.clone(), right.clone()),
    );
    // Only the leaves are started; the composite starts itself.
    left.start();
    right.start();
    assert_eq!(*sum.future().get(), 5);
}

#[test]
#[should_panic(expected = "task started twice")]
fn starting_a_completed_composite_is_a_contract_violation() {
    let pool = pool(2);
    let leaf = Task::new(|| 1, as_dyn(&pool));
    let next = leaf.then(|t: Task<i32>| *t.future().get());
    leaf.start();
    next.future().wait();
    next.start();
}

#[test]
fn unwrap_forwards_the_inner_value_without_submitting_the_proxy() {
    let pool = pool(4);
    let proxy_scheduler = CountingScheduler::new(as_dyn(&pool));

    let inner_scheduler = as_dyn(&pool);
    let outer = make_and_start(
        move || {
            make_and_start(
                || {
                    thread::sleep(Duration::from_millis(1000));
                    String::from("Hello from inner task")
                },
                Some(inner_scheduler),
            )
        },
        Some(as_dyn(&pool)),
    );

    let unwrapped = outer.unwrap_on(proxy_scheduler.clone());
    let result = unwrapped.then_on(
        |t: Task<String>| {
            assert_eq!(t.future().get(), "Hello from inner task");
            100
        },
        as_dyn(&pool),
    );

    assert_eq!(*result.future().get(), 100);
    assert_eq!(proxy_scheduler.submissions(), 0);
}

#[test]
fn unwrap_with_a_unit_inner_task() {
    let pool = pool(2);
    let inner_scheduler = as_dyn(&pool);
    let outer = make_and_start(
        move || make_and_start(|| (), Some(inner_scheduler)),
        Some(as_dyn(&pool)),
    );
    let unwrapped = outer.unwrap();
    unwrapped.future().wait();
    assert!(unwrapped.future().is_ready());
}

fn spawn_round(
    n: u32,
    scheduler: &Arc<CurrentThreadScheduler>,
    completed: &Arc<Mutex<Vec<Task<u32>>>>,
) {
    let left = Task::new(move || n, Arc::clone(scheduler) as Arc<dyn Scheduler>);
    let right = Task::new(move || n + 1, Arc::clone(scheduler) as Arc<dyn Scheduler>);
    let next_scheduler = Arc::clone(scheduler);
    let next_completed = Arc::clone(completed);
    let sum = Task::with_parents(
        move |l: Task<u32>, r: Task<u32>| {
            let total = l.future().get() + r.future().get();
            if n == 0 {
                next_scheduler.stop();
            } else {
                spawn_round(n - 1, &next_scheduler, &next_completed);
            }
            total
        },
        Arc::clone(scheduler) as Arc<dyn Scheduler>,
        (left.clone(), right.clone()),
    );
    completed.lock().unwrap().push(sum);
    left.start();
    right.start();
}

#[test]
fn recursive_re_enqueue_drives_the_loop_scheduler_to_completion() {
    let scheduler = Arc::new(CurrentThreadScheduler::new());
    let completed = Arc::new(Mutex::new(Vec::new()));
    spawn_round(4, &scheduler, &completed);
    scheduler.run();

    let completed = completed.lock().unwrap();
    assert_eq!(completed.len(), 5);
    for task in completed.iter() {
        assert!(task.future().is_ready());
    }
    assert_eq!(*completed[0].future().get(), 4 + 5);
    assert_eq!(*completed[4].future().get(), 0 + 1);
}

#[test]
fn every_shared_child_runs_exactly_once_under_contention() {
    let pool = pool(8);
    let left = Task::new(|| 1u64, as_dyn(&pool));
    let right = Task::new(|| 2u64, as_dyn(&pool));
    let runs = Arc::new(AtomicUsize::new(0));
    let children: Vec<Task<u64>> = (0..64)
        .map(|_| {
            let runs = Arc::clone(&runs);
            Task::with_parents(
                move |l: Task<u64>, r: Task<u64>| {
                    assert!(l.future().is_ready());
                    assert!(r.future().is_ready());
                    runs.fetch_add(1, Ordering::Relaxed);
                    l.future().get() + r.future().get()
                },
                as_dyn(&pool),
                (left.clone(), right.clone()),
            )
        })
        .collect();

    let start_left = {
        let left = left.clone();
        thread::spawn(move || left.start())
    };
    let start_right = {
        let right = right.clone();
        thread::spawn(move || right.start())
    };
    start_left.join().unwrap();
    start_right.join().unwrap();

    for child in &children {
        assert_eq!(*child.future().get(), 3);
    }
    assert_eq!(runs.load(Ordering::Relaxed), 64);
}

#[test]
fn parents_stay_alive_through_pending_subscriptions() {
    let pool = pool(2);
    let combined = {
        let left = Task::new(
            || {
                thread::sleep(Duration::from_millis(100));
                10
            },
            as_dyn(&pool),
        );
        let right = Task::new(|| 20, as_dyn(&pool));
        let combined = Task::with_parents(
            |l: Task<i32>, r: Task<i32>| l.future().get() + r.future().get(),
            as_dyn(&pool),
            (left.clone(), right.clone()),
        );
        left.start();
        right.start();
        combined
        // Both parent handles are dropped here; the subscription closures
        // keep the parents alive until the composite has read them.
    };
    assert_eq!(*combined.future().get(), 30);
}

#[test]
fn a_composite_survives_dropping_its_own_handle() {
    let pool = pool(2);
    let ran = Arc::new(AtomicUsize::new(0));
    let leaf = Task::new(|| 1, as_dyn(&pool));
    {
        let ran = Arc::clone(&ran);
        let _detached = leaf.then(move |_: Task<i32>| {
            ran.fetch_add(1, Ordering::Relaxed);
        });
        // The only handle to the continuation is dropped before the parent
        // starts; the parent's pending listener keeps the node alive.
    }
    leaf.start();
    leaf.future().wait();

    let deadline = Instant::now() + Duration::from_secs(1);
    while ran.load(Ordering::Relaxed) == 0 {
        assert!(Instant::now() < deadline, "detached composite never ran");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn dropping_an_unstarted_leaf_destroys_its_producer() {
    let pool = pool(1);
    let sentinel = Arc::new(());
    let weak = Arc::downgrade(&sentinel);
    let task = Task::new(
        move || {
            let _keep = sentinel;
            1
        },
        as_dyn(&pool),
    );
    drop(task);
    assert!(weak.upgrade().is_none());
}

#[test]
fn nodes_are_destroyed_after_completion_and_handle_drop() {
    let pool = pool(2);
    let payload = Arc::new(());
    let weak = Arc::downgrade(&payload);
    let task = Task::new(move || payload, as_dyn(&pool));
    task.start();
    task.future().wait();
    drop(task);

    // The submission closure may hold the node for a moment after the
    // future fires.
    let deadline = Instant::now() + Duration::from_secs(1);
    while weak.upgrade().is_some() {
        assert!(Instant::now() < deadline, "task value leaked");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn then_inherits_the_parent_scheduler_unless_overridden() {
    let pool = pool(2);
    let parent_scheduler = CountingScheduler::new(as_dyn(&pool));
    let other_scheduler = CountingScheduler::new(as_dyn(&pool));

    let leaf = Task::new(|| 1, parent_scheduler.clone());
    let inherited = leaf.then(|t: Task<i32>| *t.future().get() + 1);
    let overridden = leaf.then_on(|t: Task<i32>| *t.future().get() + 2, other_scheduler.clone());

    leaf.start();
    assert_eq!(*inherited.future().get(), 2);
    assert_eq!(*overridden.future().get(), 3);
    assert_eq!(parent_scheduler.submissions(), 2);
    assert_eq!(other_scheduler.submissions(), 1);
}

#[test]
fn make_from_value_is_ready_immediately() {
    let pool = pool(1);
    let lifted = make_from_value(7, as_dyn(&pool));
    assert!(lifted.future().is_ready());
    assert_eq!(*lifted.future().get(), 7);

    let incremented = lifted.then(|t: Task<i32>| t.future().get() + 1);
    assert_eq!(*incremented.future().get(), 8);
}

#[test]
#[should_panic(expected = "task started twice")]
fn starting_a_value_lifted_task_is_a_contract_violation() {
    let pool = pool(1);
    let lifted = make_from_value(1, as_dyn(&pool));
    lifted.start();
}

#[test]
fn default_handles_are_empty_and_distinguishable() {
    let empty: Task<i32> = Task::default();
    assert!(!empty.valid());

    let pool = pool(1);
    let real = Task::new(|| 1, as_dyn(&pool));
    assert!(real.valid());
}

#[test]
#[should_panic(expected = "empty handle")]
fn operations_on_an_empty_handle_panic() {
    let task: Task<i32> = Task::empty();
    task.start();
}

#[test]
fn names_default_to_empty_and_are_settable() {
    let pool = pool(1);
    let task = Task::new(|| 0, as_dyn(&pool));
    assert_eq!(task.name(), "");
    task.set_name("stage-one");
    assert_eq!(task.name(), "stage-one");
}

#[test]
fn make_family_uses_the_installed_default_scheduler() {
    let pool = pool(2);
    set_default_scheduler(as_dyn(&pool));
    assert!(default_scheduler().is_some());

    let leaf = make_and_start(|| 5, None);
    let doubled = make(|t: Task<i32>| t.future().get() * 2, None, (leaf.clone(),));
    assert_eq!(*doubled.future().get(), 10);
}

#[test]
fn eight_parents_fan_in() {
    let pool = pool(4);
    let leaves: Vec<Task<u32>> = (0..8u32)
        .map(|i| Task::new(move || i, as_dyn(&pool)))
        .collect();
    let total = Task::with_parents(
        |p1: Task<u32>,
         p2: Task<u32>,
         p3: Task<u32>,
         p4: Task<u32>,
         p5: Task<u32>,
         p6: Task<u32>,
         p7: Task<u32>,
         p8: Task<u32>| {
            p1.future().get()
                + p2.future().get()
                + p3.future().get()
                + p4.future().get()
                + p5.future().get()
                + p6.future().get()
                + p7.future().get()
                + p8.future().get()
        },
        as_dyn(&pool),
        (
            leaves[0].clone(),
            leaves[1].clone(),
            leaves[2].clone(),
            leaves[3].clone(),
            leaves[4].clone(),
            leaves[5].clone(),
            leaves[6].clone(),
            leaves[7].clone(),
        ),
    );
    for leaf in &leaves {
        leaf.start();
    }
    assert_eq!(*total.future().get(), 28);
}
