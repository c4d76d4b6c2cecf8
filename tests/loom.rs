#![allow(missing_docs)]
#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tpl::{
    future::Future,
    scheduler::{Job, Scheduler},
    task::Task,
};

/// Runs each job synchronously on the submitting thread, keeping the
/// modelled thread count small.
#[derive(Debug)]
struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn submit(&self, job: Job) {
        job();
    }
}

#[test]
fn loom_subscribe_and_set_deliver_exactly_once() {
    loom::model(|| {
        let future = Arc::new(Future::new());
        let fired = Arc::new(AtomicUsize::new(0));

        // One thread publishes, the other subscribes. Whichever order the
        // model explores, the listener must run exactly once with the final
        // value: either enqueued and drained by the setter, or run
        // synchronously by the subscriber after observing Ready.
        let setter = {
            let future = Arc::clone(&future);
            loom::thread::spawn(move || future.set(7u32))
        };
        let subscriber = {
            let future = Arc::clone(&future);
            let fired = Arc::clone(&fired);
            loom::thread::spawn(move || {
                future.subscribe(move |value| {
                    assert_eq!(*value, 7);
                    fired.fetch_add(1, Ordering::Relaxed);
                });
            })
        };
        setter.join().unwrap();
        subscriber.join().unwrap();

        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(*future.get(), 7);
    });
}

#[test]
fn loom_last_parent_starts_the_composite_exactly_once() {
    loom::model(|| {
        let scheduler: Arc<dyn Scheduler> = Arc::new(InlineScheduler);
        let runs = Arc::new(AtomicUsize::new(0));

        let left = Task::new(|| 1u32, Arc::clone(&scheduler));
        let right = Task::new(|| 2u32, Arc::clone(&scheduler));
        let child = {
            let runs = Arc::clone(&runs);
            Task::with_parents(
                move |l: Task<u32>, r: Task<u32>| {
                    // Whichever parent completed last, both values must be
                    // visible to the child's producer.
                    assert!(l.future().is_ready());
                    assert!(r.future().is_ready());
                    runs.fetch_add(1, Ordering::Relaxed);
                    l.future().get() + r.future().get()
                },
                Arc::clone(&scheduler),
                (left.clone(), right.clone()),
            )
        };

        let start_left = {
            let left = left.clone();
            loom::thread::spawn(move || left.start())
        };
        let start_right = {
            let right = right.clone();
            loom::thread::spawn(move || right.start())
        };
        start_left.join().unwrap();
        start_right.join().unwrap();

        assert_eq!(runs.load(Ordering::Relaxed), 1);
        assert_eq!(*child.future().get(), 3);
    });
}
