use crate::{
    sync::{Arc, AtomicUsize, Ordering},
    task::Task,
    types::SyncUnsafeCell,
};
use tracing::trace;

/// Adapter between a composite producer and the tuple of parent handles it
/// receives.
///
/// Implemented for closures whose argument list matches the parent tuple,
/// so the arity and parent types of a composite are checked at compile
/// time: a producer over parents `(Task<P1>, …, Task<Pn>)` must be a
/// `FnOnce(Task<P1>, …, Task<Pn>) -> T`.
pub trait TaskFn<P, T>: Send + 'static {
    /// Invokes the producer with the populated parent handles.
    fn call(self, parents: P) -> T;
}

impl<F, T> TaskFn<(), T> for F
where
    F: FnOnce() -> T + Send + 'static,
{
    fn call(self, (): ()) -> T {
        self()
    }
}

/// A statically typed list of parent handles accepted by composite task
/// constructors.
///
/// Implemented for `()` (no parents: a plain leaf) and for tuples of
/// [`Task`] handles of arity 1 through 8. A composite built over a
/// non-empty list subscribes one listener per parent; each listener holds
/// the parent and the child strongly, so user handles to either may be
/// dropped right after construction without stalling the graph. The
/// listener that decrements the pending count to zero is the sole starter
/// of the child.
pub trait ParentSet: Sized + Send + 'static {
    /// Number of parents in the set.
    const ARITY: usize;

    /// Installs `producer` into `child` and subscribes `child` to every
    /// parent in the set.
    #[doc(hidden)]
    fn wire<T, F>(self, child: &Task<T>, producer: F)
    where
        T: Send + Sync + 'static,
        F: TaskFn<Self, T>;
}

impl ParentSet for () {
    const ARITY: usize = 0;

    fn wire<T, F>(self, child: &Task<T>, producer: F)
    where
        T: Send + Sync + 'static,
        F: TaskFn<(), T>,
    {
        child
            .node()
            .install_producer(Box::new(move || producer.call(())));
    }
}

macro_rules! parent_set_impl {
    ($Ctx:ident, $arity:expr, $(($P:ident, $parent:ident, $slot:ident)),+) => {
        /// Dependency context of one composite: the pending-parent counter
        /// plus one single-writer slot per parent. Owned by the producer
        /// thunk and by each not-yet-fired subscription closure.
        struct $Ctx<$($P),+> {
            pending: AtomicUsize,
            $($slot: SyncUnsafeCell<Option<Task<$P>>>,)+
        }

        impl<F, T, $($P),+> TaskFn<($(Task<$P>,)+), T> for F
        where
            F: FnOnce($(Task<$P>),+) -> T + Send + 'static,
            $($P: Send + Sync + 'static,)+
        {
            fn call(self, ($($parent,)+): ($(Task<$P>,)+)) -> T {
                self($($parent),+)
            }
        }

        impl<$($P: Send + Sync + 'static),+> ParentSet for ($(Task<$P>,)+) {
            const ARITY: usize = $arity;

            fn wire<T, F>(self, child: &Task<T>, producer: F)
            where
                T: Send + Sync + 'static,
                F: TaskFn<Self, T>,
            {
                let ($($parent,)+) = self;
                let ctx = Arc::new($Ctx {
                    pending: AtomicUsize::new($arity),
                    $($slot: SyncUnsafeCell::new(None),)+
                });

                // The thunk owns the context, which keeps every parent
                // reachable until the producer has returned; thunk and
                // context are consumed together by execution.
                let thunk = {
                    let ctx = Arc::clone(&ctx);
                    move || {
                        // SAFETY: the node was started by the listener that
                        // decremented `pending` to zero with acquire
                        // ordering, after every slot had been written with
                        // release ordering; no listener touches the slots
                        // afterwards, so this is the sole remaining access.
                        let parents = ($(
                            unsafe { (*ctx.$slot.get()).take() }
                                .expect("composite parent slot is empty"),
                        )+);
                        producer.call(parents)
                    }
                };
                child.node().install_producer(Box::new(thunk));

                $({
                    let ctx = Arc::clone(&ctx);
                    let child = Arc::clone(child.node());
                    let parent = $parent.clone();
                    $parent.future().subscribe(move |_| {
                        // SAFETY: each slot is written exactly once, by its
                        // own one-shot listener, before the matching
                        // decrement publishes the write.
                        unsafe { *ctx.$slot.get() = Some(parent) };
                        if ctx.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                            trace!("last parent ready, starting composite");
                            child.start();
                        }
                    });
                })+
            }
        }
    };
}

parent_set_impl!(Deps1, 1, (P1, parent1, slot1));
parent_set_impl!(Deps2, 2, (P1, parent1, slot1), (P2, parent2, slot2));
parent_set_impl!(Deps3, 3, (P1, parent1, slot1), (P2, parent2, slot2), (P3, parent3, slot3));
parent_set_impl!(
    Deps4,
    4,
    (P1, parent1, slot1),
    (P2, parent2, slot2),
    (P3, parent3, slot3),
    (P4, parent4, slot4)
);
parent_set_impl!(
    Deps5,
    5,
    (P1, parent1, slot1),
    (P2, parent2, slot2),
    (P3, parent3, slot3),
    (P4, parent4, slot4),
    (P5, parent5, slot5)
);
parent_set_impl!(
    Deps6,
    6,
    (P1, parent1, slot1),
    (P2, parent2, slot2),
    (P3, parent3, slot3),
    (P4, parent4, slot4),
    (P5, parent5, slot5),
    (P6, parent6, slot6)
);
parent_set_impl!(
    Deps7,
    7,
    (P1, parent1, slot1),
    (P2, parent2, slot2),
    (P3, parent3, slot3),
    (P4, parent4, slot4),
    (P5, parent5, slot5),
    (P6, parent6, slot6),
    (P7, parent7, slot7)
);
parent_set_impl!(
    Deps8,
    8,
    (P1, parent1, slot1),
    (P2, parent2, slot2),
    (P3, parent3, slot3),
    (P4, parent4, slot4),
    (P5, parent5, slot5),
    (P6, parent6, slot6),
    (P7, parent7, slot7),
    (P8, parent8, slot8)
);
