use core::cell::UnsafeCell;
use derive_more::{Deref, DerefMut};

/// A minimal `UnsafeCell` wrapper that is `Sync` when the payload can cross
/// threads.
///
/// Used for single-writer slots whose exclusive/shared access phases are
/// separated by an acquire-release handoff elsewhere (a future's ready flag,
/// a dependency context's pending counter). The cell itself adds no
/// synchronization.
#[derive(Debug, Deref, DerefMut)]
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T>(UnsafeCell<T>);

// SAFETY: All access to the inner value is ordered by an external
// acquire-release protocol. `T: Send` because the value is written on one
// thread and dropped or consumed on another; `T: Sync` because shared
// references are handed out after publication.
unsafe impl<T: Send + Sync> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    pub(crate) fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }
}
