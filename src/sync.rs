#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        sync::{
            Condvar, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        thread,
    };
    pub(crate) use std::sync::Arc;
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use std::{
        sync::{
            Arc, Condvar, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        thread,
    };
}

pub(crate) use imp::*;
