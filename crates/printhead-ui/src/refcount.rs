//! Mutex-guarded reference count that destroys its payload at zero.
//!
//! The count and the payload share one mutex. Reading the payload, adding a
//! reference and taking the payload for destruction all go through the
//! same acquisition strategy, so there is no second lock a caller could
//! block on.

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Where a counted resource is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Live,
    /// Count reached zero; the payload is being dropped.
    Destroying,
    Destroyed,
}

impl Lifecycle {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Live => 0,
            Self::Destroying => 1,
            Self::Destroyed => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Live,
            1 => Self::Destroying,
            _ => Self::Destroyed,
        }
    }
}

/// Strategy for taking the ref mutex.
pub trait RefMutexAcquire {
    fn obtain<'a, S>(&self, mutex: &'a Mutex<S>) -> MutexGuard<'a, S>;
}

/// Plain blocking acquisition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blocking;

impl RefMutexAcquire for Blocking {
    fn obtain<'a, S>(&self, mutex: &'a Mutex<S>) -> MutexGuard<'a, S> {
        mutex.lock()
    }
}

/// State guarded by the ref mutex.
#[derive(Debug)]
pub struct RefState<T> {
    count: usize,
    resource: Option<T>,
}

impl<T> RefState<T> {
    pub fn count(&self) -> usize {
        self.count
    }

    /// The payload, or `None` once destroyed.
    pub fn resource(&self) -> Option<&T> {
        self.resource.as_ref()
    }
}

/// A payload plus the count of references to it.
///
/// The count starts at one, owned by the creator. Dropping the last
/// reference drops the payload on the calling thread; the counter itself
/// stays around so late callers see [`Lifecycle::Destroyed`].
pub struct RefCount<T> {
    state: Mutex<RefState<T>>,
    lifecycle: AtomicU8,
}

impl<T> RefCount<T> {
    pub fn new(resource: T) -> Self {
        Self {
            state: Mutex::new(RefState {
                count: 1,
                resource: Some(resource),
            }),
            lifecycle: AtomicU8::new(Lifecycle::Live.to_u8()),
        }
    }

    /// The ref mutex. Supports `lock`, `try_lock` and `try_lock_for`.
    pub fn ref_mutex(&self) -> &Mutex<RefState<T>> {
        &self.state
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock().count
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle() == Lifecycle::Destroyed
    }

    pub fn add_ref(&self) {
        self.add_ref_with(&Blocking);
    }

    pub fn unref(&self) -> bool {
        self.unref_with(&Blocking)
    }

    /// Borrow the payload while holding the ref mutex, if it is still alive.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.with_using(&Blocking, f)
    }

    /// Increment the count, taking the mutex via `acquire`.
    pub fn add_ref_with(&self, acquire: &impl RefMutexAcquire) {
        let mut state = acquire.obtain(&self.state);
        if state.count == 0 {
            tracing::warn!("add_ref on a destroyed resource ignored");
            return;
        }
        state.count += 1;
    }

    /// Decrement the count, taking the mutex via `acquire`, and drop the
    /// payload if it reaches zero. Returns `true` if this call destroyed it.
    ///
    /// The payload is dropped after the mutex is released.
    pub fn unref_with(&self, acquire: &impl RefMutexAcquire) -> bool {
        let mut state = acquire.obtain(&self.state);
        match state.count {
            0 => {
                tracing::warn!("unref on a destroyed resource ignored");
                false
            }
            1 => {
                state.count = 0;
                let resource = state.resource.take();
                self.set_lifecycle(Lifecycle::Destroying);
                drop(state);
                drop(resource);
                self.set_lifecycle(Lifecycle::Destroyed);
                tracing::trace!("refcounted resource destroyed");
                true
            }
            _ => {
                state.count -= 1;
                false
            }
        }
    }

    /// Borrow the payload, taking the mutex via `acquire`.
    pub fn with_using<R>(
        &self,
        acquire: &impl RefMutexAcquire,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        acquire.obtain(&self.state).resource.as_ref().map(f)
    }

    /// Remove a still-live payload without running the count down. Used when
    /// the counter is going away while references remain outstanding.
    pub(crate) fn take_live(&mut self) -> Option<T> {
        self.state.get_mut().resource.take()
    }

    fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.lifecycle.store(lifecycle.to_u8(), Ordering::Release);
    }
}
