//! UI-safe reference counting.
//!
//! A [`UiSafeRefCount`] differs from a plain [`RefCount`] in two ways:
//!
//! 1. When the home thread finds the ref mutex held (typically by a worker
//!    that is itself waiting on loop work), it turns the event loop instead
//!    of blocking, so the worker can make progress and release.
//! 2. An unref from any other thread is handed to the home loop as a task.
//!    Dropping the payload therefore only ever happens on the home thread.
//!    The same holds when the last handle goes away on a worker while
//!    references are still outstanding: the payload is sent home to drop.
//!
//! ```text
//!   worker: unref() ──schedule──▶ [home loop] ──▶ RefCount::unref_with ──▶ drop(T)
//!   home:   unref() ─────────────────────────────▶ RefCount::unref_with ──▶ drop(T)
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use crate::config::LoopConfig;
use crate::event_loop::EventLoop;
use crate::refcount::{Blocking, Lifecycle, RefCount, RefMutexAcquire, RefState};
use crate::thread_identity::{OsThreadIdentity, ThreadIdentity};

/// Acquisition that turns an event loop between failed `try_lock`s.
///
/// Waits indefinitely; only the loop's owning thread should use it.
pub struct LoopYielding<'a> {
    pub event_loop: &'a dyn EventLoop,
}

impl RefMutexAcquire for LoopYielding<'_> {
    fn obtain<'m, S>(&self, mutex: &'m Mutex<S>) -> MutexGuard<'m, S> {
        loop {
            if let Some(guard) = mutex.try_lock() {
                return guard;
            }
            self.event_loop.run_one_iteration(true);
        }
    }
}

struct Shared<T: Send + 'static> {
    base: RefCount<T>,
    home: ThreadId,
    identity: Arc<dyn ThreadIdentity>,
    event_loop: Arc<dyn EventLoop>,
    defer_delay: Duration,
}

impl<T: Send + 'static> Shared<T> {
    fn on_home_thread(&self) -> bool {
        self.identity.current() == self.home
    }
}

impl<T: Send + 'static> RefMutexAcquire for Shared<T> {
    fn obtain<'m, S>(&self, mutex: &'m Mutex<S>) -> MutexGuard<'m, S> {
        if self.on_home_thread() {
            LoopYielding {
                event_loop: &*self.event_loop,
            }
            .obtain(mutex)
        } else {
            Blocking.obtain(mutex)
        }
    }
}

impl<T: Send + 'static> Drop for Shared<T> {
    fn drop(&mut self) {
        if self.on_home_thread() {
            return;
        }
        let Some(resource) = self.base.take_live() else {
            return;
        };

        tracing::debug!(
            home = ?self.home,
            "last handle dropped off the home thread with references outstanding, sending payload home"
        );
        let home = self.home;
        let identity = Arc::clone(&self.identity);
        let mut resource = Some(resource);
        self.event_loop.schedule(
            self.defer_delay,
            Box::new(move || {
                if identity.current() != home {
                    return ControlFlow::Continue(());
                }
                drop(resource.take());
                ControlFlow::Break(())
            }),
        );
    }
}

/// A reference-counted resource bound to the thread that created it.
///
/// Cloning the handle shares the same count; it does not add a reference.
/// Call [`add_ref`](Self::add_ref) and [`unref`](Self::unref) to manage the
/// count itself.
pub struct UiSafeRefCount<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for UiSafeRefCount<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> UiSafeRefCount<T> {
    /// Wrap `resource`, making the calling thread its home. `event_loop`
    /// must be the loop that thread drains.
    pub fn new(resource: T, event_loop: Arc<dyn EventLoop>) -> Self {
        Self::with_identity(
            resource,
            event_loop,
            Arc::new(OsThreadIdentity),
            &LoopConfig::default(),
        )
    }

    pub fn with_identity(
        resource: T,
        event_loop: Arc<dyn EventLoop>,
        identity: Arc<dyn ThreadIdentity>,
        config: &LoopConfig,
    ) -> Self {
        let home = identity.current();
        Self {
            shared: Arc::new(Shared {
                base: RefCount::new(resource),
                home,
                identity,
                event_loop,
                defer_delay: config.defer_delay,
            }),
        }
    }

    pub fn home_thread(&self) -> ThreadId {
        self.shared.home
    }

    pub fn is_home_thread(&self) -> bool {
        self.shared.on_home_thread()
    }

    /// Add a reference. Callable from any thread.
    pub fn add_ref(&self) {
        self.shared.base.add_ref_with(&*self.shared);
    }

    /// Take the ref mutex.
    ///
    /// On the home thread this never blocks: each failed attempt runs one
    /// event-loop iteration and retries, with no upper bound on the wait.
    /// Elsewhere it blocks normally.
    pub fn obtain_ref_mutex(&self) -> MutexGuard<'_, RefState<T>> {
        self.shared.obtain(self.shared.base.ref_mutex())
    }

    /// Like [`obtain_ref_mutex`](Self::obtain_ref_mutex) but gives up after
    /// `timeout`. Loop iterations run while waiting never outlast it.
    pub fn obtain_ref_mutex_timeout(
        &self,
        timeout: Duration,
    ) -> Option<MutexGuard<'_, RefState<T>>> {
        let mutex = self.shared.base.ref_mutex();
        if !self.shared.on_home_thread() {
            return mutex.try_lock_for(timeout);
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(guard) = mutex.try_lock() {
                return Some(guard);
            }
            if Instant::now() >= deadline {
                return None;
            }
            self.shared.event_loop.run_one_iteration_until(deadline);
        }
    }

    /// Drop a reference.
    ///
    /// On the home thread the count is decremented immediately and the
    /// payload dropped if it reaches zero. On any other thread nothing is
    /// touched; the decrement is queued on the home loop instead.
    pub fn unref(&self) {
        if self.shared.on_home_thread() {
            self.shared.base.unref_with(&*self.shared);
        } else {
            self.defer_unref();
        }
    }

    pub fn ref_count(&self) -> usize {
        self.obtain_ref_mutex().count()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.base.lifecycle()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.base.is_destroyed()
    }

    /// Borrow the payload, if it is still alive. Holds the ref mutex for
    /// the duration of `f`, acquired the same way as
    /// [`obtain_ref_mutex`](Self::obtain_ref_mutex). The mutex is not
    /// reentrant, so `f` must not add or drop references on this resource.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.shared.base.with_using(&*self.shared, f)
    }

    fn defer_unref(&self) {
        tracing::debug!(
            home = ?self.shared.home,
            "unref from a non-home thread, deferring to the UI loop"
        );
        let shared = Arc::clone(&self.shared);
        self.shared.event_loop.schedule(
            self.shared.defer_delay,
            Box::new(move || {
                if !shared.on_home_thread() {
                    tracing::warn!("deferred unref ran off its home thread, deferring again");
                    return ControlFlow::Continue(());
                }
                shared.base.unref_with(&*shared);
                ControlFlow::Break(())
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::TaskQueue;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn config() -> LoopConfig {
        LoopConfig {
            idle_wait: Duration::from_millis(1),
            defer_delay: Duration::from_millis(1),
        }
    }

    /// Identity that reports whichever thread the test says is running.
    struct Pretend {
        acting: Mutex<ThreadId>,
    }

    impl ThreadIdentity for Pretend {
        fn current(&self) -> ThreadId {
            *self.acting.lock()
        }
    }

    fn foreign_thread_id() -> ThreadId {
        thread::spawn(|| thread::current().id())
            .join()
            .expect("id thread panicked")
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn home_unref_destroys_synchronously() {
        let dropped = Arc::new(AtomicBool::new(false));
        let queue = Arc::new(TaskQueue::new(config()));
        let rc = UiSafeRefCount::new(DropFlag(Arc::clone(&dropped)), queue.clone());

        assert!(rc.is_home_thread());
        rc.unref();
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(rc.lifecycle(), Lifecycle::Destroyed);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn foreign_unref_is_queued_not_applied() {
        let dropped = Arc::new(AtomicBool::new(false));
        let queue = Arc::new(TaskQueue::new(config()));
        let home = thread::current().id();
        let identity = Arc::new(Pretend {
            acting: Mutex::new(home),
        });
        let rc = UiSafeRefCount::with_identity(
            DropFlag(Arc::clone(&dropped)),
            queue.clone(),
            identity.clone(),
            &config(),
        );

        *identity.acting.lock() = foreign_thread_id();
        rc.unref();
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(queue.pending(), 1);

        // Still pretending to be the worker: the task must not destroy.
        assert!(queue.run_one_iteration(true));
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(queue.pending(), 1);

        *identity.acting.lock() = home;
        queue.run_until_idle();
        assert!(dropped.load(Ordering::SeqCst));
        assert!(rc.is_destroyed());
    }

    #[test]
    fn deferred_unrefs_each_decrement_once() {
        let queue = Arc::new(TaskQueue::new(config()));
        let rc = UiSafeRefCount::new((), queue.clone());
        rc.add_ref();
        rc.add_ref();

        let worker = rc.clone();
        thread::spawn(move || {
            worker.unref();
            worker.unref();
        })
        .join()
        .unwrap();

        assert_eq!(rc.ref_count(), 3);
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(rc.ref_count(), 1);
        assert!(!rc.is_destroyed());
    }

    #[test]
    fn bounded_wait_gives_up_while_worker_holds_mutex() {
        let queue = Arc::new(TaskQueue::new(config()));
        let rc = UiSafeRefCount::new((), queue);
        let worker = rc.clone();
        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let guard = worker.obtain_ref_mutex();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            drop(guard);
        });

        held_rx.recv().unwrap();
        assert!(rc.obtain_ref_mutex_timeout(Duration::from_millis(10)).is_none());
        release_tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(rc.obtain_ref_mutex_timeout(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn bounded_wait_is_not_stretched_by_future_task() {
        let queue = Arc::new(TaskQueue::new(config()));
        let rc = UiSafeRefCount::new((), queue.clone());
        let token = queue.schedule(Duration::from_secs(30), Box::new(|| ControlFlow::Break(())));

        let worker = rc.clone();
        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            let guard = worker.obtain_ref_mutex();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            drop(guard);
        });

        held_rx.recv().unwrap();
        let start = Instant::now();
        assert!(rc.obtain_ref_mutex_timeout(Duration::from_millis(10)).is_none());
        assert!(start.elapsed() < Duration::from_secs(5));

        release_tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(queue.cancel(token));
    }

    #[test]
    fn guard_exposes_count_and_payload() {
        let queue = Arc::new(TaskQueue::new(config()));
        let rc = UiSafeRefCount::new(String::from("cyan plane"), queue);
        rc.add_ref();
        let state = rc.obtain_ref_mutex();
        assert_eq!(state.count(), 2);
        assert_eq!(state.resource().map(String::as_str), Some("cyan plane"));
    }
}
