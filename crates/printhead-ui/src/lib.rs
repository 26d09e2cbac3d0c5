//! Printhead UI — thread-affine lifetime management for UI-owned objects.
//!
//! UI objects belong to the thread running the cooperative event loop.
//! Worker threads may hold references to them, but must never be the ones
//! to destroy them. [`UiSafeRefCount`] routes the final unref back to the
//! home thread and keeps that thread responsive while it waits on a lock a
//! worker holds.

mod config;
pub mod event_loop;
pub mod refcount;
mod thread_identity;
pub mod ui_refcount;

pub use config::LoopConfig;
pub use event_loop::{EventLoop, Task, TaskQueue, TaskToken};
pub use refcount::{Blocking, Lifecycle, RefCount, RefMutexAcquire, RefState};
pub use thread_identity::{OsThreadIdentity, ThreadIdentity};
pub use ui_refcount::{LoopYielding, UiSafeRefCount};
