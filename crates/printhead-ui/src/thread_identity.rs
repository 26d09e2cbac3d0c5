//! Thread identity source used to decide home-thread affinity.

use std::thread::{self, ThreadId};

/// Reports the identity of the calling thread.
///
/// Identities must be stable for the lifetime of a thread and comparable.
/// Tests substitute their own implementation to play the part of a worker.
pub trait ThreadIdentity: Send + Sync {
    fn current(&self) -> ThreadId;
}

/// The operating system's view of the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsThreadIdentity;

impl ThreadIdentity for OsThreadIdentity {
    fn current(&self) -> ThreadId {
        thread::current().id()
    }
}
