//! Event-loop timing configuration.

use std::time::Duration;

/// Default upper bound on a blocking loop iteration with nothing queued.
const DEFAULT_IDLE_WAIT_MS: u64 = 1;
/// Default delay before a deferred cross-thread unref runs.
const DEFAULT_DEFER_DELAY_MS: u64 = 1;

/// Timing knobs for [`TaskQueue`](crate::TaskQueue) and deferred unrefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// How long a blocking iteration waits for work when the queue is empty.
    pub idle_wait: Duration,
    /// Delay applied to unrefs handed back to the home thread.
    pub defer_delay: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            idle_wait: env_millis("PRINTHEAD_IDLE_WAIT_MS", DEFAULT_IDLE_WAIT_MS),
            defer_delay: env_millis("PRINTHEAD_DEFER_DELAY_MS", DEFAULT_DEFER_DELAY_MS),
        }
    }
}

fn env_millis(key: &str, default: u64) -> Duration {
    let millis = match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{key}={raw:?} is not a millisecond count, using {default}");
            default
        }),
        Err(_) => default,
    };
    Duration::from_millis(millis)
}
