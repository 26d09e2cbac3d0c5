//! Application configuration for the demo.

use printhead_ui::LoopConfig;

/// Default number of worker threads sharing the preview resource.
const DEFAULT_WORKERS: usize = 4;
/// Default references each worker takes and releases.
const DEFAULT_REFS_PER_WORKER: usize = 64;

/// Runtime configuration for the Printhead demo.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Worker threads that borrow the UI-owned preview.
    pub workers: usize,
    /// References each worker adds before releasing them all.
    pub refs_per_worker: usize,
    /// Home loop timing.
    pub event_loop: LoopConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            workers: env_count("PRINTHEAD_WORKERS", DEFAULT_WORKERS),
            refs_per_worker: env_count("PRINTHEAD_REFS_PER_WORKER", DEFAULT_REFS_PER_WORKER),
            event_loop: LoopConfig::default(),
        }
    }
}

fn env_count(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(raw) => parse_count(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_count(key: &str, raw: &str, default: usize) -> usize {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("{key}={raw:?} is not a count, using {default}");
        default
    })
}
