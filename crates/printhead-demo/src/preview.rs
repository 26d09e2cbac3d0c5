//! A UI-owned preview shared with worker threads.

use std::sync::Arc;
use std::thread;

use printhead_core::ColorantRegistry;
use printhead_ui::{EventLoop, TaskQueue, UiSafeRefCount};

use crate::DemoError;
use crate::config::DemoConfig;

/// Stand-in for a widget-side preview buffer, one plane per colorant.
struct Preview {
    planes: Vec<String>,
}

impl Drop for Preview {
    fn drop(&mut self) {
        tracing::info!(
            thread = ?thread::current().id(),
            "preview with {} plane(s) released",
            self.planes.len()
        );
    }
}

/// Share a preview with `config.workers` threads and drain the home loop
/// until every reference has been dropped.
pub fn run(config: &DemoConfig, colorants: &ColorantRegistry) -> Result<(), DemoError> {
    let event_loop = Arc::new(TaskQueue::new(config.event_loop));
    let preview = UiSafeRefCount::new(
        Preview {
            planes: colorants.names().into_iter().map(String::from).collect(),
        },
        event_loop.clone(),
    );
    tracing::info!(home = ?preview.home_thread(), "preview created");

    let handles: Vec<_> = (0..config.workers)
        .map(|worker| {
            let shared = preview.clone();
            let refs = config.refs_per_worker;
            shared.add_ref();
            thread::spawn(move || {
                for _ in 0..refs {
                    shared.add_ref();
                }
                let planes = shared.with(|p| p.planes.len()).unwrap_or(0);
                tracing::debug!(worker, planes, "worker sampled preview");
                // One extra release for the reference taken on our behalf.
                for _ in 0..=refs {
                    shared.unref();
                }
            })
        })
        .collect();

    // Keep the loop turning while workers run so deferred releases land.
    while handles.iter().any(|h| !h.is_finished()) {
        event_loop.run_one_iteration(true);
    }
    for handle in handles {
        handle.join().map_err(|_| DemoError::WorkerPanicked)?;
    }

    let drained = event_loop.run_until_idle();
    tracing::info!(drained, refs = preview.ref_count(), "workers finished");

    preview.unref();
    tracing::info!(lifecycle = ?preview.lifecycle(), "done");
    Ok(())
}
