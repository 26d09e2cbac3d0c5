//! Printhead Demo — exercises the colorant registry and UI-safe refcounting.
//!
//! Builds a DeviceN channel set for a six-ink device, then hands a
//! UI-owned preview to worker threads and drives the home loop until the
//! last worker reference has been released on the home thread.

mod config;
mod preview;

use printhead_core::{ColorantError, ColorantRegistry};
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;

/// Errors that abort the demo.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Colorant(#[from] ColorantError),
    #[error("worker thread panicked")]
    WorkerPanicked,
}

fn main() -> Result<(), DemoError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DemoConfig::default();
    tracing::info!(?config, "starting printhead demo");

    let colorants = six_ink_colorants()?;
    for (index, colorant) in colorants.iter().enumerate() {
        let swatch = colorant.srgb();
        tracing::info!(
            "channel {index}: {} #{:02x}{:02x}{:02x}",
            colorant.name(),
            swatch.red,
            swatch.green,
            swatch.blue
        );
    }
    tracing::info!("channel set: {}", colorants.to_json()?);

    preview::run(&config, &colorants)?;
    Ok(())
}

/// CMYK plus orange and a custom green spot ink.
fn six_ink_colorants() -> Result<ColorantRegistry, ColorantError> {
    let mut registry = ColorantRegistry::with_process_colorants();
    registry.add_named("Orange")?;
    registry.add("Spot Green", 0, 160, 80);
    Ok(registry)
}
