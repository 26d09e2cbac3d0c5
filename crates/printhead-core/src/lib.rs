//! Printhead Core — DeviceN colorant bookkeeping.
//!
//! Holds the ordered set of named ink channels an image source or output
//! device describes. Pure data: no threading, no UI dependencies.

pub mod colorant;
mod error;

// Re-exports for convenience.
pub use colorant::{Colorant, ColorantId, ColorantRegistry, lookup_colorant};
pub use error::ColorantError;
