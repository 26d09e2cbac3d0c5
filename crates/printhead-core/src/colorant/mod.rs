//! DeviceN colorants — named ink channels with a display swatch.
//!
//! A [`ColorantRegistry`] owns an ordered chain of [`Colorant`]s. Nodes are
//! addressed through [`ColorantId`] handles and can be walked forwards or
//! backwards, looked up by name, or by position.

pub mod names;
pub mod registry;

use palette::Srgb;
use serde::{Deserialize, Serialize};

pub use names::{PROCESS_COLORANTS, known_colorant_names, lookup_colorant};
pub use registry::{ColorantRegistry, Iter};

/// A single named ink channel.
///
/// The name is fixed once the colorant joins a registry; the swatch values
/// may be edited through [`ColorantRegistry::get_mut`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colorant {
    name: String,
    /// Red component of the display swatch.
    pub red: u8,
    /// Green component of the display swatch.
    pub green: u8,
    /// Blue component of the display swatch.
    pub blue: u8,
}

impl Colorant {
    pub(crate) fn new(name: String, red: u8, green: u8, blue: u8) -> Self {
        Self {
            name,
            red,
            green,
            blue,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Swatch as `[red, green, blue]`.
    pub fn rgb(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Swatch as an 8-bit sRGB color for UI display.
    pub fn srgb(&self) -> Srgb<u8> {
        Srgb::new(self.red, self.green, self.blue)
    }
}

/// Handle to a colorant inside a [`ColorantRegistry`].
///
/// Handles stay valid until the colorant is removed. A handle to a removed
/// colorant never aliases a later one, even if its storage is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorantId {
    pub(crate) slot: usize,
    pub(crate) generation: u32,
}
