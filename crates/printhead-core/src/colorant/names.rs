//! Built-in colorant names and their display approximations.
//!
//! Names are matched ASCII case-insensitively, so `"cyan"` and `"Cyan"`
//! resolve to the same entry.

/// Recognised colorant names with a default `[red, green, blue]` swatch.
///
/// Process inks come first in CMYK order, followed by common spot inks
/// found on multi-ink photo printers.
static KNOWN_COLORANTS: &[(&str, [u8; 3])] = &[
    ("Cyan", [0, 255, 255]),
    ("Magenta", [255, 0, 255]),
    ("Yellow", [255, 255, 0]),
    ("Black", [0, 0, 0]),
    ("Red", [255, 0, 0]),
    ("Green", [0, 255, 0]),
    ("Blue", [0, 0, 255]),
    ("Orange", [255, 127, 0]),
    ("Violet", [127, 0, 255]),
    ("Light Cyan", [127, 255, 255]),
    ("Light Magenta", [255, 127, 255]),
    ("Light Black", [127, 127, 127]),
    ("Light Light Black", [191, 191, 191]),
    ("Matte Black", [16, 16, 16]),
    ("Photo Black", [0, 0, 0]),
    ("White", [255, 255, 255]),
];

/// The four process colorants, in the order a CMYK device lists them.
pub const PROCESS_COLORANTS: [&str; 4] = ["Cyan", "Magenta", "Yellow", "Black"];

/// Look up the default RGB swatch for a recognised colorant name.
pub fn lookup_colorant(name: &str) -> Option<[u8; 3]> {
    KNOWN_COLORANTS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|&(_, rgb)| rgb)
}

/// Every name the built-in table recognises, in table order.
pub fn known_colorant_names() -> impl Iterator<Item = &'static str> {
    KNOWN_COLORANTS.iter().map(|&(name, _)| name)
}
