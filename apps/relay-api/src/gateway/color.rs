//! Member color allocation.
//!
//! Colors come from a fixed palette larger than the default room capacity.
//! Only when every palette entry is taken does allocation fall back to a
//! random pastel, which may collide with an existing member's color.

use std::collections::HashSet;

use rand::Rng;

/// Ordered palette scanned on every allocation.
pub const PALETTE: [&str; 10] = [
    "#e53935", "#8e24aa", "#3949ab", "#00897b", "#f4511e", "#fb8c00", "#43a047", "#1e88e5",
    "#7b1fa2", "#d32f2f",
];

/// Return the first palette color not in `used`, or a random pastel once the
/// palette is exhausted.
pub fn allocate(used: &HashSet<&str>) -> String {
    PALETTE
        .iter()
        .find(|c| !used.contains(*c))
        .map(|c| c.to_string())
        .unwrap_or_else(random_pastel)
}

fn random_pastel() -> String {
    let mut rng = rand::thread_rng();
    let r: u8 = rng.gen_range(0x80..=0xff);
    let g: u8 = rng.gen_range(0x80..=0xff);
    let b: u8 = rng.gen_range(0x80..=0xff);
    format!("#{r:02x}{g:02x}{b:02x}")
}
