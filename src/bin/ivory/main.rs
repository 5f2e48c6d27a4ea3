//! ivory - terminal polyphonic keyboard
//!
//! Run with: cargo run
//!
//! Two octaves are mapped across the keyboard (number row = bass octave,
//! home row = lead octave). Tab cycles presets, [ and ] set volume,
//! - and = set sustain, Esc quits.

mod app;
mod keys;

use app::Ivory;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    Ivory::new().run()
}
