pub mod graph; // Schedulable audio rendering graph (the output sink)
pub mod notes; // Note names, MIDI numbers, equal-tempered frequencies
pub mod preset; // Declarative timbre recipes
pub mod synth; // Voice construction, note lifecycle, engine state

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
