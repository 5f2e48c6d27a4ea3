//! Benchmarks for polyphonic block rendering.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ivory_dsp::preset::PresetId;
use ivory_dsp::synth::Engine;

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

const CHORD: &[(&str, f32)] = &[
    ("C3", 130.81),
    ("E3", 164.81),
    ("G3", 196.0),
    ("C4", 261.63),
    ("E4", 329.63),
    ("G4", 392.0),
    ("C5", 523.25),
    ("E5", 659.26),
];

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === SINGLE MODULATED VOICE ===
        // Bowed is the most expensive recipe: two saws plus the vibrato
        // path through the detune input.
        let mut bowed = Engine::new(48_000.0);
        bowed.set_preset(PresetId::Bowed);
        bowed.note_on("A4", 440.0);

        group.bench_with_input(BenchmarkId::new("bowed_voice", size), &size, |b, _| {
            b.iter(|| bowed.render_block(black_box(&mut buffer)));
        });

        // === EIGHT-VOICE CHORD ===
        // Upright: three generators per voice, 24 oscillators total.
        let mut poly = Engine::new(48_000.0);
        poly.set_preset(PresetId::Upright);
        for &(note, frequency) in CHORD {
            poly.note_on(note, frequency);
        }

        group.bench_with_input(BenchmarkId::new("upright_chord", size), &size, |b, _| {
            b.iter(|| poly.render_block(black_box(&mut buffer)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
