//! End-to-end renders through the public surface, including a spectral
//! check of the output sink against rustfft.

use ivory_dsp::graph::{AudioGraph, Waveform};
use ivory_dsp::preset::PresetId;
use ivory_dsp::synth::Engine;
use ivory_dsp::MAX_BLOCK_SIZE;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const SAMPLE_RATE: f32 = 48_000.0;

fn render_seconds(engine: &mut Engine, seconds: f32) -> Vec<f32> {
    let frames = (seconds * SAMPLE_RATE) as usize;
    let mut out = vec![0.0f32; frames];
    for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
        engine.render_block(chunk);
    }
    out
}

#[test]
fn struck_note_produces_bounded_audio_then_full_silence() {
    let mut engine = Engine::new(SAMPLE_RATE);
    engine.set_sustain(0.3);
    engine.note_on("A4", 440.0);

    let sounding = render_seconds(&mut engine, 0.25);
    assert!(sounding.iter().any(|&s| s.abs() > 0.01), "note should be audible");
    assert!(sounding.iter().all(|&s| s.abs() <= 1.0), "output must stay bounded");

    engine.note_off("A4");
    // Ride out the release (0.3s) and the teardown margin.
    render_seconds(&mut engine, 0.6);
    assert_eq!(engine.live_generators(), 0);

    let after = render_seconds(&mut engine, 0.1);
    assert!(after.iter().all(|&s| s == 0.0), "torn-down engine renders silence");
}

#[test]
fn chord_releases_and_reclaims_every_node() {
    let mut engine = Engine::new(SAMPLE_RATE);
    engine.set_preset(PresetId::Upright);
    engine.set_sustain(0.2);
    engine.note_on("C4", 261.63);
    engine.note_on("E4", 329.63);
    engine.note_on("G4", 392.0);
    assert_eq!(engine.live_generators(), 9, "three voices x three strings");

    render_seconds(&mut engine, 0.1);
    engine.all_notes_off();
    render_seconds(&mut engine, 0.5);

    assert_eq!(engine.active_voices(), 0);
    assert_eq!(engine.pending_teardowns(), 0);
    assert_eq!(engine.live_generators(), 0);
}

#[test]
fn retrigger_keeps_sound_continuous() {
    let mut engine = Engine::new(SAMPLE_RATE);
    engine.note_on("C4", 261.63);
    render_seconds(&mut engine, 0.1);
    engine.note_on("C4", 261.63);

    // Old voice rings out while the new attack runs; nothing drops out.
    let overlap = render_seconds(&mut engine, 0.05);
    assert!(overlap.iter().any(|&s| s.abs() > 0.001));
    assert!(overlap.iter().all(|&s| s.abs() <= 1.0));
}

#[test]
fn sink_renders_a_spectrally_clean_sine() {
    const N: usize = 8192;

    let mut graph = AudioGraph::new(SAMPLE_RATE);
    graph.resume();
    let osc = graph.create_oscillator(Waveform::Sine, 440.0);
    let amp = graph.create_gain(0.5);
    graph.connect(osc, amp);
    graph.connect_to_destination(amp);
    graph.start(osc, 0.0);

    let mut samples = vec![0.0f32; N];
    for chunk in samples.chunks_mut(MAX_BLOCK_SIZE) {
        graph.render_block(chunk);
    }

    let mut spectrum: Vec<Complex<f32>> =
        samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(N).process(&mut spectrum);

    let peak_bin = spectrum[1..N / 2]
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
        .map(|(i, _)| i + 1)
        .unwrap();

    let expected = (440.0 * N as f32 / SAMPLE_RATE).round() as usize;
    assert!(
        peak_bin.abs_diff(expected) <= 1,
        "spectral peak at bin {peak_bin}, expected ~{expected}"
    );
}
