use std::collections::HashMap;

use crate::graph::{AudioGraph, NodeId, Waveform};
use crate::preset::{self, PresetId};
use crate::synth::message::{EngineMessage, MessageReceiver};
use crate::synth::voice::Voice;

/// Gain floor release ramps aim at; exponential curves cannot reach zero.
const SILENCE_FLOOR: f32 = 1.0e-4;
/// Fixed short release used when a retrigger forces out the old voice.
const IMMEDIATE_RELEASE_SECS: f32 = 0.05;
/// Lower clamp for the sustain slider; zero or negative ramp times are
/// undefined.
const MIN_SUSTAIN_SECS: f32 = 0.05;
/// Grace period between the end of a release ramp and node teardown.
const TEARDOWN_MARGIN_SECS: f64 = 0.1;
/// Time constant of the master volume smoothing ramp.
const VOLUME_RAMP_TAU: f32 = 0.1;
const DEFAULT_VOLUME: f32 = 0.5;
const DEFAULT_SUSTAIN_SECS: f32 = 4.0;

struct Output {
    graph: AudioGraph,
    master: NodeId,
}

/// A release ramp has been scheduled; free the voice's nodes once the ramp
/// (plus margin) has run out. Keyed by voice tag so a forced early disposal
/// replaces the stale task instead of racing it.
struct Teardown {
    due: f64,
    voice: Voice,
}

/// The polyphonic synthesis engine.
///
/// Owns the active-voice table, the master gain stage, and the global
/// sustain/volume/preset parameters. Every operation is fire-and-forget and
/// panic-free: without a rendering backend, or before the clock is allowed
/// to run, operations degrade to silent no-ops rather than erroring - a
/// keyboard that throws on input is a worse instrument than one that is
/// briefly quiet.
pub struct Engine {
    output: Option<Output>,
    voices: HashMap<String, Voice>,
    pending: Vec<Teardown>,
    sustain_seconds: f32,
    current_preset: PresetId,
    next_tag: u64,
}

impl Engine {
    /// Engine with a software rendering graph at the given sample rate.
    /// The clock starts suspended and resumes on the first note-on.
    pub fn new(sample_rate: f32) -> Self {
        let mut graph = AudioGraph::new(sample_rate);
        let master = graph.create_gain(DEFAULT_VOLUME);
        graph.connect_to_destination(master);
        Self {
            output: Some(Output { graph, master }),
            voices: HashMap::new(),
            pending: Vec::new(),
            sustain_seconds: DEFAULT_SUSTAIN_SECS,
            current_preset: PresetId::default(),
            next_tag: 0,
        }
    }

    /// Engine without a rendering backend. Every operation is a silent
    /// no-op; playback degrades to missing sound, never to an error.
    pub fn detached() -> Self {
        Self {
            output: None,
            voices: HashMap::new(),
            pending: Vec::new(),
            sustain_seconds: DEFAULT_SUSTAIN_SECS,
            current_preset: PresetId::default(),
            next_tag: 0,
        }
    }

    /// Select the recipe for voices created from now on. Sounding voices
    /// keep the recipe they were built with.
    pub fn set_preset(&mut self, preset: PresetId) {
        self.current_preset = preset;
    }

    /// Set the release length used by subsequent note-offs. Clamped to a
    /// positive floor; non-finite input is ignored.
    pub fn set_sustain(&mut self, seconds: f32) {
        if !seconds.is_finite() {
            return;
        }
        self.sustain_seconds = seconds.max(MIN_SUSTAIN_SECS);
    }

    /// Ramp the master gain toward `level` (clamped to [0, 1]) over a short
    /// fixed time constant, so slider moves never click.
    pub fn set_volume(&mut self, level: f32) {
        if !level.is_finite() {
            return;
        }
        let level = level.clamp(0.0, 1.0);
        let Some(out) = self.output.as_mut() else {
            return;
        };
        let now = out.graph.current_time();
        if let Some(gain) = out.graph.gain(out.master) {
            gain.set_target_at_time(level, now, VOLUME_RAMP_TAU);
        }
    }

    /// Start a voice for `note` at `frequency` using the current preset.
    ///
    /// If the note is already sounding, the old voice is forced out with a
    /// fixed short release first - it keeps ringing on its own until its
    /// teardown fires, while the new voice starts immediately.
    pub fn note_on(&mut self, note: &str, frequency: f32) {
        if self.output.is_none() {
            return;
        }
        if !frequency.is_finite() || frequency <= 0.0 {
            return;
        }
        if let Some(out) = self.output.as_mut() {
            // Autoplay policies keep the clock suspended until a gesture;
            // the first note is that gesture.
            out.graph.resume();
        }
        self.reap();
        if self.voices.contains_key(note) {
            self.release(note, true);
        }

        let recipe = preset::recipe(self.current_preset);
        let tag = self.next_tag;
        self.next_tag += 1;

        let Some(out) = self.output.as_mut() else {
            return;
        };
        let graph = &mut out.graph;
        let now = graph.current_time();

        let amp = graph.create_gain(0.0);
        graph.connect(amp, out.master);
        if let Some(gain) = graph.gain(amp) {
            gain.set_value_at_time(0.0, now);
            gain.linear_ramp_to_value_at_time(
                recipe.attack.target,
                now + recipe.attack.seconds as f64,
            );
            if let Some(decay) = recipe.decay {
                gain.exponential_ramp_to_value_at_time(
                    decay.target,
                    now + decay.seconds as f64,
                );
            }
        }

        let mut voice = Voice::new(self.current_preset, tag, amp, recipe.release_multiplier);
        for spec in recipe.generators {
            let osc = graph.create_oscillator(spec.waveform, frequency * spec.frequency_ratio);
            if spec.detune_cents != 0.0 {
                if let Some(detune) = graph.detune(osc) {
                    detune.set_value_at_time(spec.detune_cents, now);
                }
            }
            graph.connect(osc, amp);
            voice.push_generator(osc, spec.waveform);
        }

        if let Some(vibrato) = recipe.vibrato {
            let lfo = graph.create_oscillator(Waveform::Sine, vibrato.rate_hz);
            let depth = graph.create_gain(vibrato.depth_cents);
            graph.connect(lfo, depth);
            for &osc in voice.generator_ids() {
                graph.connect_to_detune(depth, osc);
            }
            graph.start(lfo, now);
            voice.set_vibrato(lfo, depth);
        }

        for &osc in voice.generator_ids() {
            graph.start(osc, now);
        }
        voice.mark_sounding();
        self.voices.insert(note.to_owned(), voice);
    }

    /// Release a note. No-op if the note is not sounding. The voice leaves
    /// the active table immediately - a new note-on for the same id is
    /// never blocked by a ring-out in progress.
    pub fn note_off(&mut self, note: &str) {
        if self.output.is_none() {
            return;
        }
        self.reap();
        self.release(note, false);
    }

    /// Release every active voice with the normal sustain setting.
    pub fn all_notes_off(&mut self) {
        if self.output.is_none() {
            return;
        }
        self.reap();
        let notes: Vec<String> = self.voices.keys().cloned().collect();
        for note in notes {
            self.release(&note, false);
        }
    }

    /// Apply one control message.
    pub fn apply(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::NoteOn { note, frequency } => self.note_on(&note, frequency),
            EngineMessage::NoteOff { note } => self.note_off(&note),
            EngineMessage::SetPreset(preset) => self.set_preset(preset),
            EngineMessage::SetSustain(seconds) => self.set_sustain(seconds),
            EngineMessage::SetVolume(level) => self.set_volume(level),
            EngineMessage::AllNotesOff => self.all_notes_off(),
        }
    }

    /// Drain a control queue, then typically render. Called from the audio
    /// callback, which owns the engine.
    pub fn drain<R: MessageReceiver>(&mut self, rx: &mut R) {
        while let Some(message) = rx.pop() {
            self.apply(message);
        }
    }

    /// Reap due teardowns and render one block (silence when detached).
    pub fn render_block(&mut self, out: &mut [f32]) {
        self.reap();
        match self.output.as_mut() {
            Some(output) => output.graph.render_block(out),
            None => out.fill(0.0),
        }
    }

    /// Logical clock time of the output sink, 0 when detached.
    pub fn current_time(&self) -> f64 {
        self.output
            .as_ref()
            .map_or(0.0, |out| out.graph.current_time())
    }

    pub fn sustain_seconds(&self) -> f32 {
        self.sustain_seconds
    }

    pub fn preset(&self) -> PresetId {
        self.current_preset
    }

    /// The sounding voice for a note, if any. Voices in release are no
    /// longer reachable here.
    pub fn voice(&self, note: &str) -> Option<&Voice> {
        self.voices.get(note)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Voices ringing out toward their teardown time.
    pub fn pending_teardowns(&self) -> usize {
        self.pending.len()
    }

    /// Generator nodes still allocated in the sink, released voices
    /// included. Zero once every teardown has fired.
    pub fn live_generators(&self) -> usize {
        self.output
            .as_ref()
            .map_or(0, |out| out.graph.oscillator_count())
    }

    /// Master gain as currently heard, for metering.
    pub fn master_level(&self) -> f32 {
        match self.output.as_ref() {
            Some(out) => out
                .graph
                .gain_value(out.master, out.graph.current_time())
                .unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Instantaneous envelope level of a sounding note, for metering.
    pub fn voice_level(&self, note: &str) -> Option<f32> {
        let out = self.output.as_ref()?;
        let voice = self.voices.get(note)?;
        out.graph.gain_value(voice.amp(), out.graph.current_time())
    }

    fn release(&mut self, note: &str, immediate: bool) {
        let Some(mut voice) = self.voices.remove(note) else {
            return;
        };
        let Some(out) = self.output.as_mut() else {
            return;
        };
        let graph = &mut out.graph;
        let now = graph.current_time();

        let release_seconds = if immediate {
            IMMEDIATE_RELEASE_SECS
        } else {
            self.sustain_seconds * voice.release_multiplier()
        };
        let release_end = now + release_seconds as f64;

        if let Some(gain) = graph.gain(voice.amp()) {
            // Freeze at the instantaneous value so the release starts
            // where the envelope actually is, then ramp out. Cancelling
            // first keeps a still-running attack from fighting the ramp.
            let held = gain.value_at(now);
            gain.cancel_scheduled_values(now);
            gain.set_value_at_time(held, now);
            gain.exponential_ramp_to_value_at_time(SILENCE_FLOOR, release_end);
        }
        for &osc in voice.generator_ids() {
            graph.stop(osc, release_end);
        }
        if let Some((lfo, _)) = voice.vibrato_nodes() {
            graph.stop(lfo, release_end);
        }

        voice.begin_release();
        self.schedule_teardown(voice, release_end + TEARDOWN_MARGIN_SECS);
    }

    fn schedule_teardown(&mut self, voice: Voice, due: f64) {
        // One pending task per voice identity: a forced early disposal
        // replaces whatever was queued for this voice.
        let tag = voice.tag();
        self.pending.retain(|t| t.voice.tag() != tag);
        self.pending.push(Teardown { due, voice });
    }

    /// Run every teardown whose time has come. Invoked at the top of each
    /// operation and of every rendered block, so disposal needs no timer
    /// thread.
    fn reap(&mut self) {
        let Some(out) = self.output.as_mut() else {
            return;
        };
        let graph = &mut out.graph;
        let now = graph.current_time();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due <= now {
                let task = self.pending.swap_remove(index);
                dispose(graph, task.voice);
            } else {
                index += 1;
            }
        }
    }
}

/// Stop, disconnect, and free every node of a voice. All graph calls are
/// stale-safe, so racing an already-stopped generator is harmless.
fn dispose(graph: &mut AudioGraph, mut voice: Voice) {
    let now = graph.current_time();
    for &osc in voice.generator_ids() {
        graph.stop(osc, now);
        graph.remove(osc);
    }
    if let Some((lfo, depth)) = voice.vibrato_nodes() {
        graph.stop(lfo, now);
        graph.remove(lfo);
        graph.remove(depth);
    }
    graph.remove(voice.amp());
    voice.mark_disposed();
}
