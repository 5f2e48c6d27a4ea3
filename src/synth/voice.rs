use crate::graph::{NodeId, Waveform};
use crate::preset::PresetId;

/// Lifecycle of one voice. Transitions only move forward; a disposed voice
/// is never reused, a retriggered note always gets a fresh voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Nodes are being created and wired; nothing scheduled yet.
    Building,
    /// Generators started, attack/decay automation running.
    Sounding,
    /// Release ramp running; the voice has already left the active table.
    Releasing,
    /// Nodes stopped, disconnected, and freed.
    Disposed,
}

pub(crate) struct Vibrato {
    pub(crate) lfo: NodeId,
    pub(crate) depth: NodeId,
}

/// One active note's signal-generation unit: generator handles, the
/// per-voice amplitude stage, and an optional vibrato modulator. Owned
/// exclusively by the engine from creation until teardown.
pub struct Voice {
    preset: PresetId,
    tag: u64,
    amp: NodeId,
    generators: Vec<NodeId>,
    waveforms: Vec<Waveform>,
    vibrato: Option<Vibrato>,
    release_multiplier: f32,
    state: VoiceState,
}

impl Voice {
    pub(crate) fn new(preset: PresetId, tag: u64, amp: NodeId, release_multiplier: f32) -> Self {
        Self {
            preset,
            tag,
            amp,
            generators: Vec::new(),
            waveforms: Vec::new(),
            vibrato: None,
            release_multiplier,
            state: VoiceState::Building,
        }
    }

    pub(crate) fn push_generator(&mut self, id: NodeId, waveform: Waveform) {
        self.generators.push(id);
        self.waveforms.push(waveform);
    }

    pub(crate) fn set_vibrato(&mut self, lfo: NodeId, depth: NodeId) {
        self.vibrato = Some(Vibrato { lfo, depth });
    }

    pub(crate) fn mark_sounding(&mut self) {
        if self.state == VoiceState::Building {
            self.state = VoiceState::Sounding;
        }
    }

    pub(crate) fn begin_release(&mut self) {
        if self.state == VoiceState::Sounding {
            self.state = VoiceState::Releasing;
        }
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.state = VoiceState::Disposed;
    }

    pub(crate) fn tag(&self) -> u64 {
        self.tag
    }

    pub(crate) fn amp(&self) -> NodeId {
        self.amp
    }

    pub(crate) fn generator_ids(&self) -> &[NodeId] {
        &self.generators
    }

    pub(crate) fn vibrato_nodes(&self) -> Option<(NodeId, NodeId)> {
        self.vibrato.as_ref().map(|v| (v.lfo, v.depth))
    }

    pub(crate) fn release_multiplier(&self) -> f32 {
        self.release_multiplier
    }

    /// The preset this voice was built from. Fixed at note-on: later
    /// preset changes never touch a sounding voice.
    pub fn preset(&self) -> PresetId {
        self.preset
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    pub fn waveforms(&self) -> &[Waveform] {
        &self.waveforms
    }

    pub fn has_vibrato(&self) -> bool {
        self.vibrato.is_some()
    }
}
