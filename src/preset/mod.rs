//! Declarative timbre recipes.
//!
//! A preset is data, not behavior: the engine interprets any [`VoiceRecipe`]
//! with one generic builder, so adding a timbre means adding a table entry
//! here and nothing else. Envelope times are measured from note start, the
//! way the scheduling clock sees them.

use crate::graph::Waveform;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selects which recipe newly created voices are built from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresetId {
    /// Struck string: triangle fundamental plus a quiet octave overtone.
    #[default]
    Default,
    /// Bright dual-oscillator synth with fast attack and decay.
    Bright,
    /// Slow-attack orchestral string pad with a sub-octave layer.
    Pad,
    /// Upright piano with three detuned strings per note.
    Upright,
    /// Bowed solo instrument: two barely-detuned saws with vibrato.
    Bowed,
}

impl PresetId {
    pub const ALL: [PresetId; 5] = [
        PresetId::Default,
        PresetId::Bright,
        PresetId::Pad,
        PresetId::Upright,
        PresetId::Bowed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PresetId::Default => "default",
            PresetId::Bright => "bright",
            PresetId::Pad => "pad",
            PresetId::Upright => "upright",
            PresetId::Bowed => "bowed",
        }
    }
}

/// One envelope segment: ramp the voice gain to `target`, arriving
/// `seconds` after note start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub target: f32,
    pub seconds: f32,
}

/// One periodic generator: waveform, frequency as a multiple of the
/// requested base pitch, and a static detune in cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSpec {
    pub waveform: Waveform,
    pub frequency_ratio: f32,
    pub detune_cents: f32,
}

/// A low-frequency modulator applied to every generator's detune.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibratoSpec {
    pub rate_hz: f32,
    pub depth_cents: f32,
}

/// Everything the engine needs to build one voice of a timbre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceRecipe {
    /// Linear ramp from silence up to the attack target.
    pub attack: Ramp,
    /// Optional exponential settle after the attack peak.
    pub decay: Option<Ramp>,
    pub generators: &'static [GeneratorSpec],
    pub vibrato: Option<VibratoSpec>,
    /// Scales the release length on note-off; > 1.0 for bowed/sustained
    /// timbres that ring down slower than they are damped.
    pub release_multiplier: f32,
}

const fn generator(waveform: Waveform, frequency_ratio: f32, detune_cents: f32) -> GeneratorSpec {
    GeneratorSpec {
        waveform,
        frequency_ratio,
        detune_cents,
    }
}

static DEFAULT: VoiceRecipe = VoiceRecipe {
    attack: Ramp { target: 0.4, seconds: 0.01 },
    decay: Some(Ramp { target: 0.1, seconds: 0.5 }),
    generators: &[
        generator(Waveform::Triangle, 1.0, 0.0),
        generator(Waveform::Sine, 2.0, 0.0),
    ],
    vibrato: None,
    release_multiplier: 1.0,
};

static BRIGHT: VoiceRecipe = VoiceRecipe {
    attack: Ramp { target: 0.3, seconds: 0.05 },
    decay: Some(Ramp { target: 0.15, seconds: 0.3 }),
    generators: &[
        generator(Waveform::Square, 1.0, 0.0),
        generator(Waveform::Sawtooth, 1.005, 0.0),
    ],
    vibrato: None,
    release_multiplier: 1.0,
};

static PAD: VoiceRecipe = VoiceRecipe {
    attack: Ramp { target: 0.2, seconds: 0.4 },
    decay: None,
    generators: &[
        generator(Waveform::Sawtooth, 1.0, 0.0),
        generator(Waveform::Triangle, 0.5, 0.0),
    ],
    vibrato: None,
    release_multiplier: 1.5,
};

static UPRIGHT: VoiceRecipe = VoiceRecipe {
    attack: Ramp { target: 0.4, seconds: 0.01 },
    decay: Some(Ramp { target: 0.1, seconds: 0.4 }),
    generators: &[
        generator(Waveform::Triangle, 1.0, 0.0),
        generator(Waveform::Triangle, 1.0, 2.5),
        generator(Waveform::Triangle, 1.0, -2.5),
    ],
    vibrato: None,
    release_multiplier: 1.0,
};

static BOWED: VoiceRecipe = VoiceRecipe {
    attack: Ramp { target: 0.35, seconds: 0.15 },
    decay: None,
    generators: &[
        generator(Waveform::Sawtooth, 1.0, 0.0),
        generator(Waveform::Sawtooth, 1.002, 0.0),
    ],
    vibrato: Some(VibratoSpec {
        rate_hz: 5.5,
        depth_cents: 5.0,
    }),
    release_multiplier: 1.5,
};

/// Look up the recipe for a preset. Pure and side-effect free.
pub fn recipe(id: PresetId) -> &'static VoiceRecipe {
    match id {
        PresetId::Default => &DEFAULT,
        PresetId::Bright => &BRIGHT,
        PresetId::Pad => &PAD,
        PresetId::Upright => &UPRIGHT,
        PresetId::Bowed => &BOWED,
    }
}
