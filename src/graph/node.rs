use crate::graph::param::AudioParam;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Periodic waveform shapes available to generators.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Evaluate one cycle at `phase` in [0, 1). Output is bipolar [-1, 1].
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (std::f32::consts::TAU * phase).sin(),
            Waveform::Triangle => {
                let x = phase * 4.0;
                if x < 1.0 {
                    x
                } else if x < 3.0 {
                    2.0 - x
                } else {
                    x - 4.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Generational handle to a node owned by an [`AudioGraph`].
///
/// Handles stay valid to *hold* after the node is freed; every graph
/// operation on a stale handle is a silent no-op. Deferred teardown racing
/// an immediate retrigger is the expected caller of that path.
///
/// [`AudioGraph`]: crate::graph::AudioGraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A periodic signal generator with scheduled start/stop and a detune
/// parameter in cents. Audio-rate detune inputs (vibrato) sum on top of the
/// scheduled detune value.
pub(crate) struct OscillatorNode {
    pub(crate) waveform: Waveform,
    pub(crate) frequency: f32,
    pub(crate) detune: AudioParam,
    pub(crate) detune_inputs: Vec<NodeId>,
    pub(crate) phase: f32,
    pub(crate) start_time: Option<f64>,
    pub(crate) stop_time: Option<f64>,
}

impl OscillatorNode {
    pub(crate) fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            detune: AudioParam::new(0.0),
            detune_inputs: Vec::new(),
            phase: 0.0,
            start_time: None,
            stop_time: None,
        }
    }

    #[inline]
    pub(crate) fn is_live_at(&self, time: f64) -> bool {
        match self.start_time {
            Some(start) => time >= start && self.stop_time.is_none_or(|stop| time < stop),
            None => false,
        }
    }
}

/// Sums its inputs and scales them by a schedulable gain parameter.
pub(crate) struct GainNode {
    pub(crate) gain: AudioParam,
    pub(crate) inputs: Vec<NodeId>,
}

impl GainNode {
    pub(crate) fn new(level: f32) -> Self {
        Self {
            gain: AudioParam::new(level),
            inputs: Vec::new(),
        }
    }
}

pub(crate) enum Node {
    Oscillator(OscillatorNode),
    Gain(GainNode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_starts_at_zero_and_peaks_at_quarter_cycle() {
        assert!(Waveform::Sine.sample(0.0).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_hits_extremes() {
        assert!(Waveform::Triangle.sample(0.0).abs() < 1e-6);
        assert!((Waveform::Triangle.sample(0.25) - 1.0).abs() < 1e-6);
        assert!((Waveform::Triangle.sample(0.75) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn square_is_bipolar() {
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.9), -1.0);
    }

    #[test]
    fn sawtooth_spans_full_range() {
        assert!((Waveform::Sawtooth.sample(0.0) + 1.0).abs() < 1e-6);
        assert!((Waveform::Sawtooth.sample(0.5)).abs() < 1e-6);
    }

    #[test]
    fn unstarted_oscillator_is_not_live() {
        let osc = OscillatorNode::new(Waveform::Sine, 440.0);
        assert!(!osc.is_live_at(0.0));
    }

    #[test]
    fn stop_time_gates_liveness() {
        let mut osc = OscillatorNode::new(Waveform::Sine, 440.0);
        osc.start_time = Some(1.0);
        osc.stop_time = Some(2.0);
        assert!(!osc.is_live_at(0.5));
        assert!(osc.is_live_at(1.5));
        assert!(!osc.is_live_at(2.0));
    }
}
