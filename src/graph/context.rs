use crate::graph::node::{GainNode, Node, NodeId, OscillatorNode, Waveform};
use crate::graph::param::AudioParam;
use crate::MAX_BLOCK_SIZE;

/*
The Rendering Graph
===================

AudioGraph is the output sink the synthesis engine schedules against. It is
deliberately shaped like a platform audio subsystem: the control side creates
nodes, wires them into a topology, and schedules parameter automation and
generator start/stop at absolute clock times; the rendering side pulls
blocks of samples on its own cadence and is never blocked or observed by
the control side.

Clock
-----

The logical clock is the number of frames rendered divided by the sample
rate. It starts *suspended* - some platforms refuse to run audio before a
user gesture - and only advances once `resume()` has been called. Rendering
while suspended produces silence and leaves the clock untouched, so
automation scheduled "now" still fires once the clock starts.

Topology
--------

Two node kinds cover the engine's needs:

  oscillator    waveform + fixed frequency + schedulable detune (cents).
                Other nodes may connect to the detune input, which is how
                a low-frequency oscillator becomes vibrato.

  gain          sums its inputs, multiplies by a schedulable gain value.
                Per-voice amplitude stages and the master stage are both
                gain nodes.

Nodes connect into an acyclic graph terminated by an implicit destination
that sums whatever is connected to it into the output block.

Handles are generational: freeing a node bumps its slot's generation, so a
handle held by a late teardown callback simply stops matching and every
operation through it degrades to a no-op instead of touching a recycled
slot. Double-stop and double-disconnect are therefore harmless by design.
*/

/// Running state of the rendering clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Suspended,
    Running,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A schedulable software audio graph with a sample-accurate logical clock.
pub struct AudioGraph {
    sample_rate: f32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    destination: Vec<NodeId>,
    frames_rendered: u64,
    state: GraphState,
    // Per-slot output blocks, reused across renders.
    buffers: Vec<Vec<f32>>,
    scratch: Vec<f32>,
    visited: Vec<bool>,
    order: Vec<u32>,
}

impl AudioGraph {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            slots: Vec::new(),
            free: Vec::new(),
            destination: Vec::new(),
            frames_rendered: 0,
            state: GraphState::Suspended,
            buffers: Vec::new(),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            visited: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn resume(&mut self) {
        self.state = GraphState::Running;
    }

    pub fn suspend(&mut self) {
        self.state = GraphState::Suspended;
    }

    /// Logical clock time in seconds. Frozen while suspended.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    pub fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        self.alloc(Node::Oscillator(OscillatorNode::new(waveform, frequency)))
    }

    pub fn create_gain(&mut self, level: f32) -> NodeId {
        self.alloc(Node::Gain(GainNode::new(level)))
    }

    /// Feed `source` into a gain node's summed input.
    pub fn connect(&mut self, source: NodeId, dest: NodeId) {
        if self.get(source).is_none() {
            return;
        }
        if let Some(Node::Gain(gain)) = self.get_mut(dest) {
            if !gain.inputs.contains(&source) {
                gain.inputs.push(source);
            }
        }
    }

    /// Feed `source` into the final output mix.
    pub fn connect_to_destination(&mut self, source: NodeId) {
        if self.get(source).is_some() && !self.destination.contains(&source) {
            self.destination.push(source);
        }
    }

    /// Feed `source` into an oscillator's detune input (cents, audio rate).
    pub fn connect_to_detune(&mut self, source: NodeId, oscillator: NodeId) {
        if self.get(source).is_none() {
            return;
        }
        if let Some(Node::Oscillator(osc)) = self.get_mut(oscillator) {
            if !osc.detune_inputs.contains(&source) {
                osc.detune_inputs.push(source);
            }
        }
    }

    /// Schedulable gain parameter of a gain node.
    pub fn gain(&mut self, node: NodeId) -> Option<&mut AudioParam> {
        match self.get_mut(node) {
            Some(Node::Gain(gain)) => Some(&mut gain.gain),
            _ => None,
        }
    }

    /// Evaluate a gain node's level at `time` without mutating the timeline.
    pub fn gain_value(&self, node: NodeId, time: f64) -> Option<f32> {
        match self.get(node) {
            Some(Node::Gain(gain)) => Some(gain.gain.value_at(time)),
            _ => None,
        }
    }

    /// Schedulable detune parameter (cents) of an oscillator.
    pub fn detune(&mut self, node: NodeId) -> Option<&mut AudioParam> {
        match self.get_mut(node) {
            Some(Node::Oscillator(osc)) => Some(&mut osc.detune),
            _ => None,
        }
    }

    /// Schedule an oscillator to begin producing samples at `time`.
    pub fn start(&mut self, node: NodeId, time: f64) {
        if let Some(Node::Oscillator(osc)) = self.get_mut(node) {
            if osc.start_time.is_none() {
                osc.start_time = Some(time);
            }
        }
    }

    /// Schedule an oscillator to fall silent at `time`. Stopping an already
    /// stopped or freed node is a no-op.
    pub fn stop(&mut self, node: NodeId, time: f64) {
        if let Some(Node::Oscillator(osc)) = self.get_mut(node) {
            match osc.stop_time {
                Some(existing) if existing <= time => {}
                _ => osc.stop_time = Some(time),
            }
        }
    }

    /// Detach a node from every input list it appears in.
    pub fn disconnect(&mut self, node: NodeId) {
        self.destination.retain(|&id| id != node);
        for slot in &mut self.slots {
            match &mut slot.node {
                Some(Node::Gain(gain)) => gain.inputs.retain(|&id| id != node),
                Some(Node::Oscillator(osc)) => osc.detune_inputs.retain(|&id| id != node),
                None => {}
            }
        }
    }

    /// Disconnect and free a node. Stale handles are ignored.
    pub fn remove(&mut self, node: NodeId) {
        if self.get(node).is_none() {
            return;
        }
        self.disconnect(node);
        let slot = &mut self.slots[node.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
    }

    /// Number of oscillator nodes currently allocated (live or pending).
    pub fn oscillator_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.node, Some(Node::Oscillator(_))))
            .count()
    }

    /// Render one block into `out` and advance the clock. While suspended
    /// the block is silence and the clock does not move.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let frames = out.len().min(MAX_BLOCK_SIZE);
        let out = &mut out[..frames];
        out.fill(0.0);

        if self.state == GraphState::Suspended || frames == 0 {
            return;
        }

        self.plan_order();
        let block_start = self.current_time();

        for position in 0..self.order.len() {
            let index = self.order[position] as usize;
            self.render_node(index, frames, block_start);
        }

        for position in 0..self.destination.len() {
            let id = self.destination[position];
            if self.get(id).is_none() {
                continue;
            }
            let source = &self.buffers[id.index as usize];
            for (o, s) in out.iter_mut().zip(source.iter()) {
                *o += *s;
            }
        }

        self.frames_rendered += frames as u64;
    }

    fn render_node(&mut self, index: usize, frames: usize, block_start: f64) {
        let Some(mut node) = self.slots[index].node.take() else {
            return;
        };
        let mut buf = std::mem::take(&mut self.buffers[index]);
        buf.resize(frames, 0.0);
        buf.fill(0.0);

        let step = 1.0 / self.sample_rate as f64;
        match &mut node {
            Node::Oscillator(osc) => {
                self.sum_inputs(&osc.detune_inputs, frames);
                for (i, sample) in buf.iter_mut().enumerate() {
                    let t = block_start + i as f64 * step;
                    if !osc.is_live_at(t) {
                        continue;
                    }
                    let cents = osc.detune.value_at(t) + self.scratch[i];
                    let freq = osc.frequency * (cents / 1200.0).exp2();
                    *sample = osc.waveform.sample(osc.phase);
                    osc.phase = (osc.phase + freq / self.sample_rate).fract();
                }
            }
            Node::Gain(gain) => {
                self.sum_inputs(&gain.inputs, frames);
                for (i, sample) in buf.iter_mut().enumerate() {
                    let t = block_start + i as f64 * step;
                    *sample = self.scratch[i] * gain.gain.value_at(t);
                }
            }
        }

        self.buffers[index] = buf;
        self.slots[index].node = Some(node);
    }

    fn sum_inputs(&mut self, inputs: &[NodeId], frames: usize) {
        self.scratch[..frames].fill(0.0);
        for &id in inputs {
            let index = id.index as usize;
            if index >= self.slots.len() || self.slots[index].generation != id.generation {
                continue;
            }
            let source = &self.buffers[index];
            for (acc, s) in self.scratch[..frames].iter_mut().zip(source.iter()) {
                *acc += *s;
            }
        }
    }

    /// Dependency-first evaluation order, reached by walking audio and
    /// detune inputs down from the destination. Unreachable nodes are
    /// inaudible and skipped entirely.
    fn plan_order(&mut self) {
        self.visited.clear();
        self.visited.resize(self.slots.len(), false);
        self.order.clear();

        let roots: Vec<NodeId> = self.destination.clone();
        for id in roots {
            self.visit(id);
        }
    }

    fn visit(&mut self, id: NodeId) {
        let index = id.index as usize;
        if index >= self.slots.len()
            || self.slots[index].generation != id.generation
            || self.visited[index]
        {
            return;
        }
        self.visited[index] = true;

        let inputs: Vec<NodeId> = match &self.slots[index].node {
            Some(Node::Gain(gain)) => gain.inputs.clone(),
            Some(Node::Oscillator(osc)) => osc.detune_inputs.clone(),
            None => return,
        };
        for input in inputs {
            self.visit(input);
        }
        self.order.push(id.index);
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        self.buffers.push(Vec::new());
        NodeId {
            index,
            generation: 0,
        }
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn running_graph() -> AudioGraph {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.resume();
        graph
    }

    #[test]
    fn suspended_graph_renders_silence_with_frozen_clock() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect_to_destination(osc);
        graph.start(osc, 0.0);

        let mut buffer = vec![1.0f32; 128];
        graph.render_block(&mut buffer);

        assert!(buffer.iter().all(|&s| s == 0.0));
        assert_eq!(graph.current_time(), 0.0);
    }

    #[test]
    fn sine_oscillator_renders_expected_samples() {
        let mut graph = running_graph();
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect_to_destination(osc);
        graph.start(osc, 0.0);

        let mut buffer = vec![0.0f32; 128];
        graph.render_block(&mut buffer);

        // sample n is sin(2pi f n / sr): phase advances after the lookup
        let n = 12;
        let expected = (TAU * 440.0 * n as f32 / SAMPLE_RATE).sin();
        assert!(
            (buffer[n] - expected).abs() < 1e-5,
            "expected {expected}, got {}",
            buffer[n]
        );
    }

    #[test]
    fn unstarted_oscillator_is_silent() {
        let mut graph = running_graph();
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect_to_destination(osc);

        let mut buffer = vec![0.0f32; 64];
        graph.render_block(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn scheduled_stop_silences_mid_block() {
        let mut graph = running_graph();
        let osc = graph.create_oscillator(Waveform::Square, 100.0);
        graph.connect_to_destination(osc);
        graph.start(osc, 0.0);
        // Stop after 64 of 128 frames.
        graph.stop(osc, 64.0 / SAMPLE_RATE as f64);

        let mut buffer = vec![0.0f32; 128];
        graph.render_block(&mut buffer);

        assert!(buffer[..64].iter().any(|&s| s != 0.0));
        assert!(buffer[64..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn gain_scales_its_inputs() {
        let mut graph = running_graph();
        let osc = graph.create_oscillator(Waveform::Square, 10.0);
        let amp = graph.create_gain(0.25);
        graph.connect(osc, amp);
        graph.connect_to_destination(amp);
        graph.start(osc, 0.0);

        let mut buffer = vec![0.0f32; 32];
        graph.render_block(&mut buffer);
        // First half cycle of the square is +1, scaled by the gain.
        assert!((buffer[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn detune_input_shifts_pitch() {
        // A constant +1200 cents through the detune input doubles the
        // frequency: drive it from a square held in its +1 half cycle.
        let mut graph = running_graph();
        let osc = graph.create_oscillator(Waveform::Sawtooth, 100.0);
        let mod_src = graph.create_oscillator(Waveform::Square, 0.001);
        let depth = graph.create_gain(1200.0);
        graph.connect(mod_src, depth);
        graph.connect_to_detune(depth, osc);
        graph.connect_to_destination(osc);
        graph.start(osc, 0.0);
        graph.start(mod_src, 0.0);

        let frames = 360; // 1.5 cycles of 200 Hz at 48 kHz
        let mut buffer = vec![0.0f32; frames];
        graph.render_block(&mut buffer);

        // A 100 Hz saw would not finish a cycle in 360 frames; at 200 Hz
        // the ramp wraps exactly once.
        let wraps = buffer.windows(2).filter(|w| w[1] < w[0] - 1.0).count();
        assert_eq!(wraps, 1, "expected exactly one wrap of the doubled saw");
    }

    #[test]
    fn removed_node_leaves_silence_and_stale_ops_are_ignored() {
        let mut graph = running_graph();
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect_to_destination(osc);
        graph.start(osc, 0.0);
        graph.remove(osc);

        // All of these hold a dead handle and must do nothing.
        graph.stop(osc, 1.0);
        graph.remove(osc);
        graph.connect_to_destination(osc);
        assert!(graph.gain(osc).is_none());
        assert_eq!(graph.oscillator_count(), 0);

        let mut buffer = vec![0.0f32; 64];
        graph.render_block(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn freed_slot_reuse_does_not_resurrect_old_handles() {
        let mut graph = running_graph();
        let first = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.remove(first);
        let second = graph.create_oscillator(Waveform::Sine, 220.0);

        assert_eq!(first.index, second.index, "slot should be reused");
        assert_ne!(first.generation, second.generation);
        graph.stop(first, 0.0); // stale: must not stop the new oscillator
        graph.connect_to_destination(second);
        graph.start(second, 0.0);

        let mut buffer = vec![0.0f32; 64];
        graph.render_block(&mut buffer);
        assert!(buffer.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn shared_modulator_feeds_two_oscillators() {
        let mut graph = running_graph();
        let a = graph.create_oscillator(Waveform::Sine, 440.0);
        let b = graph.create_oscillator(Waveform::Sine, 441.0);
        let lfo = graph.create_oscillator(Waveform::Sine, 5.5);
        let depth = graph.create_gain(5.0);
        graph.connect(lfo, depth);
        graph.connect_to_detune(depth, a);
        graph.connect_to_detune(depth, b);
        graph.connect_to_destination(a);
        graph.connect_to_destination(b);
        for id in [a, b, lfo] {
            graph.start(id, 0.0);
        }

        let mut buffer = vec![0.0f32; 256];
        graph.render_block(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(buffer.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn clock_advances_by_rendered_frames() {
        let mut graph = running_graph();
        let mut buffer = vec![0.0f32; 480];
        graph.render_block(&mut buffer);
        assert!((graph.current_time() - 0.01).abs() < 1e-9);
    }
}
