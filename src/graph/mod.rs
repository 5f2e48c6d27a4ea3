//! The schedulable audio rendering graph the engine emits sound into.
//!
//! Shaped like a platform audio subsystem: nodes, connections, parameter
//! automation at absolute clock times, and a suspended/running rendering
//! clock. The synthesis engine only ever talks to this surface, so a real
//! backend with the same capabilities can take its place.

/// Graph ownership, clock, topology, and the block renderer.
pub mod context;
/// Node kinds and generational handles.
pub mod node;
/// Scheduled parameter automation timelines.
pub mod param;

pub use context::{AudioGraph, GraphState};
pub use node::{NodeId, Waveform};
pub use param::AudioParam;
