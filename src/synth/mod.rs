// Purpose: note lifecycle on top of the rendering graph.
// The engine owns voices, the master stage, and the teardown schedule.

pub mod engine;
pub mod message;
pub mod voice;

pub use engine::Engine;
pub use message::{EngineMessage, MessageReceiver};
pub use voice::{Voice, VoiceState};
