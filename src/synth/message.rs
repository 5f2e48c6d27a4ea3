use crate::preset::PresetId;

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Control-surface commands, mirrored as messages so a control thread can
/// drive an engine owned by the audio callback. Fire-and-forget: none of
/// these produce a reply.
#[derive(Debug, Clone)]
pub enum EngineMessage {
    NoteOn { note: String, frequency: f32 },
    NoteOff { note: String },
    SetPreset(PresetId),
    SetSustain(f32),
    SetVolume(f32),
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineMessage> {
    fn pop(&mut self) -> Option<EngineMessage> {
        Consumer::pop(self).ok()
    }
}
