//! Ivory - cpal output stream plus a raw-mode key loop.
//!
//! The audio callback owns the engine and drains a lock-free message queue;
//! the key loop never touches audio state directly. Terminals report key
//! presses but not releases, so a held key is modelled by its auto-repeat:
//! every repeat refreshes the note's hold deadline, and a note whose
//! deadline lapses gets its note-off.

use std::collections::HashMap;
use std::io::Write;
use std::time::{Duration, Instant};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use rtrb::RingBuffer;

use ivory_dsp::notes;
use ivory_dsp::preset::PresetId;
use ivory_dsp::synth::{Engine, EngineMessage};
use ivory_dsp::MAX_BLOCK_SIZE;

const MESSAGE_QUEUE_SIZE: usize = 256;
/// How long a note stays held after its last key press/repeat.
const KEY_HOLD: Duration = Duration::from_millis(350);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct Ivory {
    volume: f32,
    sustain: f32,
    preset_index: usize,
}

impl Ivory {
    pub fn new() -> Self {
        Self {
            volume: 0.5,
            sustain: 4.0,
            preset_index: 0,
        }
    }

    pub fn run(mut self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        println!("=== ivory ===");
        println!("Sample rate: {} Hz", sample_rate);
        println!("Channels: {}", channels);
        println!("Preset: {}", PresetId::ALL[self.preset_index].name());
        println!();
        println!("Play: number row + home row | Tab: preset | [ ]: volume | - =: sustain | Esc: quit");
        println!();

        let (mut tx, mut rx) = RingBuffer::<EngineMessage>::new(MESSAGE_QUEUE_SIZE);
        let mut engine = Engine::new(sample_rate);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                engine.drain(&mut rx);

                let total_frames = data.len() / channels;
                let mut frames_written = 0;
                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames];
                    engine.render_block(block);

                    // Mono fan-out to every channel.
                    let offset = frames_written * channels;
                    for (i, &sample) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[offset + i * channels + ch] = sample;
                        }
                    }
                    frames_written += frames;
                }
            },
            |err| eprintln!("audio error: {err}"),
            None,
        )?;
        stream.play()?;

        terminal::enable_raw_mode().wrap_err("failed to enter raw mode")?;
        let result = self.key_loop(&mut tx);
        terminal::disable_raw_mode().ok();
        println!();
        result
    }

    fn key_loop(&mut self, tx: &mut rtrb::Producer<EngineMessage>) -> EyreResult<()> {
        let mut held: HashMap<&'static str, Instant> = HashMap::new();

        loop {
            // Expire notes whose key stopped repeating.
            let now = Instant::now();
            held.retain(|note, last_press| {
                if now.duration_since(*last_press) > KEY_HOLD {
                    let _ = tx.push(EngineMessage::NoteOff {
                        note: (*note).to_owned(),
                    });
                    false
                } else {
                    true
                }
            });

            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }

            match key.code {
                KeyCode::Esc => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Tab => {
                    self.preset_index = (self.preset_index + 1) % PresetId::ALL.len();
                    let preset = PresetId::ALL[self.preset_index];
                    let _ = tx.push(EngineMessage::SetPreset(preset));
                    status(&format!("preset: {}", preset.name()));
                }
                KeyCode::Char('[') => self.nudge_volume(tx, -0.1),
                KeyCode::Char(']') => self.nudge_volume(tx, 0.1),
                KeyCode::Char('-') => self.nudge_sustain(tx, -0.5),
                KeyCode::Char('=') => self.nudge_sustain(tx, 0.5),
                KeyCode::Char(ch) => {
                    if let Some(note) = crate::keys::note_for(ch) {
                        let fresh = !held.contains_key(note);
                        held.insert(note, Instant::now());
                        if fresh {
                            if let Some(frequency) = notes::frequency(note) {
                                let _ = tx.push(EngineMessage::NoteOn {
                                    note: note.to_owned(),
                                    frequency,
                                });
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let _ = tx.push(EngineMessage::AllNotesOff);
        Ok(())
    }

    fn nudge_volume(&mut self, tx: &mut rtrb::Producer<EngineMessage>, delta: f32) {
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
        let _ = tx.push(EngineMessage::SetVolume(self.volume));
        status(&format!("volume: {:.1}", self.volume));
    }

    fn nudge_sustain(&mut self, tx: &mut rtrb::Producer<EngineMessage>, delta: f32) {
        self.sustain = (self.sustain + delta).clamp(0.1, 4.0);
        let _ = tx.push(EngineMessage::SetSustain(self.sustain));
        status(&format!("sustain: {:.1}s", self.sustain));
    }
}

fn status(message: &str) {
    print!("{message}        \r");
    let _ = std::io::stdout().flush();
}

impl Default for Ivory {
    fn default() -> Self {
        Self::new()
    }
}
