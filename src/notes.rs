//! Note registry: at most one sounding voice per note name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dsp::engine::{AudioEngine, VoiceId};
use crate::dsp::timbre::{Timbre, TimbreRegistry};
use crate::pitch::{NoteName, PlayMode, clamp_cent, frequency_of};

/// The session settings a note is started under.
///
/// A sounding note keeps the context it started with, so octave, mode
/// and timbre changes only affect notes started afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayContext {
    pub octave: i32,
    pub mode: PlayMode,
    pub timbre: Timbre,
}

impl Default for PlayContext {
    fn default() -> Self {
        PlayContext {
            octave: 4,
            mode: PlayMode::Momentary,
            timbre: Timbre::Sine,
        }
    }
}

impl PlayContext {
    pub fn frequency(&self, note: NoteName, cent: f64) -> f64 {
        frequency_of(note, self.octave, cent, self.mode)
    }
}

/// A note that is currently sounding.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveVoice {
    pub note: NoteName,
    /// Last commanded bend in cents, within ±100.
    pub cent: f64,
    pub context: PlayContext,
    pub voice: VoiceId,
}

impl ActiveVoice {
    pub fn frequency(&self) -> f64 {
        self.context.frequency(self.note, self.cent)
    }
}

#[derive(Debug, Default)]
pub struct NoteRegistry {
    active: HashMap<NoteName, ActiveVoice>,
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `note` bent by `cent`. No-op if it is already sounding or the
    /// timbre has no recipe; returns whether a voice was started.
    pub fn start_note(
        &mut self,
        ctx: &PlayContext,
        timbres: &mut TimbreRegistry,
        engine: &mut AudioEngine,
        note: NoteName,
        cent: f64,
    ) -> bool {
        if self.active.contains_key(&note) {
            return false;
        }
        let cent = clamp_cent(cent);
        let freq = ctx.frequency(note, cent);
        let voice = match timbres.create(ctx.timbre, freq) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("not starting {note}: {e}");
                return false;
            }
        };
        let id = engine.add_voice(voice);
        log::debug!("start {note}{} at {cent:.1} cent ({freq:.3} Hz, {})", ctx.octave, ctx.timbre);
        self.active.insert(
            note,
            ActiveVoice {
                note,
                cent,
                context: *ctx,
                voice: id,
            },
        );
        true
    }

    /// Release `note`'s voice and forget it. No-op if it is not sounding.
    pub fn stop_note(&mut self, engine: &mut AudioEngine, note: NoteName) -> bool {
        match self.active.remove(&note) {
            Some(entry) => {
                engine.release(entry.voice);
                log::debug!("stop {note}");
                true
            }
            None => false,
        }
    }

    /// Re-bend a sounding note. No-op if it is not sounding.
    pub fn update_cent(&mut self, engine: &mut AudioEngine, note: NoteName, cent: f64) -> bool {
        let Some(entry) = self.active.get_mut(&note) else {
            return false;
        };
        entry.cent = clamp_cent(cent);
        let freq = entry.frequency();
        engine.retune(entry.voice, freq);
        log::debug!("bend {note} to {:.1} cent ({freq:.3} Hz)", entry.cent);
        true
    }

    /// Release every sounding note.
    pub fn stop_all(&mut self, engine: &mut AudioEngine) {
        for (_, entry) in self.active.drain() {
            engine.release(entry.voice);
        }
    }

    pub fn is_active(&self, note: NoteName) -> bool {
        self.active.contains_key(&note)
    }

    pub fn get(&self, note: NoteName) -> Option<&ActiveVoice> {
        self.active.get(&note)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Sounding notes in chromatic order.
    pub fn active_notes(&self) -> Vec<NoteName> {
        let mut notes: Vec<NoteName> = self.active.keys().copied().collect();
        notes.sort_by_key(|n| n.semitone());
        notes
    }
}
