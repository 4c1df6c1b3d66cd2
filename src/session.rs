//! Session, the context object tying the key row to the synth.
//!
//! Owns the current play settings, the note registry, the timbre recipes
//! and the audio engine. Every operation goes through it, so changing the
//! octave, mode or timbre only affects notes started afterwards.

use crate::config::KeyboardConfig;
use crate::dsp::engine::{AudioEngine, AudioState};
use crate::dsp::timbre::{Timbre, TimbreRegistry};
use crate::error::KeyboardError;
use crate::keyboard::{Keyboard, KeyView, NoteSink, PointerId, TrackBounds};
use crate::notes::{ActiveVoice, NoteRegistry, PlayContext};
use crate::pitch::{NoteName, PlayMode, ScaleMode};

/// Lowest and highest selectable octave.
pub const OCTAVE_RANGE: (i32, i32) = (0, 8);

/// The audio half of a session: what the keys drive.
#[derive(Debug)]
pub struct Synth {
    pub context: PlayContext,
    notes: NoteRegistry,
    timbres: TimbreRegistry,
    engine: AudioEngine,
}

impl Synth {
    pub fn new(config: &KeyboardConfig) -> Self {
        Synth {
            context: PlayContext {
                octave: config.octave,
                mode: config.play_mode,
                timbre: config.timbre,
            },
            notes: NoteRegistry::new(),
            timbres: TimbreRegistry::new(config.sample_rate),
            engine: AudioEngine::new(config.sample_rate, config.master_gain),
        }
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn notes(&self) -> &NoteRegistry {
        &self.notes
    }
}

impl NoteSink for Synth {
    fn start_note(&mut self, note: NoteName, cent: f64) {
        self.notes
            .start_note(&self.context, &mut self.timbres, &mut self.engine, note, cent);
    }

    fn stop_note(&mut self, note: NoteName) {
        self.notes.stop_note(&mut self.engine, note);
    }

    fn update_cent(&mut self, note: NoteName, cent: f64) {
        self.notes.update_cent(&mut self.engine, note, cent);
    }

    fn is_active(&self, note: NoteName) -> bool {
        self.notes.is_active(note)
    }

    fn resume_audio(&mut self) {
        self.engine.resume();
    }
}

#[derive(Debug)]
pub struct Session {
    block_size: usize,
    synth: Synth,
    keyboard: Keyboard,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&KeyboardConfig::default())
    }
}

impl Session {
    pub fn new(config: &KeyboardConfig) -> Self {
        let octave = config.octave.clamp(OCTAVE_RANGE.0, OCTAVE_RANGE.1);
        let mut synth = Synth::new(config);
        synth.context.octave = octave;
        Session {
            block_size: config.block_size.max(1),
            synth,
            keyboard: Keyboard::new(config.play_mode, config.scale, config.reset_delay),
        }
    }

    pub fn synth(&self) -> &Synth {
        &self.synth
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    // ---- note registry surface ----

    pub fn start_note(&mut self, note: NoteName, cent: f64) {
        self.synth.start_note(note, cent);
    }

    pub fn stop_note(&mut self, note: NoteName) {
        self.synth.stop_note(note);
    }

    pub fn update_cent(&mut self, note: NoteName, cent: f64) {
        self.synth.update_cent(note, cent);
    }

    pub fn is_active(&self, note: NoteName) -> bool {
        self.synth.is_active(note)
    }

    pub fn active_voice(&self, note: NoteName) -> Option<&ActiveVoice> {
        self.synth.notes.get(note)
    }

    pub fn active_notes(&self) -> Vec<NoteName> {
        self.synth.notes.active_notes()
    }

    /// Release everything that is sounding and settle every key.
    pub fn panic(&mut self, now: f64) {
        self.synth.notes.stop_all(&mut self.synth.engine);
        self.keyboard.rebuild(&mut self.synth, now);
    }

    // ---- recording ----

    pub fn start_recording(&mut self) {
        self.synth.engine.recorder_mut().start();
    }

    /// Stop recording and return the take as WAV bytes.
    pub fn stop_recording(&mut self) -> Vec<u8> {
        self.synth.engine.recorder_mut().stop()
    }

    pub fn is_recording(&self) -> bool {
        self.synth.engine.recorder().is_recording()
    }

    // ---- settings ----

    pub fn play_mode(&self) -> PlayMode {
        self.synth.context.mode
    }

    pub fn set_play_mode(&mut self, mode: PlayMode, now: f64) {
        // Settle gestures under the old mode before new notes use the new one.
        self.keyboard.set_mode(mode, &mut self.synth, now);
        self.synth.context.mode = mode;
    }

    pub fn scale(&self) -> ScaleMode {
        self.keyboard.scale()
    }

    pub fn set_scale(&mut self, scale: ScaleMode, now: f64) {
        self.keyboard.set_scale(scale, &mut self.synth, now);
    }

    pub fn octave(&self) -> i32 {
        self.synth.context.octave
    }

    pub fn set_octave(&mut self, octave: i32) {
        self.synth.context.octave = octave.clamp(OCTAVE_RANGE.0, OCTAVE_RANGE.1);
        log::debug!("octave {}", self.synth.context.octave);
    }

    pub fn octave_up(&mut self) {
        self.set_octave(self.octave() + 1);
    }

    pub fn octave_down(&mut self) {
        self.set_octave(self.octave() - 1);
    }

    pub fn timbre(&self) -> Timbre {
        self.synth.context.timbre
    }

    pub fn set_timbre(&mut self, timbre: Timbre) {
        self.synth.context.timbre = timbre;
    }

    /// Select a timbre by its identifier. An unknown identifier is
    /// reported and leaves the current selection in place.
    pub fn set_timbre_name(&mut self, name: &str) -> Result<(), KeyboardError> {
        match name.parse::<Timbre>() {
            Ok(t) => {
                self.set_timbre(t);
                Ok(())
            }
            Err(e) => {
                log::warn!("{e}");
                Err(e)
            }
        }
    }

    // ---- audio ----

    pub fn audio_state(&self) -> AudioState {
        self.synth.engine.state()
    }

    pub fn resume(&mut self) {
        self.synth.engine.resume();
    }

    /// Silence output (e.g. the page was hidden). Voices keep their state.
    pub fn suspend(&mut self) {
        self.synth.engine.suspend();
    }

    pub fn master_gain(&self) -> f64 {
        self.synth.engine.master_gain()
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.synth.engine.set_master_gain(gain);
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Render one configured block of the mix bus.
    pub fn process_block(&mut self) -> Vec<f32> {
        self.synth.engine.render_block(self.block_size)
    }

    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        self.synth.engine.render_block(frames)
    }

    // ---- gestures, by key index ----

    pub fn set_track_bounds(&mut self, top: f64, height: f64) {
        self.keyboard.set_track_bounds(TrackBounds::new(top, height));
    }

    pub fn pointer_down(&mut self, key: usize, pointer: PointerId, now: f64) -> Result<(), KeyboardError> {
        self.keyboard.key_mut(key)?.press(&mut self.synth, pointer, now);
        Ok(())
    }

    pub fn track_down(&mut self, key: usize, pointer: PointerId, y: f64, now: f64) -> Result<(), KeyboardError> {
        self.keyboard
            .key_mut(key)?
            .press_track(&mut self.synth, pointer, y, now);
        Ok(())
    }

    pub fn pointer_move(&mut self, key: usize, pointer: PointerId, y: f64) -> Result<(), KeyboardError> {
        self.keyboard.key_mut(key)?.drag(&mut self.synth, pointer, y);
        Ok(())
    }

    pub fn pointer_up(&mut self, key: usize, pointer: PointerId, now: f64) -> Result<(), KeyboardError> {
        self.keyboard.key_mut(key)?.release(&mut self.synth, pointer, now);
        Ok(())
    }

    pub fn pointer_cancel(&mut self, key: usize, pointer: PointerId, now: f64) -> Result<(), KeyboardError> {
        self.keyboard.key_mut(key)?.cancel(&mut self.synth, pointer, now);
        Ok(())
    }

    pub fn pointer_leave(&mut self, key: usize, pointer: PointerId, now: f64) -> Result<(), KeyboardError> {
        self.keyboard.key_mut(key)?.leave(&mut self.synth, pointer, now);
        Ok(())
    }

    /// Fire deferred key actions due at `now`.
    pub fn tick(&mut self, now: f64) {
        self.keyboard.tick(now);
    }

    pub fn key_views(&self) -> Vec<KeyView> {
        self.keyboard.views()
    }

    pub fn key_index(&self, note: NoteName) -> Option<usize> {
        self.keyboard.index_of(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn session(mode: PlayMode) -> Session {
        init();
        Session::new(&KeyboardConfig {
            sample_rate: 8000.0,
            play_mode: mode,
            ..KeyboardConfig::default()
        })
    }

    fn voice_hz(s: &Session, note: NoteName) -> f64 {
        let id = s.active_voice(note).unwrap().voice;
        s.synth().engine().voice(id).and_then(|v| v.frequency()).unwrap()
    }

    #[test]
    fn a4_at_zero_cent_is_440() {
        let mut s = session(PlayMode::Momentary);
        s.start_note(NoteName::A, 0.0);
        assert_eq!(voice_hz(&s, NoteName::A), 440.0);
    }

    #[test]
    fn toggled_press_drag_release_keeps_bend() {
        let mut s = session(PlayMode::Toggled);
        let c = s.key_index(NoteName::C).unwrap();
        s.pointer_down(c, 1, 0.0).unwrap();
        s.pointer_move(c, 1, 0.25).unwrap();
        s.pointer_up(c, 1, 0.1).unwrap();

        assert!(s.is_active(NoteName::C));
        assert_eq!(s.active_voice(NoteName::C).unwrap().cent, 50.0);
        let expected = crate::pitch::frequency_of(NoteName::C, 4, 50.0, PlayMode::Toggled);
        assert!((voice_hz(&s, NoteName::C) - expected).abs() < 1e-9);
    }

    #[test]
    fn three_blocks_of_four_record_to_68_bytes() {
        let mut s = Session::new(&KeyboardConfig {
            sample_rate: 8000.0,
            block_size: 4,
            ..KeyboardConfig::default()
        });
        s.resume();
        s.start_recording();
        for _ in 0..3 {
            s.process_block();
        }
        let wav = s.stop_recording();
        assert_eq!(wav.len(), 68);

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 12);
        assert_eq!(reader.spec().sample_rate, 8000);
    }

    #[test]
    fn first_press_unlocks_audio() {
        let mut s = session(PlayMode::Momentary);
        assert_eq!(s.audio_state(), AudioState::Suspended);
        s.pointer_down(0, 1, 0.0).unwrap();
        assert_eq!(s.audio_state(), AudioState::Running);
        let out = s.render(800);
        assert!(out.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn momentary_release_stops_and_snaps_back() {
        let mut s = session(PlayMode::Momentary);
        let a = s.key_index(NoteName::A).unwrap();
        s.pointer_down(a, 7, 1.0).unwrap();
        s.pointer_move(a, 7, 0.0).unwrap();
        assert_eq!(s.active_voice(NoteName::A).unwrap().cent, 100.0);
        s.pointer_up(a, 7, 2.0).unwrap();
        assert!(!s.is_active(NoteName::A));

        let view = &s.key_views()[a];
        assert_eq!(view.cent, 0.0);
        assert_eq!(view.label, "0.0 cent");
        assert!(view.snapping_back);
        s.tick(2.5);
        assert!(!s.key_views()[a].snapping_back);
    }

    #[test]
    fn equal_tempered_drag_never_bends() {
        let mut s = session(PlayMode::EqualTempered);
        let a = s.key_index(NoteName::A).unwrap();
        s.pointer_down(a, 1, 0.0).unwrap();
        s.pointer_move(a, 1, 0.1).unwrap();
        assert_eq!(voice_hz(&s, NoteName::A), 440.0);
        s.pointer_up(a, 1, 0.2).unwrap();
        assert!(!s.is_active(NoteName::A));
    }

    #[test]
    fn octave_change_only_affects_new_notes() {
        let mut s = session(PlayMode::Momentary);
        s.start_note(NoteName::A, 0.0);
        s.octave_up();
        assert_eq!(s.octave(), 5);
        s.update_cent(NoteName::A, 0.0);
        assert_eq!(voice_hz(&s, NoteName::A), 440.0);
        s.start_note(NoteName::C, 0.0);
        assert_eq!(s.active_voice(NoteName::C).unwrap().context.octave, 5);
    }

    #[test]
    fn octave_is_bounded() {
        let mut s = session(PlayMode::Momentary);
        for _ in 0..20 {
            s.octave_down();
        }
        assert_eq!(s.octave(), OCTAVE_RANGE.0);
        for _ in 0..20 {
            s.octave_up();
        }
        assert_eq!(s.octave(), OCTAVE_RANGE.1);
    }

    #[test]
    fn unknown_timbre_keeps_selection() {
        let mut s = session(PlayMode::Momentary);
        s.set_timbre_name("fm_bell").unwrap();
        assert_eq!(s.timbre(), Timbre::FmBell);
        let err = s.set_timbre_name("kazoo").unwrap_err();
        assert!(matches!(err, KeyboardError::UnsupportedTimbre { .. }));
        assert_eq!(s.timbre(), Timbre::FmBell);
    }

    #[test]
    fn timbre_change_only_affects_new_notes() {
        let mut s = session(PlayMode::Momentary);
        s.start_note(NoteName::E, 0.0);
        s.set_timbre(Timbre::NoisePink);
        s.start_note(NoteName::F, 0.0);
        assert_eq!(s.active_voice(NoteName::E).unwrap().context.timbre, Timbre::Sine);
        assert_eq!(s.active_voice(NoteName::F).unwrap().context.timbre, Timbre::NoisePink);
    }

    #[test]
    fn scale_switch_rebuilds_keys() {
        let mut s = session(PlayMode::Momentary);
        assert_eq!(s.key_views().len(), 12);
        s.set_scale(ScaleMode::Diatonic, 0.0);
        assert_eq!(s.key_views().len(), 7);
        assert!(matches!(
            s.pointer_down(9, 1, 0.0),
            Err(KeyboardError::KeyOutOfRange { index: 9, len: 7 })
        ));
    }

    #[test]
    fn mode_switch_mid_drag_stops_orphan() {
        let mut s = session(PlayMode::Momentary);
        s.pointer_down(0, 1, 0.0).unwrap();
        assert!(s.is_active(NoteName::C));
        s.set_play_mode(PlayMode::Toggled, 0.1);
        assert!(!s.is_active(NoteName::C));
        assert_eq!(s.play_mode(), PlayMode::Toggled);
        assert!(s.key_views().iter().all(|v| !v.dragging));
    }

    #[test]
    fn toggled_notes_survive_mode_switch() {
        let mut s = session(PlayMode::Toggled);
        s.pointer_down(0, 1, 0.0).unwrap();
        s.pointer_move(0, 1, 0.4).unwrap();
        s.set_play_mode(PlayMode::Momentary, 0.1);
        assert!(s.is_active(NoteName::C));
        assert!(s.key_views()[0].lit);
    }

    #[test]
    fn master_gain_scales_the_bus() {
        let mut s = session(PlayMode::Momentary);
        s.resume();
        s.start_note(NoteName::A, 0.0);
        let loud = s.render(800).iter().fold(0.0_f32, |m, x| m.max(x.abs()));
        s.set_master_gain(0.0);
        assert_eq!(s.master_gain(), 0.0);
        assert!(s.render(800).iter().all(|&x| x == 0.0));
        assert!(loud > 0.0);
    }

    #[test]
    fn suspend_then_press_unlocks_again() {
        let mut s = session(PlayMode::Momentary);
        s.resume();
        s.suspend();
        assert_eq!(s.audio_state(), AudioState::Suspended);
        s.pointer_down(0, 1, 0.0).unwrap();
        assert_eq!(s.audio_state(), AudioState::Running);
    }

    #[test]
    fn nan_track_bounds_do_not_abort_gestures() {
        let mut s = session(PlayMode::Momentary);
        s.set_track_bounds(f64::NAN, 100.0);
        s.pointer_down(0, 1, 0.0).unwrap();
        s.pointer_move(0, 1, 50.0).unwrap();
        assert_eq!(s.active_voice(NoteName::C).unwrap().cent, 0.0);
        s.update_cent(NoteName::C, f64::NAN);
        assert!(s.render(400).iter().all(|x| x.is_finite()));
    }

    #[test]
    fn panic_silences_everything() {
        let mut s = session(PlayMode::Toggled);
        s.pointer_down(0, 1, 0.0).unwrap();
        s.pointer_up(0, 1, 0.0).unwrap();
        s.pointer_down(4, 2, 0.0).unwrap();
        s.panic(0.5);
        assert!(s.active_notes().is_empty());
        assert!(s.key_views().iter().all(|v| !v.lit && !v.dragging));
    }

    #[test]
    fn redundant_operations_are_silent() {
        let mut s = session(PlayMode::Momentary);
        s.stop_note(NoteName::G);
        s.update_cent(NoteName::G, 30.0);
        s.start_note(NoteName::G, 10.0);
        s.start_note(NoteName::G, 80.0);
        assert_eq!(s.active_voice(NoteName::G).unwrap().cent, 10.0);
        assert_eq!(s.synth().engine().voice_count(), 1);
    }
}
