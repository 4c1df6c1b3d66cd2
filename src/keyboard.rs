//! Key row and the per-key pitch-bend gesture state machine.
//!
//! Each key is a vertical slider. Pressing the thumb starts its note,
//! dragging bends it (top = +100 cents, centre = 0, bottom = −100) and
//! releasing ends the gesture according to the play mode the key was
//! built for:
//!
//! | Mode          | Press                           | Drag        | Release                    |
//! |---------------|---------------------------------|-------------|----------------------------|
//! | Momentary     | start at 0 cent                 | bend        | stop, snap back to centre  |
//! | Toggled       | start at last cent, or stop     | bend        | keep sounding              |
//! | EqualTempered | start                           | ignored     | stop                       |

use std::collections::HashMap;

use serde::Serialize;

use crate::error::KeyboardError;
use crate::pitch::{MAX_CENT, NoteName, PlayMode, ScaleMode, clamp_cent};

/// Identifier of the pointer (finger, pen, mouse) driving a gesture.
pub type PointerId = i32;

/// What a key needs from the synth side.
pub trait NoteSink {
    fn start_note(&mut self, note: NoteName, cent: f64);
    fn stop_note(&mut self, note: NoteName);
    fn update_cent(&mut self, note: NoteName, cent: f64);
    fn is_active(&self, note: NoteName) -> bool;
    /// One-time audio unlock on the first user gesture.
    fn resume_audio(&mut self);
}

/// Vertical extent of a key's track in the shell's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackBounds {
    pub top: f64,
    pub height: f64,
}

impl Default for TrackBounds {
    /// Normalized coordinates: the shell passes y in [0, 1].
    fn default() -> Self {
        TrackBounds { top: 0.0, height: 1.0 }
    }
}

impl TrackBounds {
    pub fn new(top: f64, height: f64) -> Self {
        TrackBounds { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Normalized position of `y` on the track, clamped to [0, 1]
    /// (0 = top). Degenerate input lands on the centre.
    pub fn position(&self, y: f64) -> f64 {
        if !self.top.is_finite() || !self.height.is_finite() || !(self.height > 0.0) || y.is_nan() {
            return 0.5;
        }
        let y = y.clamp(self.top, self.bottom());
        (y - self.top) / self.height
    }
}

/// Cent offset for a normalized track position.
pub fn cent_from_position(t: f64) -> f64 {
    clamp_cent((0.5 - t) / 0.5 * MAX_CENT)
}

/// Normalized track position for a cent offset.
pub fn position_from_cent(cent: f64) -> f64 {
    (0.5 - 0.5 * cent / MAX_CENT).clamp(0.0, 1.0)
}

/// Map a pointer y to `(position, cent)` on a track.
pub fn calc(bounds: &TrackBounds, y: f64) -> (f64, f64) {
    let t = bounds.position(y);
    (t, cent_from_position(t))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grip {
    /// The thumb captured the pointer; leaving the track does not end it.
    Thumb,
    /// A tap on the bare track; leaving the track ends it.
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Dragging { pointer: PointerId, grip: Grip },
}

/// What the shell should draw for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyView {
    pub note: NoteName,
    /// Thumb position, 0 = top of track.
    pub position: f64,
    pub cent: f64,
    pub label: String,
    /// Highlighted while the key's note is held or toggled on.
    pub lit: bool,
    pub dragging: bool,
    /// The snap-back transition is running.
    pub snapping_back: bool,
}

/// One key's slider and gesture state.
#[derive(Debug, Clone)]
pub struct KeySlider {
    note: NoteName,
    mode: PlayMode,
    bounds: TrackBounds,
    gesture: Gesture,
    position: f64,
    cent: f64,
    lit: bool,
    reset_delay: f64,
    /// When the pending snap-back transition ends, if one is running.
    snap_back_until: Option<f64>,
}

impl KeySlider {
    pub fn new(note: NoteName, mode: PlayMode, cent: f64, reset_delay: f64) -> Self {
        let cent = clamp_cent(cent);
        KeySlider {
            note,
            mode,
            bounds: TrackBounds::default(),
            gesture: Gesture::Idle,
            position: position_from_cent(cent),
            cent,
            lit: false,
            reset_delay,
            snap_back_until: None,
        }
    }

    pub fn note(&self) -> NoteName {
        self.note
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn cent(&self) -> f64 {
        self.cent
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    pub fn set_bounds(&mut self, bounds: TrackBounds) {
        self.bounds = bounds;
    }

    /// Displayed cent text, e.g. `"-12.5 cent"`.
    pub fn label(&self) -> String {
        format!("{:.1} cent", self.cent)
    }

    pub fn view(&self) -> KeyView {
        KeyView {
            note: self.note,
            position: self.position,
            cent: self.cent,
            label: self.label(),
            lit: self.lit,
            dragging: self.is_dragging(),
            snapping_back: self.snap_back_until.is_some(),
        }
    }

    fn owns(&self, pointer: PointerId) -> Option<Grip> {
        match self.gesture {
            Gesture::Dragging { pointer: p, grip } if p == pointer => Some(grip),
            _ => None,
        }
    }

    fn center(&mut self) {
        self.cent = 0.0;
        self.position = 0.5;
    }

    fn apply(&mut self, sink: &mut dyn NoteSink, t: f64, cent: f64) {
        self.position = t;
        self.cent = cent;
        sink.update_cent(self.note, cent);
    }

    /// Pointer down on the thumb.
    pub fn press(&mut self, sink: &mut dyn NoteSink, pointer: PointerId, _now: f64) {
        if self.is_dragging() {
            return;
        }
        sink.resume_audio();
        self.snap_back_until = None;

        match self.mode {
            PlayMode::Momentary | PlayMode::EqualTempered => {
                self.center();
                sink.start_note(self.note, 0.0);
            }
            PlayMode::Toggled => {
                if sink.is_active(self.note) {
                    sink.stop_note(self.note);
                    self.lit = false;
                    return;
                }
                sink.start_note(self.note, self.cent);
            }
        }
        self.lit = sink.is_active(self.note);
        self.gesture = Gesture::Dragging { pointer, grip: Grip::Thumb };
    }

    /// Pointer down on the bare track at `y`.
    pub fn press_track(&mut self, sink: &mut dyn NoteSink, pointer: PointerId, y: f64, now: f64) {
        match self.mode {
            PlayMode::Toggled => {}
            PlayMode::EqualTempered => {
                self.press(sink, pointer, now);
                if let Gesture::Dragging { pointer, .. } = self.gesture {
                    self.gesture = Gesture::Dragging { pointer, grip: Grip::Track };
                }
            }
            PlayMode::Momentary => {
                if self.is_dragging() {
                    return;
                }
                sink.resume_audio();
                self.snap_back_until = None;
                let (t, cent) = calc(&self.bounds, y);
                self.position = t;
                self.cent = cent;
                sink.start_note(self.note, cent);
                self.lit = sink.is_active(self.note);
                self.gesture = Gesture::Dragging { pointer, grip: Grip::Track };
            }
        }
    }

    /// Pointer moved to `y` while possibly dragging this key.
    pub fn drag(&mut self, sink: &mut dyn NoteSink, pointer: PointerId, y: f64) {
        if self.owns(pointer).is_none() {
            return;
        }
        match self.mode {
            PlayMode::EqualTempered => {}
            PlayMode::Momentary | PlayMode::Toggled => {
                let (t, cent) = calc(&self.bounds, y);
                self.apply(sink, t, cent);
            }
        }
    }

    /// Pointer lifted.
    pub fn release(&mut self, sink: &mut dyn NoteSink, pointer: PointerId, now: f64) {
        if self.owns(pointer).is_none() {
            return;
        }
        self.end_gesture(sink, now);
    }

    /// Pointer cancelled by the platform; cleans up like a release.
    pub fn cancel(&mut self, sink: &mut dyn NoteSink, pointer: PointerId, now: f64) {
        self.release(sink, pointer, now);
    }

    /// Pointer left the track. Ends track taps; thumb drags keep going.
    pub fn leave(&mut self, sink: &mut dyn NoteSink, pointer: PointerId, now: f64) {
        if self.owns(pointer) == Some(Grip::Track) {
            self.end_gesture(sink, now);
        }
    }

    /// End whatever gesture is in flight, as if its pointer were lifted.
    pub fn settle(&mut self, sink: &mut dyn NoteSink, now: f64) {
        if self.is_dragging() {
            self.end_gesture(sink, now);
        }
    }

    fn end_gesture(&mut self, sink: &mut dyn NoteSink, now: f64) {
        self.gesture = Gesture::Idle;
        match self.mode {
            PlayMode::Momentary => {
                sink.stop_note(self.note);
                self.center();
                self.lit = false;
                self.snap_back_until = Some(now + self.reset_delay);
            }
            PlayMode::EqualTempered => {
                sink.stop_note(self.note);
                self.lit = false;
            }
            PlayMode::Toggled => {}
        }
    }

    /// Run deferred actions that are due at `now`.
    pub fn tick(&mut self, now: f64) {
        if self.snap_back_until.is_some_and(|due| now >= due) {
            self.snap_back_until = None;
        }
    }

    /// Re-sync the highlight with the synth (e.g. after a rebuild).
    fn sync_lit(&mut self, sink: &dyn NoteSink) {
        self.lit = sink.is_active(self.note);
    }
}

/// The row of keys for the current scale and play mode.
#[derive(Debug, Clone)]
pub struct Keyboard {
    mode: PlayMode,
    scale: ScaleMode,
    reset_delay: f64,
    bounds: TrackBounds,
    keys: Vec<KeySlider>,
    /// Last cent per note, carried across rebuilds.
    cent_memory: HashMap<NoteName, f64>,
}

impl Keyboard {
    pub fn new(mode: PlayMode, scale: ScaleMode, reset_delay: f64) -> Self {
        let mut kb = Keyboard {
            mode,
            scale,
            reset_delay,
            bounds: TrackBounds::default(),
            keys: Vec::new(),
            cent_memory: HashMap::new(),
        };
        kb.build_keys();
        kb
    }

    fn build_keys(&mut self) {
        self.keys = self
            .scale
            .notes()
            .iter()
            .map(|&note| {
                let cent = self.cent_memory.get(&note).copied().unwrap_or(0.0);
                let mut key = KeySlider::new(note, self.mode, cent, self.reset_delay);
                key.set_bounds(self.bounds);
                key
            })
            .collect();
    }

    /// Settle every gesture, remember each key's cent and rebuild the row
    /// for the current scale and mode.
    pub fn rebuild(&mut self, sink: &mut dyn NoteSink, now: f64) {
        for key in self.keys.iter_mut() {
            key.settle(sink, now);
            self.cent_memory.insert(key.note, key.cent);
        }
        self.build_keys();
        for key in self.keys.iter_mut() {
            key.sync_lit(sink);
        }
        log::debug!("rebuilt {} keys ({:?}, {:?})", self.keys.len(), self.scale, self.mode);
    }

    pub fn set_mode(&mut self, mode: PlayMode, sink: &mut dyn NoteSink, now: f64) {
        // Keys settle under the mode they were built for.
        self.rebuild_with(sink, now, |kb| kb.mode = mode);
    }

    pub fn set_scale(&mut self, scale: ScaleMode, sink: &mut dyn NoteSink, now: f64) {
        self.rebuild_with(sink, now, |kb| kb.scale = scale);
    }

    fn rebuild_with(&mut self, sink: &mut dyn NoteSink, now: f64, change: impl FnOnce(&mut Self)) {
        for key in self.keys.iter_mut() {
            key.settle(sink, now);
        }
        change(self);
        self.rebuild(sink, now);
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn scale(&self) -> ScaleMode {
        self.scale
    }

    /// Track geometry shared by every key.
    pub fn set_track_bounds(&mut self, bounds: TrackBounds) {
        self.bounds = bounds;
        for key in self.keys.iter_mut() {
            key.set_bounds(bounds);
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[KeySlider] {
        &self.keys
    }

    pub fn key(&self, index: usize) -> Result<&KeySlider, KeyboardError> {
        let len = self.keys.len();
        self.keys.get(index).ok_or(KeyboardError::KeyOutOfRange { index, len })
    }

    pub fn key_mut(&mut self, index: usize) -> Result<&mut KeySlider, KeyboardError> {
        let len = self.keys.len();
        self.keys.get_mut(index).ok_or(KeyboardError::KeyOutOfRange { index, len })
    }

    pub fn index_of(&self, note: NoteName) -> Option<usize> {
        self.keys.iter().position(|k| k.note == note)
    }

    pub fn views(&self) -> Vec<KeyView> {
        self.keys.iter().map(KeySlider::view).collect()
    }

    pub fn tick(&mut self, now: f64) {
        for key in self.keys.iter_mut() {
            key.tick(now);
        }
    }
}
