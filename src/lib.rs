pub mod config;
pub mod dsp;
pub mod error;
pub mod keyboard;
pub mod notes;
pub mod pitch;
pub mod session;

use crate::config::KeyboardConfig;
use crate::error::KeyboardError;
use crate::pitch::{NoteName, PlayMode, ScaleMode};
use crate::session::Session;
use wasm_bindgen::prelude::*;

pub use crate::dsp::recorder::RECORDING_FILE_NAME;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the microtonal_keyboard version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: frequency in Hz of `note` at `octave`, bent by `cent`.
#[wasm_bindgen]
pub fn frequency_of(note: &str, octave: i32, cent: f64, mode: &str) -> Result<f64, JsValue> {
    let note: NoteName = note.parse().map_err(js_err)?;
    let mode = parse_play_mode(mode)?;
    Ok(pitch::frequency_of(note, octave, cent, mode))
}

fn js_err(e: KeyboardError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

fn parse_play_mode(s: &str) -> Result<PlayMode, JsValue> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| js_err(KeyboardError::from(e)))
}

fn parse_scale(s: &str) -> Result<ScaleMode, JsValue> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| js_err(KeyboardError::from(e)))
}

/// WASM-exposed keyboard: one session per instance.
///
/// Times (`now`) are in seconds on the shell's clock; key indices refer to
/// the current key row, left to right.
#[wasm_bindgen]
pub struct MicrotonalKeyboard {
    session: Session,
}

#[wasm_bindgen]
impl MicrotonalKeyboard {
    /// Build from a config object; `undefined` or `null` uses defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<MicrotonalKeyboard, JsValue> {
        let config: KeyboardConfig = if config.is_undefined() || config.is_null() {
            KeyboardConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?
        };
        Ok(MicrotonalKeyboard {
            session: Session::new(&config),
        })
    }

    /// Build from a JSON config string.
    pub fn from_json(json: &str) -> Result<MicrotonalKeyboard, JsValue> {
        let config = KeyboardConfig::from_json(json).map_err(js_err)?;
        Ok(MicrotonalKeyboard {
            session: Session::new(&config),
        })
    }

    pub fn start_note(&mut self, note: &str, cent: f64) -> Result<(), JsValue> {
        self.session.start_note(note.parse().map_err(js_err)?, cent);
        Ok(())
    }

    pub fn stop_note(&mut self, note: &str) -> Result<(), JsValue> {
        self.session.stop_note(note.parse().map_err(js_err)?);
        Ok(())
    }

    pub fn update_cent(&mut self, note: &str, cent: f64) -> Result<(), JsValue> {
        self.session.update_cent(note.parse().map_err(js_err)?, cent);
        Ok(())
    }

    pub fn start_recording(&mut self) {
        self.session.start_recording();
    }

    /// Stop recording and return the WAV file bytes.
    pub fn stop_recording(&mut self) -> Vec<u8> {
        self.session.stop_recording()
    }

    pub fn recording_file_name(&self) -> String {
        RECORDING_FILE_NAME.to_string()
    }

    pub fn set_play_mode(&mut self, mode: &str, now: f64) -> Result<(), JsValue> {
        let mode = parse_play_mode(mode)?;
        self.session.set_play_mode(mode, now);
        Ok(())
    }

    pub fn set_scale(&mut self, scale: &str, now: f64) -> Result<(), JsValue> {
        let scale = parse_scale(scale)?;
        self.session.set_scale(scale, now);
        Ok(())
    }

    pub fn octave(&self) -> i32 {
        self.session.octave()
    }

    pub fn octave_up(&mut self) -> i32 {
        self.session.octave_up();
        self.session.octave()
    }

    pub fn octave_down(&mut self) -> i32 {
        self.session.octave_down();
        self.session.octave()
    }

    pub fn set_timbre(&mut self, name: &str) -> Result<(), JsValue> {
        self.session.set_timbre_name(name).map_err(js_err)
    }

    pub fn timbre(&self) -> String {
        self.session.timbre().as_str().to_string()
    }

    /// One-time audio unlock; also done by the first key press.
    pub fn resume(&mut self) {
        self.session.resume();
    }

    pub fn suspend(&mut self) {
        self.session.suspend();
    }

    pub fn master_gain(&self) -> f64 {
        self.session.master_gain()
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.session.set_master_gain(gain);
    }

    /// Render the next configured block of mono samples.
    pub fn process_block(&mut self) -> Vec<f32> {
        self.session.process_block()
    }

    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        self.session.render(frames)
    }

    pub fn set_track_bounds(&mut self, top: f64, height: f64) {
        self.session.set_track_bounds(top, height);
    }

    pub fn pointer_down(&mut self, key: usize, pointer: i32, now: f64) -> Result<(), JsValue> {
        self.session.pointer_down(key, pointer, now).map_err(js_err)
    }

    pub fn track_down(&mut self, key: usize, pointer: i32, y: f64, now: f64) -> Result<(), JsValue> {
        self.session.track_down(key, pointer, y, now).map_err(js_err)
    }

    pub fn pointer_move(&mut self, key: usize, pointer: i32, y: f64) -> Result<(), JsValue> {
        self.session.pointer_move(key, pointer, y).map_err(js_err)
    }

    pub fn pointer_up(&mut self, key: usize, pointer: i32, now: f64) -> Result<(), JsValue> {
        self.session.pointer_up(key, pointer, now).map_err(js_err)
    }

    pub fn pointer_cancel(&mut self, key: usize, pointer: i32, now: f64) -> Result<(), JsValue> {
        self.session.pointer_cancel(key, pointer, now).map_err(js_err)
    }

    pub fn pointer_leave(&mut self, key: usize, pointer: i32, now: f64) -> Result<(), JsValue> {
        self.session.pointer_leave(key, pointer, now).map_err(js_err)
    }

    pub fn tick(&mut self, now: f64) {
        self.session.tick(now);
    }

    pub fn panic(&mut self, now: f64) {
        self.session.panic(now);
    }

    /// Per-key view state as an array of plain objects.
    pub fn key_views(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.key_views())
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}
