//! Keyboard configuration, loaded from JSON or a JS object.

use serde::{Deserialize, Serialize};

use crate::dsp::timbre::Timbre;
use crate::error::KeyboardError;
use crate::pitch::{PlayMode, ScaleMode};

/// Startup settings for a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyboardConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f64,
    /// Gain applied on the mix bus before output and capture.
    pub master_gain: f64,
    /// Initial octave shared by all keys.
    pub octave: i32,
    pub play_mode: PlayMode,
    pub scale: ScaleMode,
    pub timbre: Timbre,
    /// Samples per block delivered to the output and the recorder tap.
    pub block_size: usize,
    /// Seconds the indicator snap-back transition stays active after release.
    pub reset_delay: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        KeyboardConfig {
            sample_rate: 44100.0,
            master_gain: 0.3,
            octave: 4,
            play_mode: PlayMode::Momentary,
            scale: ScaleMode::Chromatic,
            timbre: Timbre::Sine,
            block_size: 4096,
            reset_delay: 0.18,
        }
    }
}

impl KeyboardConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, KeyboardError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, KeyboardError> {
        Ok(serde_json::to_string(self)?)
    }
}
