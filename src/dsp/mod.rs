//! DSP engine: pure Rust audio synthesis for the keyboard.
//!
//! Voices are built per note from timbre recipes, summed on a mix bus and
//! pulled block by block by the host (an AudioWorklet in the browser).
//! The same bus feeds the WAV recorder.

pub mod engine;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod recorder;
pub mod timbre;
pub mod voice;
