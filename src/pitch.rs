//! Pitch model: note names, scales, play modes and cent-accurate frequencies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyboardError;

/// Largest pitch bend in either direction, in cents.
pub const MAX_CENT: f64 = 100.0;

/// Tuning reference: A4 (MIDI 69).
pub const A4_FREQUENCY: f64 = 440.0;

/// The twelve note names a key can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "Eb")]
    EFlat,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "Bb")]
    BFlat,
    #[serde(rename = "B")]
    B,
}

const CHROMATIC: [NoteName; 12] = [
    NoteName::C,
    NoteName::CSharp,
    NoteName::D,
    NoteName::EFlat,
    NoteName::E,
    NoteName::F,
    NoteName::FSharp,
    NoteName::G,
    NoteName::GSharp,
    NoteName::A,
    NoteName::BFlat,
    NoteName::B,
];

const DIATONIC: [NoteName; 7] = [
    NoteName::C,
    NoteName::D,
    NoteName::E,
    NoteName::F,
    NoteName::G,
    NoteName::A,
    NoteName::B,
];

impl NoteName {
    /// Semitone offset within the octave, C = 0.
    pub fn semitone(self) -> i32 {
        match self {
            NoteName::C => 0,
            NoteName::CSharp => 1,
            NoteName::D => 2,
            NoteName::EFlat => 3,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::FSharp => 6,
            NoteName::G => 7,
            NoteName::GSharp => 8,
            NoteName::A => 9,
            NoteName::BFlat => 10,
            NoteName::B => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::EFlat => "Eb",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::BFlat => "Bb",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteName {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CHROMATIC
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| KeyboardError::UnknownNote { name: s.to_string() })
    }
}

/// Which scale degrees get a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// All twelve semitones.
    #[default]
    #[serde(alias = "12")]
    Chromatic,
    /// The seven natural notes C D E F G A B.
    #[serde(alias = "7")]
    Diatonic,
}

impl ScaleMode {
    pub fn notes(self) -> &'static [NoteName] {
        match self {
            ScaleMode::Chromatic => &CHROMATIC,
            ScaleMode::Diatonic => &DIATONIC,
        }
    }
}

/// How key gestures map to sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Sounds while held; dragging bends the pitch.
    #[default]
    #[serde(alias = "normal")]
    Momentary,
    /// Each press toggles the note on or off; notes keep their bend.
    #[serde(alias = "chord")]
    Toggled,
    /// Sounds while held, always at the equal-tempered pitch.
    #[serde(alias = "12tet")]
    EqualTempered,
}

/// Clamp a cent offset to the playable bend range. Non-finite input
/// counts as no bend.
pub fn clamp_cent(cent: f64) -> f64 {
    if !cent.is_finite() {
        return 0.0;
    }
    cent.clamp(-MAX_CENT, MAX_CENT)
}

/// MIDI note number for a note name in the given octave (C4 = 60).
pub fn midi_number(note: NoteName, octave: i32) -> i32 {
    12 * (octave + 1) + note.semitone()
}

/// Equal-tempered frequency of a MIDI note number at A4 = 440 Hz.
pub fn midi_to_frequency(midi: i32) -> f64 {
    A4_FREQUENCY * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Frequency in Hz of `note` in `octave`, bent by `cent_offset`.
///
/// In [`PlayMode::EqualTempered`] the bend is ignored; otherwise it is
/// clamped to ±[`MAX_CENT`].
pub fn frequency_of(note: NoteName, octave: i32, cent_offset: f64, mode: PlayMode) -> f64 {
    let base = midi_to_frequency(midi_number(note, octave));
    let cent = match mode {
        PlayMode::EqualTempered => 0.0,
        PlayMode::Momentary | PlayMode::Toggled => clamp_cent(cent_offset),
    };
    base * (2.0_f64).powf(cent / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_cent_is_no_bend() {
        assert_eq!(clamp_cent(f64::NAN), 0.0);
        assert_eq!(clamp_cent(f64::INFINITY), 0.0);
        assert_eq!(clamp_cent(f64::NEG_INFINITY), 0.0);
        let f = frequency_of(NoteName::A, 4, f64::NAN, PlayMode::Momentary);
        assert_eq!(f, 440.0);
    }

    #[test]
    fn a4_is_440_exactly() {
        let f = frequency_of(NoteName::A, 4, 0.0, PlayMode::Momentary);
        assert_eq!(f, 440.0);
    }

    #[test]
    fn c4_is_middle_c() {
        assert_eq!(midi_number(NoteName::C, 4), 60);
        let f = frequency_of(NoteName::C, 4, 0.0, PlayMode::Momentary);
        assert!((f - 261.6256).abs() < 1e-3, "C4 should be ~261.63Hz, got {f}");
    }

    #[test]
    fn cent_scaling_matches_formula() {
        for &note in ScaleMode::Chromatic.notes() {
            for octave in [-1, 2, 4, 7] {
                let base = frequency_of(note, octave, 0.0, PlayMode::Toggled);
                for cent in [-100.0, -37.5, 0.0, 12.25, 99.9] {
                    let f = frequency_of(note, octave, cent, PlayMode::Toggled);
                    let expected = base * (2.0_f64).powf(cent / 1200.0);
                    assert!(
                        (f - expected).abs() <= expected * 1e-12,
                        "{note}{octave} at {cent} cents: {f} vs {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn monotonic_in_cent() {
        let mut prev = 0.0;
        for i in -100..=100 {
            let f = frequency_of(NoteName::FSharp, 3, i as f64, PlayMode::Momentary);
            assert!(f > prev, "frequency should rise with cent at {i}");
            prev = f;
        }
    }

    #[test]
    fn equal_tempered_ignores_cent() {
        let reference = frequency_of(NoteName::G, 5, 0.0, PlayMode::EqualTempered);
        for cent in [-100.0, -3.0, 50.0, 100.0, 250.0] {
            assert_eq!(frequency_of(NoteName::G, 5, cent, PlayMode::EqualTempered), reference);
        }
    }

    #[test]
    fn cent_is_clamped() {
        let top = frequency_of(NoteName::A, 4, 100.0, PlayMode::Momentary);
        assert_eq!(frequency_of(NoteName::A, 4, 400.0, PlayMode::Momentary), top);
        let bottom = frequency_of(NoteName::A, 4, -100.0, PlayMode::Momentary);
        assert_eq!(frequency_of(NoteName::A, 4, -400.0, PlayMode::Momentary), bottom);
    }

    #[test]
    fn diatonic_reuses_chromatic_semitones() {
        let semis: Vec<i32> = ScaleMode::Diatonic.notes().iter().map(|n| n.semitone()).collect();
        assert_eq!(semis, vec![0, 2, 4, 5, 7, 9, 11]);
        assert_eq!(ScaleMode::Chromatic.notes().len(), 12);
    }

    #[test]
    fn note_names_parse() {
        assert_eq!("Bb".parse::<NoteName>().unwrap(), NoteName::BFlat);
        assert_eq!("C#".parse::<NoteName>().unwrap(), NoteName::CSharp);
        assert!("H".parse::<NoteName>().is_err());
    }

    #[test]
    fn legacy_mode_names_deserialize() {
        let m: PlayMode = serde_json::from_str("\"chord\"").unwrap();
        assert_eq!(m, PlayMode::Toggled);
        let m: PlayMode = serde_json::from_str("\"12tet\"").unwrap();
        assert_eq!(m, PlayMode::EqualTempered);
        let s: ScaleMode = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(s, ScaleMode::Diatonic);
    }
}
