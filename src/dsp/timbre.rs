//! Timbres and the registry of voice recipes that build them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyboardError;

use super::envelope::EnvelopeShape;
use super::filter::FilterType;
use super::noise::NoiseColor;
use super::oscillator::Waveform;
use super::voice::{Basic, Breath, Chorus, Filtered, FmPair, Layered, Noise, Pulse, Source, VoiceHandle};

/// Every selectable timbre, named as the wave selector names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timbre {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Supersaw,
    Pwm,
    Softpad,
    FmBell,
    FmEp,
    FmBass,
    FmLead,
    FluteLike,
    ViolinLike,
    Hollow,
    NoiseWhite,
    NoisePink,
    NoiseBrown,
}

impl Timbre {
    pub const ALL: [Timbre; 17] = [
        Timbre::Sine,
        Timbre::Square,
        Timbre::Triangle,
        Timbre::Sawtooth,
        Timbre::Supersaw,
        Timbre::Pwm,
        Timbre::Softpad,
        Timbre::FmBell,
        Timbre::FmEp,
        Timbre::FmBass,
        Timbre::FmLead,
        Timbre::FluteLike,
        Timbre::ViolinLike,
        Timbre::Hollow,
        Timbre::NoiseWhite,
        Timbre::NoisePink,
        Timbre::NoiseBrown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Timbre::Sine => "sine",
            Timbre::Square => "square",
            Timbre::Triangle => "triangle",
            Timbre::Sawtooth => "sawtooth",
            Timbre::Supersaw => "supersaw",
            Timbre::Pwm => "pwm",
            Timbre::Softpad => "softpad",
            Timbre::FmBell => "fm_bell",
            Timbre::FmEp => "fm_ep",
            Timbre::FmBass => "fm_bass",
            Timbre::FmLead => "fm_lead",
            Timbre::FluteLike => "flute_like",
            Timbre::ViolinLike => "violin_like",
            Timbre::Hollow => "hollow",
            Timbre::NoiseWhite => "noise_white",
            Timbre::NoisePink => "noise_pink",
            Timbre::NoiseBrown => "noise_brown",
        }
    }

    /// Noise timbres have no pitch.
    pub fn is_noise(self) -> bool {
        matches!(self, Timbre::NoiseWhite | Timbre::NoisePink | Timbre::NoiseBrown)
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timbre {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timbre::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| KeyboardError::UnsupportedTimbre { name: s.to_string() })
    }
}

/// Inputs every recipe receives.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext {
    pub frequency: f64,
    pub sample_rate: f64,
    /// Seed for any random source in the topology.
    pub seed: u64,
}

/// How to build one timbre: its topology and its envelope.
#[derive(Clone, Copy)]
pub struct Recipe {
    pub shape: EnvelopeShape,
    pub build: fn(&BuildContext) -> Box<dyn Source>,
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe").field("shape", &self.shape).finish()
    }
}

const NOMINAL: f64 = 0.3;
const TONE: EnvelopeShape = EnvelopeShape::new(0.02, 0.05, NOMINAL);
const STANDARD: EnvelopeShape = EnvelopeShape::new(0.05, 0.05, NOMINAL);
const SWELL: EnvelopeShape = EnvelopeShape::new(0.1, 0.05, NOMINAL);
const PAD: EnvelopeShape = EnvelopeShape::new(0.4, 0.3, NOMINAL);
/// The pulse recipe carries its own gain stage (0.3 + LFO), so the
/// envelope only fades it in and out.
const UNITY: EnvelopeShape = EnvelopeShape::new(0.05, 0.05, 1.0);

const SUPERSAW_LAYERS: usize = 6;
const SUPERSAW_SPREAD: f64 = 24.0;
const PWM_LFO_HZ: f64 = 2.0;
const PAD_CUTOFF: f64 = 1200.0;
const VIOLIN_CUTOFF: f64 = 500.0;
const HOLLOW_RATIO: f64 = 1.01;

fn basic(waveform: Waveform) -> Recipe {
    let build: fn(&BuildContext) -> Box<dyn Source> = match waveform {
        Waveform::Sine => |c| Box::new(Basic::new(Waveform::Sine, c.frequency, c.sample_rate)),
        Waveform::Square => |c| Box::new(Basic::new(Waveform::Square, c.frequency, c.sample_rate)),
        Waveform::Triangle => |c| Box::new(Basic::new(Waveform::Triangle, c.frequency, c.sample_rate)),
        Waveform::Sawtooth => |c| Box::new(Basic::new(Waveform::Sawtooth, c.frequency, c.sample_rate)),
    };
    Recipe { shape: TONE, build }
}

/// FM presets as (modulator ratio, modulation index).
fn fm_preset(timbre: Timbre) -> Option<(f64, f64)> {
    match timbre {
        Timbre::FmBell => Some((2.0, 1.5)),
        Timbre::FmEp => Some((1.0, 0.6)),
        Timbre::FmBass => Some((3.0, 0.8)),
        Timbre::FmLead => Some((1.0, 1.2)),
        _ => None,
    }
}

/// Maps each timbre to the recipe that builds its voices.
#[derive(Debug, Clone)]
pub struct TimbreRegistry {
    recipes: HashMap<Timbre, Recipe>,
    sample_rate: f64,
    next_seed: u64,
}

impl TimbreRegistry {
    /// An empty registry; every timbre is unsupported until registered.
    pub fn empty(sample_rate: f64) -> Self {
        TimbreRegistry {
            recipes: HashMap::new(),
            sample_rate,
            next_seed: 0x5eed_0001,
        }
    }

    /// A registry with a recipe for every [`Timbre`].
    pub fn new(sample_rate: f64) -> Self {
        let mut reg = Self::empty(sample_rate);
        reg.register(Timbre::Sine, basic(Waveform::Sine));
        reg.register(Timbre::Square, basic(Waveform::Square));
        reg.register(Timbre::Triangle, basic(Waveform::Triangle));
        reg.register(Timbre::Sawtooth, basic(Waveform::Sawtooth));
        reg.register(
            Timbre::Supersaw,
            Recipe {
                shape: STANDARD,
                build: |c| {
                    Box::new(Layered::new(
                        Waveform::Sawtooth,
                        SUPERSAW_LAYERS,
                        SUPERSAW_SPREAD,
                        c.frequency,
                        c.sample_rate,
                    ))
                },
            },
        );
        reg.register(
            Timbre::Pwm,
            Recipe {
                shape: UNITY,
                build: |c| Box::new(Pulse::new(c.frequency, PWM_LFO_HZ, NOMINAL, c.sample_rate)),
            },
        );
        reg.register(
            Timbre::Softpad,
            Recipe {
                shape: PAD,
                build: |c| {
                    Box::new(Filtered::new(
                        Waveform::Sine,
                        c.frequency,
                        FilterType::Lowpass,
                        PAD_CUTOFF,
                        c.sample_rate,
                    ))
                },
            },
        );
        reg.register(Timbre::FmBell, Recipe { shape: STANDARD, build: |c| fm(Timbre::FmBell, c) });
        reg.register(Timbre::FmEp, Recipe { shape: STANDARD, build: |c| fm(Timbre::FmEp, c) });
        reg.register(Timbre::FmBass, Recipe { shape: STANDARD, build: |c| fm(Timbre::FmBass, c) });
        reg.register(Timbre::FmLead, Recipe { shape: STANDARD, build: |c| fm(Timbre::FmLead, c) });
        reg.register(
            Timbre::FluteLike,
            Recipe {
                shape: STANDARD,
                build: |c| Box::new(Breath::new(c.frequency, c.seed, c.sample_rate)),
            },
        );
        reg.register(
            Timbre::ViolinLike,
            Recipe {
                shape: SWELL,
                build: |c| {
                    Box::new(Filtered::new(
                        Waveform::Sawtooth,
                        c.frequency,
                        FilterType::Highpass,
                        VIOLIN_CUTOFF,
                        c.sample_rate,
                    ))
                },
            },
        );
        reg.register(
            Timbre::Hollow,
            Recipe {
                shape: SWELL,
                build: |c| Box::new(Chorus::new(c.frequency, HOLLOW_RATIO, c.sample_rate)),
            },
        );
        reg.register(
            Timbre::NoiseWhite,
            Recipe {
                shape: STANDARD,
                build: |c| Box::new(Noise::new(NoiseColor::White, c.seed)),
            },
        );
        reg.register(
            Timbre::NoisePink,
            Recipe {
                shape: STANDARD,
                build: |c| Box::new(Noise::new(NoiseColor::Pink, c.seed)),
            },
        );
        reg.register(
            Timbre::NoiseBrown,
            Recipe {
                shape: STANDARD,
                build: |c| Box::new(Noise::new(NoiseColor::Brown, c.seed)),
            },
        );
        reg
    }

    pub fn register(&mut self, timbre: Timbre, recipe: Recipe) {
        self.recipes.insert(timbre, recipe);
    }

    pub fn recipe(&self, timbre: Timbre) -> Option<&Recipe> {
        self.recipes.get(&timbre)
    }

    /// Build an unstarted voice for `timbre` at `frequency` Hz.
    pub fn create(&mut self, timbre: Timbre, frequency: f64) -> Result<VoiceHandle, KeyboardError> {
        let recipe = *self
            .recipes
            .get(&timbre)
            .ok_or_else(|| KeyboardError::UnsupportedTimbre { name: timbre.to_string() })?;
        self.next_seed = self.next_seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let ctx = BuildContext {
            frequency,
            sample_rate: self.sample_rate,
            seed: self.next_seed,
        };
        Ok(VoiceHandle::new((recipe.build)(&ctx), recipe.shape, self.sample_rate))
    }
}

fn fm(timbre: Timbre, c: &BuildContext) -> Box<dyn Source> {
    let (ratio, index) = fm_preset(timbre).unwrap_or((1.0, 1.0));
    Box::new(FmPair::new(c.frequency, ratio, index, c.sample_rate))
}
