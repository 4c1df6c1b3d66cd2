//! Pitch-independent noise generators.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Spectral colour of a noise generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

/// Loudness makeup for the brown accumulator.
const BROWN_GAIN: f64 = 3.5;

/// A seeded noise source producing one sample per tick.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    pub color: NoiseColor,
    rng: SmallRng,
    /// Pink: three leaky integrators. Brown uses `state[0]` only.
    state: [f64; 3],
}

impl NoiseGenerator {
    pub fn new(color: NoiseColor, seed: u64) -> Self {
        NoiseGenerator {
            color,
            rng: SmallRng::seed_from_u64(seed),
            state: [0.0; 3],
        }
    }

    /// Uniform white sample in [-1, 1].
    pub fn white(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }

    pub fn next_sample(&mut self) -> f64 {
        match self.color {
            NoiseColor::White => self.white(),
            NoiseColor::Pink => {
                let w = self.white();
                let [b0, b1, b2] = &mut self.state;
                *b0 = 0.997 * *b0 + 0.029591 * w;
                *b1 = 0.985 * *b1 + 0.032534 * w;
                *b2 = 0.950 * *b2 + 0.048056 * w;
                *b0 + *b1 + *b2
            }
            NoiseColor::Brown => {
                let w = self.rng.gen_range(-0.1..=0.1);
                let last = &mut self.state[0];
                *last = (*last + w) / 1.02;
                *last * BROWN_GAIN
            }
        }
    }
}
