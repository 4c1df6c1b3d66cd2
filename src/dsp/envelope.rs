//! Attack/release gain envelope.
//!
//! Every voice fades in from silence to its nominal level and fades back
//! out on release, so notes never start or stop with a click. The ramps
//! are linear, like `linearRampToValueAtTime` on a WebAudio gain param.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Sustain,
    Release,
    Finished,
}

/// Ramp timings and target level for one voice recipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    /// Seconds from silence to `level`.
    pub attack: f64,
    /// Seconds from the current level back to silence.
    pub release: f64,
    /// Nominal gain while held.
    pub level: f64,
}

impl EnvelopeShape {
    pub const fn new(attack: f64, release: f64, level: f64) -> Self {
        EnvelopeShape { attack, release, level }
    }
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        EnvelopeShape::new(0.05, 0.05, 0.3)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub shape: EnvelopeShape,
    stage: Stage,
    level: f64,
    sample_rate: f64,
    stage_samples: usize,
    stage_counter: usize,
    /// Level at the start of the current ramp.
    start_level: f64,
}

impl Envelope {
    pub fn new(shape: EnvelopeShape, sample_rate: f64) -> Self {
        Envelope {
            shape,
            stage: Stage::Idle,
            level: 0.0,
            sample_rate,
            stage_samples: 0,
            stage_counter: 0,
            start_level: 0.0,
        }
    }

    /// Begin the attack ramp. Ignored once the envelope has been released.
    pub fn gate_on(&mut self) {
        if matches!(self.stage, Stage::Release | Stage::Finished) {
            return;
        }
        self.stage = Stage::Attack;
        self.stage_samples = (self.shape.attack * self.sample_rate).round() as usize;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// Begin the release ramp. Repeated calls do not restart it.
    pub fn gate_off(&mut self) {
        match self.stage {
            Stage::Release | Stage::Finished => {}
            Stage::Idle => self.stage = Stage::Finished,
            Stage::Attack | Stage::Sustain => {
                self.stage = Stage::Release;
                self.stage_samples = (self.shape.release * self.sample_rate).round() as usize;
                self.stage_counter = 0;
                self.start_level = self.level;
            }
        }
    }

    /// Generate the next envelope sample in [0, level].
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Idle | Stage::Finished => {
                self.level = 0.0;
            }
            Stage::Attack => {
                let target = self.shape.level;
                if self.stage_counter >= self.stage_samples {
                    self.level = target;
                    self.stage = Stage::Sustain;
                } else {
                    self.stage_counter += 1;
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.start_level + (target - self.start_level) * t;
                    if self.stage_counter >= self.stage_samples {
                        self.stage = Stage::Sustain;
                    }
                }
            }
            Stage::Sustain => {
                self.level = self.shape.level;
            }
            Stage::Release => {
                if self.stage_counter >= self.stage_samples {
                    self.level = 0.0;
                    self.stage = Stage::Finished;
                } else {
                    self.stage_counter += 1;
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.start_level * (1.0 - t);
                    if self.stage_counter >= self.stage_samples {
                        self.level = 0.0;
                        self.stage = Stage::Finished;
                    }
                }
            }
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// True between `gate_on` and `gate_off`.
    pub fn is_gated(&self) -> bool {
        matches!(self.stage, Stage::Attack | Stage::Sustain)
    }

    pub fn is_released(&self) -> bool {
        matches!(self.stage, Stage::Release | Stage::Finished)
    }

    /// True once the release ramp has fully completed.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }
}
