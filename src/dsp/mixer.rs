//! Mix bus. Sums every sounding voice and applies the master gain.

/// The shared bus all voices are summed into before output and capture.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new(master_gain: f64) -> Self {
        Mixer {
            master_gain,
            buffer: Vec::new(),
        }
    }

    /// Prepare a zeroed block of `num_samples`.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    /// Accumulate a sample at the given index of the current block.
    pub fn add(&mut self, index: usize, sample: f64) {
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot += sample;
        }
    }

    /// The current block after master gain, as `f32` output samples.
    pub fn output(&self) -> Vec<f32> {
        self.buffer
            .iter()
            .map(|&s| (s * self.master_gain) as f32)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_is_silent() {
        let mut m = Mixer::new(0.3);
        m.clear(128);
        let out = m.output();
        assert_eq!(out.len(), 128);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sums_then_scales() {
        let mut m = Mixer::new(0.5);
        m.clear(3);
        m.add(0, 0.5);
        m.add(0, 0.3);
        m.add(1, 1.0);
        m.add(7, 1.0); // out of block, dropped
        let out = m.output();
        assert!((out[0] - 0.4).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 0.0);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn clear_resets_previous_block() {
        let mut m = Mixer::new(1.0);
        m.clear(2);
        m.add(0, 1.0);
        m.clear(2);
        assert!(m.output().iter().all(|&s| s == 0.0));
    }
}
