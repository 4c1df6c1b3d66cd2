//! Biquad filter with WebAudio BiquadFilterNode-style coefficients.

use std::f64::consts::PI;

/// Filter response used by the voice recipes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

/// A biquad IIR filter (2nd order), Direct Form II Transposed.
///
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, frequency: f64, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency,
            q: 0.707, // Butterworth
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        };
        f.update_coefficients();
        f
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Retune the cutoff/centre; coefficients update immediately.
    pub fn set_frequency(&mut self, freq: f64) {
        self.frequency = freq;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        // Keep the cutoff strictly inside (0, Nyquist) so high octaves stay stable.
        let nyquist = self.sample_rate / 2.0;
        let freq = self.frequency.clamp(1.0, nyquist * 0.98);
        let w0 = 2.0 * PI * freq / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            FilterType::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_amplitude(filter: &mut BiquadFilter, freq: f64, sample_rate: f64) -> f64 {
        let mut max_out = 0.0_f64;
        for i in 0..(sample_rate as usize / 5) {
            let t = i as f64 / sample_rate;
            let out = filter.process((2.0 * PI * freq * t).sin());
            if i > 2000 {
                max_out = max_out.max(out.abs());
            }
        }
        max_out
    }

    #[test]
    fn pad_lowpass_darkens_highs() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 1200.0, 44100.0);
        let low = steady_amplitude(&mut f, 200.0, 44100.0);
        let mut f = BiquadFilter::new(FilterType::Lowpass, 1200.0, 44100.0);
        let high = steady_amplitude(&mut f, 10000.0, 44100.0);
        assert!(low > 0.9, "200Hz should pass a 1200Hz lowpass, got {low}");
        assert!(high < 0.05, "10kHz should be cut, got {high}");
    }

    #[test]
    fn violin_highpass_blocks_dc() {
        let mut f = BiquadFilter::new(FilterType::Highpass, 500.0, 44100.0);
        let mut output = 1.0;
        for _ in 0..5000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 0.001, "Highpass should block DC, got {output}");
    }

    #[test]
    fn bandpass_follows_retune() {
        let mut f = BiquadFilter::new(FilterType::Bandpass, 300.0, 44100.0);
        let off = steady_amplitude(&mut f, 3000.0, 44100.0);
        let mut f = BiquadFilter::new(FilterType::Bandpass, 300.0, 44100.0);
        f.set_frequency(3000.0);
        assert_eq!(f.frequency(), 3000.0);
        let on = steady_amplitude(&mut f, 3000.0, 44100.0);
        assert!(on > 0.9, "centre frequency should pass, got {on}");
        assert!(off < on / 3.0, "off-centre tone should be weaker: {off} vs {on}");
    }

    #[test]
    fn cutoff_above_nyquist_stays_finite() {
        let mut f = BiquadFilter::new(FilterType::Bandpass, 40000.0, 44100.0);
        for i in 0..10000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            let out = f.process(input);
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
