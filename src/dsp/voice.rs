//! A voice is one sounding note: a timbre-specific source shaped by a gain envelope.
//!
//! The signal topology of each timbre lives behind the [`Source`] trait;
//! [`VoiceHandle`] adds the start/stop/retune lifecycle common to all of
//! them.

use std::fmt;

use super::envelope::{Envelope, EnvelopeShape};
use super::filter::{BiquadFilter, FilterType};
use super::noise::{NoiseColor, NoiseGenerator};
use super::oscillator::{Oscillator, Waveform};

/// A pitched or unpitched signal topology, before the output envelope.
pub trait Source: fmt::Debug {
    /// Produce the next raw sample.
    fn next_sample(&mut self) -> f64;

    /// Retune to a new base frequency. Unpitched sources ignore this.
    fn set_frequency(&mut self, hz: f64);

    /// Current base frequency, or `None` for unpitched sources.
    fn frequency(&self) -> Option<f64>;
}

/// Lifecycle of a voice as seen by the note registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Created,
    Sounding,
    Releasing,
    Finished,
}

/// A playable voice: start it, retune it, stop it.
#[derive(Debug)]
pub struct VoiceHandle {
    source: Box<dyn Source>,
    envelope: Envelope,
}

impl VoiceHandle {
    pub fn new(source: Box<dyn Source>, shape: EnvelopeShape, sample_rate: f64) -> Self {
        VoiceHandle {
            source,
            envelope: Envelope::new(shape, sample_rate),
        }
    }

    /// Begin the attack ramp. No effect once stopped.
    pub fn start(&mut self) {
        self.envelope.gate_on();
    }

    /// Begin the release ramp. The voice reports finished only after the
    /// ramp completes; calling this again has no further effect.
    pub fn stop(&mut self) {
        self.envelope.gate_off();
    }

    /// Retune immediately, without glide.
    pub fn set_frequency(&mut self, hz: f64) {
        self.source.set_frequency(hz);
    }

    pub fn frequency(&self) -> Option<f64> {
        self.source.frequency()
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.envelope.is_finished() {
            return 0.0;
        }
        let gain = self.envelope.next_sample();
        self.source.next_sample() * gain
    }

    pub fn state(&self) -> VoiceState {
        if self.envelope.is_finished() {
            VoiceState::Finished
        } else if self.envelope.is_released() {
            VoiceState::Releasing
        } else if self.envelope.is_gated() {
            VoiceState::Sounding
        } else {
            VoiceState::Created
        }
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }
}

// ── Topologies ──────────────────────────────────────────────

/// One periodic oscillator.
#[derive(Debug, Clone)]
pub struct Basic {
    osc: Oscillator,
}

impl Basic {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Basic {
            osc: Oscillator::new(waveform, frequency, sample_rate),
        }
    }
}

impl Source for Basic {
    fn next_sample(&mut self) -> f64 {
        self.osc.next_sample()
    }

    fn set_frequency(&mut self, hz: f64) {
        self.osc.frequency = hz;
    }

    fn frequency(&self) -> Option<f64> {
        Some(self.osc.frequency)
    }
}

/// Several detuned copies of one waveform, each attenuated by 1/N.
#[derive(Debug, Clone)]
pub struct Layered {
    layers: Vec<Oscillator>,
}

impl Layered {
    /// `layers` oscillators spread evenly over ±`spread` cents.
    pub fn new(waveform: Waveform, layers: usize, spread: f64, frequency: f64, sample_rate: f64) -> Self {
        let layers = layers.max(1);
        let step = if layers > 1 { 2.0 * spread / (layers - 1) as f64 } else { 0.0 };
        let layers = (0..layers)
            .map(|i| {
                let detune = if step == 0.0 { 0.0 } else { -spread + step * i as f64 };
                Oscillator::new(waveform, frequency, sample_rate).detuned(detune)
            })
            .collect();
        Layered { layers }
    }

    pub fn detunes(&self) -> Vec<f64> {
        self.layers.iter().map(|o| o.detune).collect()
    }
}

impl Source for Layered {
    fn next_sample(&mut self) -> f64 {
        let n = self.layers.len() as f64;
        self.layers.iter_mut().map(|o| o.next_sample() / n).sum()
    }

    fn set_frequency(&mut self, hz: f64) {
        for o in self.layers.iter_mut() {
            o.frequency = hz;
        }
    }

    fn frequency(&self) -> Option<f64> {
        self.layers.first().map(|o| o.frequency)
    }
}

/// Square wave whose gain is swept by a slow LFO.
#[derive(Debug, Clone)]
pub struct Pulse {
    osc: Oscillator,
    lfo: Oscillator,
    base_gain: f64,
}

impl Pulse {
    pub fn new(frequency: f64, lfo_rate: f64, base_gain: f64, sample_rate: f64) -> Self {
        Pulse {
            osc: Oscillator::new(Waveform::Square, frequency, sample_rate),
            lfo: Oscillator::new(Waveform::Sine, lfo_rate, sample_rate),
            base_gain,
        }
    }
}

impl Source for Pulse {
    fn next_sample(&mut self) -> f64 {
        let gain = self.base_gain + self.lfo.next_sample();
        self.osc.next_sample() * gain
    }

    fn set_frequency(&mut self, hz: f64) {
        self.osc.frequency = hz;
    }

    fn frequency(&self) -> Option<f64> {
        Some(self.osc.frequency)
    }
}

/// Oscillator through a fixed biquad.
#[derive(Debug, Clone)]
pub struct Filtered {
    osc: Oscillator,
    filter: BiquadFilter,
}

impl Filtered {
    pub fn new(
        waveform: Waveform,
        frequency: f64,
        filter_type: FilterType,
        cutoff: f64,
        sample_rate: f64,
    ) -> Self {
        Filtered {
            osc: Oscillator::new(waveform, frequency, sample_rate),
            filter: BiquadFilter::new(filter_type, cutoff, sample_rate),
        }
    }
}

impl Source for Filtered {
    fn next_sample(&mut self) -> f64 {
        self.filter.process(self.osc.next_sample())
    }

    fn set_frequency(&mut self, hz: f64) {
        self.osc.frequency = hz;
    }

    fn frequency(&self) -> Option<f64> {
        Some(self.osc.frequency)
    }
}

/// Two-operator FM: a sine modulator drives the carrier's frequency.
#[derive(Debug, Clone)]
pub struct FmPair {
    carrier: Oscillator,
    modulator: Oscillator,
    /// Modulator frequency as a multiple of the carrier.
    ratio: f64,
    /// Peak frequency deviation as a multiple of the carrier.
    index: f64,
}

impl FmPair {
    pub fn new(frequency: f64, ratio: f64, index: f64, sample_rate: f64) -> Self {
        FmPair {
            carrier: Oscillator::new(Waveform::Sine, frequency, sample_rate),
            modulator: Oscillator::new(Waveform::Sine, frequency * ratio, sample_rate),
            ratio,
            index,
        }
    }

    pub fn modulator_frequency(&self) -> f64 {
        self.modulator.frequency
    }

    pub fn depth(&self) -> f64 {
        self.carrier.frequency * self.index
    }
}

impl Source for FmPair {
    fn next_sample(&mut self) -> f64 {
        let deviation = self.modulator.next_sample() * self.depth();
        self.carrier.next_sample_offset(deviation)
    }

    fn set_frequency(&mut self, hz: f64) {
        self.carrier.frequency = hz;
        self.modulator.frequency = hz * self.ratio;
    }

    fn frequency(&self) -> Option<f64> {
        Some(self.carrier.frequency)
    }
}

/// Sine tone plus band-passed breath noise centred on the tone.
#[derive(Debug, Clone)]
pub struct Breath {
    tone: Oscillator,
    noise: NoiseGenerator,
    band: BiquadFilter,
}

impl Breath {
    const TONE_GAIN: f64 = 0.8;
    const NOISE_LEVEL: f64 = 0.3;
    const NOISE_GAIN: f64 = 0.2;

    pub fn new(frequency: f64, seed: u64, sample_rate: f64) -> Self {
        Breath {
            tone: Oscillator::new(Waveform::Sine, frequency, sample_rate),
            noise: NoiseGenerator::new(NoiseColor::White, seed),
            band: BiquadFilter::new(FilterType::Bandpass, frequency, sample_rate),
        }
    }

    pub fn band_frequency(&self) -> f64 {
        self.band.frequency()
    }
}

impl Source for Breath {
    fn next_sample(&mut self) -> f64 {
        let breath = self.band.process(self.noise.white() * Self::NOISE_LEVEL);
        self.tone.next_sample() * Self::TONE_GAIN + breath * Self::NOISE_GAIN
    }

    fn set_frequency(&mut self, hz: f64) {
        self.tone.frequency = hz;
        self.band.set_frequency(hz);
    }

    fn frequency(&self) -> Option<f64> {
        Some(self.tone.frequency)
    }
}

/// Two sines a fixed ratio apart, summed so they beat against each other.
#[derive(Debug, Clone)]
pub struct Chorus {
    a: Oscillator,
    b: Oscillator,
    ratio: f64,
}

impl Chorus {
    pub fn new(frequency: f64, ratio: f64, sample_rate: f64) -> Self {
        Chorus {
            a: Oscillator::new(Waveform::Sine, frequency, sample_rate),
            b: Oscillator::new(Waveform::Sine, frequency * ratio, sample_rate),
            ratio,
        }
    }

    pub fn partner_frequency(&self) -> f64 {
        self.b.frequency
    }
}

impl Source for Chorus {
    fn next_sample(&mut self) -> f64 {
        self.a.next_sample() + self.b.next_sample()
    }

    fn set_frequency(&mut self, hz: f64) {
        self.a.frequency = hz;
        self.b.frequency = hz * self.ratio;
    }

    fn frequency(&self) -> Option<f64> {
        Some(self.a.frequency)
    }
}

/// Unpitched noise.
#[derive(Debug, Clone)]
pub struct Noise {
    generator: NoiseGenerator,
}

impl Noise {
    pub fn new(color: NoiseColor, seed: u64) -> Self {
        Noise {
            generator: NoiseGenerator::new(color, seed),
        }
    }
}

impl Source for Noise {
    fn next_sample(&mut self) -> f64 {
        self.generator.next_sample()
    }

    fn set_frequency(&mut self, _hz: f64) {}

    fn frequency(&self) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn handle(source: impl Source + 'static) -> VoiceHandle {
        VoiceHandle::new(Box::new(source), EnvelopeShape::default(), SR)
    }

    fn peak(voice: &mut VoiceHandle, samples: usize) -> f64 {
        (0..samples).map(|_| voice.next_sample().abs()).fold(0.0, f64::max)
    }

    #[test]
    fn silent_until_started() {
        let mut v = handle(Basic::new(Waveform::Square, 440.0, SR));
        assert_eq!(peak(&mut v, 1000), 0.0);
        assert_eq!(v.state(), VoiceState::Created);
        v.start();
        assert!(peak(&mut v, 4410) > 0.25);
        assert_eq!(v.state(), VoiceState::Sounding);
    }

    #[test]
    fn stop_waits_for_release_ramp() {
        let mut v = handle(Basic::new(Waveform::Sine, 440.0, SR));
        v.start();
        peak(&mut v, 4410);
        v.stop();
        assert_eq!(v.state(), VoiceState::Releasing);
        // 0.05s release = 2205 samples
        peak(&mut v, 2000);
        assert!(!v.is_finished(), "voice must not finish before the release ramp ends");
        peak(&mut v, 300);
        assert!(v.is_finished());
        v.stop();
        assert_eq!(v.state(), VoiceState::Finished);
        assert_eq!(v.next_sample(), 0.0);
    }

    #[test]
    fn layered_spread_is_symmetric() {
        let l = Layered::new(Waveform::Sawtooth, 6, 24.0, 220.0, SR);
        let d = l.detunes();
        assert_eq!(d.len(), 6);
        assert!((d[0] + 24.0).abs() < 1e-9 && (d[5] - 24.0).abs() < 1e-9);
        for i in 0..6 {
            assert!((d[i] + d[5 - i]).abs() < 1e-9, "detune not symmetric: {d:?}");
        }
    }

    #[test]
    fn layered_retune_keeps_detune() {
        let mut l = Layered::new(Waveform::Sawtooth, 6, 24.0, 220.0, SR);
        let before = l.detunes();
        l.set_frequency(330.0);
        assert_eq!(l.frequency(), Some(330.0));
        assert_eq!(l.detunes(), before);
    }

    #[test]
    fn fm_retune_is_proportional() {
        let mut fm = FmPair::new(200.0, 3.0, 0.8, SR);
        assert_eq!(fm.modulator_frequency(), 600.0);
        fm.set_frequency(300.0);
        assert_eq!(fm.frequency(), Some(300.0));
        assert_eq!(fm.modulator_frequency(), 900.0);
        assert!((fm.depth() - 240.0).abs() < 1e-9);
        for _ in 0..4410 {
            let s = fm.next_sample();
            assert!(s.abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn breath_band_tracks_pitch() {
        let mut b = Breath::new(440.0, 3, SR);
        b.set_frequency(523.25);
        assert_eq!(b.band_frequency(), 523.25);
        assert_eq!(b.frequency(), Some(523.25));
    }

    #[test]
    fn chorus_pair_beats() {
        // 1% detune at 400Hz beats at 4Hz: the envelope of the sum dips.
        let mut c = Chorus::new(400.0, 1.01, SR);
        assert!((c.partner_frequency() - 404.0).abs() < 1e-9);
        let window = 441;
        let peaks: Vec<f64> = (0..100)
            .map(|_| (0..window).map(|_| c.next_sample().abs()).fold(0.0, f64::max))
            .collect();
        let max = peaks.iter().cloned().fold(0.0, f64::max);
        let min = peaks.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max > 1.8, "in-phase peaks should approach 2, got {max}");
        assert!(min < 0.5, "beating should cancel near anti-phase, got {min}");
    }

    #[test]
    fn noise_ignores_pitch() {
        let mut n = handle(Noise::new(NoiseColor::Brown, 9));
        n.set_frequency(1000.0);
        assert_eq!(n.frequency(), None);
        n.start();
        assert!(peak(&mut n, 4410) > 0.0);
    }

    #[test]
    fn pulse_gain_moves_with_lfo() {
        let mut p = Pulse::new(220.0, 2.0, 0.3, SR);
        // Quarter of an LFO cycle in: gain near 1.3.
        let quarter = (SR / 8.0) as usize;
        for _ in 0..quarter - 200 {
            p.next_sample();
        }
        let near_top = (0..400).map(|_| p.next_sample().abs()).fold(0.0, f64::max);
        assert!(near_top > 1.2, "LFO crest should lift the gain, got {near_top}");
    }
}
