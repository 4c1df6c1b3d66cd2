//! Audio engine: owns every live voice, the mix bus and the recorder tap.
//!
//! The host pulls mono blocks with [`AudioEngine::render_block`] (from an
//! AudioWorklet or any other periodic callback). Voices that have been
//! stopped keep rendering until their release ramp completes and are then
//! dropped from the bus.

use super::mixer::Mixer;
use super::recorder::WavRecorder;
use super::voice::{VoiceHandle, VoiceState};

/// Opaque handle to a voice living on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(u64);

/// Output device state. Audio only flows once resumed by a user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Suspended,
    Running,
}

#[derive(Debug)]
pub struct AudioEngine {
    pub sample_rate: f64,
    state: AudioState,
    voices: Vec<(VoiceId, VoiceHandle)>,
    next_id: u64,
    mixer: Mixer,
    recorder: WavRecorder,
    frames_rendered: u64,
}

impl AudioEngine {
    pub fn new(sample_rate: f64, master_gain: f64) -> Self {
        AudioEngine {
            sample_rate,
            state: AudioState::Suspended,
            voices: Vec::new(),
            next_id: 0,
            mixer: Mixer::new(master_gain),
            recorder: WavRecorder::new(sample_rate.round() as u32),
            frames_rendered: 0,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    /// Unlock output. Returns true if the engine was suspended.
    pub fn resume(&mut self) -> bool {
        let was_suspended = self.state == AudioState::Suspended;
        if was_suspended {
            log::debug!("audio resumed");
        }
        self.state = AudioState::Running;
        was_suspended
    }

    pub fn suspend(&mut self) {
        if self.state == AudioState::Running {
            log::debug!("audio suspended");
        }
        self.state = AudioState::Suspended;
    }

    pub fn master_gain(&self) -> f64 {
        self.mixer.master_gain
    }

    /// Non-finite gains are ignored.
    pub fn set_master_gain(&mut self, gain: f64) {
        if gain.is_finite() {
            self.mixer.master_gain = gain.max(0.0);
        }
    }

    /// Start `voice` and put it on the bus.
    pub fn add_voice(&mut self, mut voice: VoiceHandle) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        voice.start();
        self.voices.push((id, voice));
        id
    }

    fn voice_mut(&mut self, id: VoiceId) -> Option<&mut VoiceHandle> {
        self.voices.iter_mut().find(|(vid, _)| *vid == id).map(|(_, v)| v)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&VoiceHandle> {
        self.voices.iter().find(|(vid, _)| *vid == id).map(|(_, v)| v)
    }

    /// Begin the voice's release. Unknown or already-dropped ids are ignored.
    pub fn release(&mut self, id: VoiceId) -> bool {
        match self.voice_mut(id) {
            Some(v) => {
                v.stop();
                true
            }
            None => false,
        }
    }

    pub fn retune(&mut self, id: VoiceId, hz: f64) -> bool {
        match self.voice_mut(id) {
            Some(v) => {
                v.set_frequency(hz);
                true
            }
            None => false,
        }
    }

    pub fn voice_state(&self, id: VoiceId) -> Option<VoiceState> {
        self.voice(id).map(VoiceHandle::state)
    }

    /// Voices still on the bus, including ones in their release ramp.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate
    }

    /// Render the next `frames` samples of the mix bus.
    ///
    /// While suspended the output is silent, no time passes and nothing
    /// reaches the recorder.
    pub fn render_block(&mut self, frames: usize) -> Vec<f32> {
        if self.state == AudioState::Suspended {
            return vec![0.0; frames];
        }

        self.mixer.clear(frames);
        for (_, voice) in self.voices.iter_mut() {
            for i in 0..frames {
                if voice.is_finished() {
                    break;
                }
                self.mixer.add(i, voice.next_sample());
            }
        }
        self.voices.retain(|(_, v)| !v.is_finished());

        let out = self.mixer.output();
        self.recorder.capture(&out);
        self.frames_rendered += frames as u64;
        out
    }

    pub fn recorder(&self) -> &WavRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut WavRecorder {
        &mut self.recorder
    }
}
