//! WAV recorder. Taps the mix bus and exports 16-bit mono PCM.

/// Suggested download name for an exported recording.
pub const RECORDING_FILE_NAME: &str = "recording.wav";

const HEADER_LEN: usize = 44;

/// Accumulates captured blocks between `start` and `stop`.
#[derive(Debug, Clone)]
pub struct WavRecorder {
    sample_rate: u32,
    blocks: Vec<Vec<f32>>,
    recording: bool,
}

impl WavRecorder {
    pub fn new(sample_rate: u32) -> Self {
        WavRecorder {
            sample_rate,
            blocks: Vec::new(),
            recording: false,
        }
    }

    /// Drop any previous take and begin capturing.
    pub fn start(&mut self) {
        self.blocks.clear();
        self.recording = true;
        log::info!("recording started at {} Hz", self.sample_rate);
    }

    /// Stop capturing and serialize everything captured so far.
    pub fn stop(&mut self) -> Vec<u8> {
        self.recording = false;
        let wav = self.export_wav();
        log::info!(
            "recording stopped: {} samples, {} bytes",
            self.sample_count(),
            wav.len()
        );
        wav
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Capture tap: append a block verbatim while recording.
    pub fn capture(&mut self, block: &[f32]) {
        if self.recording {
            self.blocks.push(block.to_vec());
        }
    }

    pub fn sample_count(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Serialize the captured blocks as a complete WAV file.
    pub fn export_wav(&self) -> Vec<u8> {
        encode_wav(self.blocks.iter().flatten().copied(), self.sample_count(), self.sample_rate)
    }
}

/// Convert a float sample to 16-bit PCM: clamp to [-1, 1], scale
/// negatives by 32768 and positives by 32767, truncating toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode `count` mono float samples as a 16-bit PCM WAV byte buffer.
pub fn encode_wav(samples: impl IntoIterator<Item = f32>, count: usize, sample_rate: u32) -> Vec<u8> {
    let channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = (count * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for sample in samples.into_iter().take(count) {
        buf.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }

    buf
}
