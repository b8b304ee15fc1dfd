pub mod clip;
pub mod extract;

pub use clip::{load_clip, read_wav};
pub use extract::{
    check_ffmpeg, check_ffprobe, decode_to_wav, encode_mp3, media_duration, probe_duration,
    wav_duration,
};

/// Interleaved 16-bit PCM held in memory while the narration track is built.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
        }
    }

    /// A buffer holding `millis` milliseconds of digital silence.
    pub fn silent(millis: u64, sample_rate: u32, channels: u16) -> Self {
        let mut buffer = Self::empty(sample_rate, channels);
        buffer.append_silence(millis);
        buffer
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }

    pub fn append_silence(&mut self, millis: u64) {
        let frames = (millis * self.sample_rate as u64 / 1000) as usize;
        let len = self.samples.len() + frames * self.channels as usize;
        self.samples.resize(len, 0);
    }

    /// Append another buffer with the same layout.
    pub fn append(&mut self, other: &AudioBuffer) {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        debug_assert_eq!(self.channels, other.channels);
        self.samples.extend_from_slice(&other.samples);
    }

    pub fn same_layout(&self, sample_rate: u32, channels: u16) -> bool {
        self.sample_rate == sample_rate && self.channels == channels
    }

    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}
