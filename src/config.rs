use crate::error::{NarrateError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Container format of the exported narration track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Mp3 => write!(f, "mp3"),
            AudioFormat::Wav => write!(f, "wav"),
        }
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = NarrateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            _ => Err(NarrateError::UnsupportedFormat(format!(
                "{}. Use 'mp3' or 'wav'",
                s
            ))),
        }
    }
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

/// Subtitle file flavour written next to the narration track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    #[default]
    Srt,
    Vtt,
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleFormat::Srt => write!(f, "srt"),
            SubtitleFormat::Vtt => write!(f, "vtt"),
        }
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = NarrateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::Srt),
            "vtt" => Ok(SubtitleFormat::Vtt),
            _ => Err(NarrateError::UnsupportedFormat(format!(
                "{}. Use 'srt' or 'vtt'",
                s
            ))),
        }
    }
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
        }
    }
}

fn bitrate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+k$").expect("Invalid regex"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for every generated artifact.
    pub output_dir: PathBuf,
    pub audio_format: AudioFormat,
    pub subtitle_format: SubtitleFormat,
    /// Fixed bitrate passed to the MP3 encoder, e.g. "192k".
    pub mp3_bitrate: String,
    /// Sample rate of the rendered track. Clips are harmonized to it.
    pub sample_rate: u32,
    pub channels: u16,
    /// External TTS command template with `{text}` and `{output}` placeholders.
    pub tts_command: Option<String>,
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            audio_format: AudioFormat::default(),
            subtitle_format: SubtitleFormat::default(),
            mp3_bitrate: "192k".to_string(),
            sample_rate: 24_000,
            channels: 1,
            tts_command: None,
            concurrency: 4,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => tracing::warn!(
                        "Ignoring unreadable config file {}: {}",
                        config_path.display(),
                        e
                    ),
                }
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Override fields from `NARRATE_*` environment variables.
    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("NARRATE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(format) = std::env::var("NARRATE_AUDIO_FORMAT") {
            if let Ok(f) = format.parse() {
                self.audio_format = f;
            }
        }
        if let Ok(format) = std::env::var("NARRATE_SUBTITLE_FORMAT") {
            if let Ok(f) = format.parse() {
                self.subtitle_format = f;
            }
        }
        if let Ok(bitrate) = std::env::var("NARRATE_MP3_BITRATE") {
            self.mp3_bitrate = bitrate;
        }
        if let Ok(rate) = std::env::var("NARRATE_SAMPLE_RATE") {
            if let Ok(r) = rate.parse() {
                self.sample_rate = r;
            }
        }
        if let Ok(command) = std::env::var("NARRATE_TTS_COMMAND") {
            if !command.trim().is_empty() {
                self.tts_command = Some(command);
            }
        }
        if let Ok(concurrency) = std::env::var("NARRATE_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(NarrateError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.sample_rate == 0 {
            return Err(NarrateError::Config(
                "Sample rate must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.channels, 1 | 2) {
            return Err(NarrateError::Config(format!(
                "Channels must be 1 or 2, got {}",
                self.channels
            )));
        }

        if !bitrate_re().is_match(&self.mp3_bitrate) {
            return Err(NarrateError::Config(format!(
                "MP3 bitrate must look like '192k', got '{}'",
                self.mp3_bitrate
            )));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("narrate").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_parsing() {
        assert_eq!("mp3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert_eq!("WAV".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert!(matches!(
            "ogg".parse::<AudioFormat>(),
            Err(NarrateError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_subtitle_format_parsing() {
        assert_eq!("srt".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert_eq!("Vtt".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Vtt);
        assert!("ass".parse::<SubtitleFormat>().is_err());
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
        assert_eq!(AudioFormat::Wav.extension(), "wav");
        assert_eq!(SubtitleFormat::Srt.extension(), "srt");
        assert_eq!(SubtitleFormat::Vtt.extension(), "vtt");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.audio_format, AudioFormat::Mp3);
        assert_eq!(config.mp3_bitrate, "192k");
        assert_eq!(config.concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.channels = 6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mp3_bitrate = "fast".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bitrate_check_is_repeatable() {
        let mut config = Config::default();
        for bitrate in ["128k", "320k", "192k"] {
            config.mp3_bitrate = bitrate.to_string();
            assert!(config.validate().is_ok());
        }
        config.mp3_bitrate = "192".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("audio_format = \"wav\"\nconcurrency = 2\n").unwrap();
        assert_eq!(config.audio_format, AudioFormat::Wav);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.sample_rate, 24_000);
    }
}
