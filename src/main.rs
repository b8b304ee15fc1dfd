use anyhow::{Context, Result};
use clap::Parser;
use narrate::audio::{check_ffmpeg, check_ffprobe, probe_duration};
use narrate::config::{AudioFormat, Config, SubtitleFormat};
use narrate::tts::CommandSynthesizer;
use narrate::{print_summary, run_pipeline, PipelineConfig, SpeechSource};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "narrate")]
#[command(version, about = "Turn a generated narration script into subtitles and a voice-over track")]
#[command(long_about = "Repairs the timing of a JSON narration script against a video, writes SRT/VTT subtitles, and assembles synthesized speech and silence into one audio file.")]
struct Cli {
    /// Narration script (JSON array of start_time/end_time/narration_text)
    script: PathBuf,

    /// Video the narration belongs to; its duration is probed with ffprobe
    #[arg(long, conflicts_with = "duration", required_unless_present = "duration")]
    video: Option<PathBuf>,

    /// Video duration in seconds, instead of probing a file
    #[arg(long)]
    duration: Option<f64>,

    /// JSON manifest of pre-rendered speech clips
    #[arg(long, conflicts_with = "tts_command")]
    tts_manifest: Option<PathBuf>,

    /// TTS command template with {output} and optional {text} placeholders
    #[arg(long)]
    tts_command: Option<String>,

    /// Directory for all generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Narration audio format: mp3, wav
    #[arg(short, long)]
    audio_format: Option<String>,

    /// Subtitle format: srt, vtt
    #[arg(short, long)]
    subtitle_format: Option<String>,

    /// Base name for output files (defaults to the video or script name)
    #[arg(short, long)]
    name: Option<String>,

    /// Only reconcile the script and write subtitles
    #[arg(long)]
    script_only: bool,

    /// Number of concurrent TTS jobs
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_base_name(script: &Path, video: Option<&Path>) -> String {
    video
        .unwrap_or(script)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "narration".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if !cli.script.exists() {
        anyhow::bail!("Script file not found: {}", cli.script.display());
    }

    // Load configuration, then let flags win
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(ref format) = cli.audio_format {
        config.audio_format = format.parse::<AudioFormat>()?;
    }
    if let Some(ref format) = cli.subtitle_format {
        config.subtitle_format = format.parse::<SubtitleFormat>()?;
    }
    if let Some(command) = cli.tts_command {
        config.tts_command = Some(command);
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    let video_duration = match (&cli.video, cli.duration) {
        (Some(video), _) => {
            check_ffprobe().context("--video needs FFprobe; pass --duration instead")?;
            probe_duration(video)
                .with_context(|| format!("Failed to read duration of {}", video.display()))?
        }
        (None, Some(duration)) => duration,
        (None, None) => anyhow::bail!("Either --video or --duration is required"),
    };

    let speech = if cli.script_only {
        None
    } else if let Some(manifest) = cli.tts_manifest {
        Some(SpeechSource::Manifest(manifest))
    } else if let Some(ref template) = config.tts_command {
        let synthesizer =
            CommandSynthesizer::from_template(template).context("Invalid TTS command")?;
        Some(SpeechSource::Synthesizer(Box::new(synthesizer)))
    } else {
        anyhow::bail!("No speech source: pass --tts-manifest or --tts-command, or use --script-only");
    };

    if speech.is_some() && matches!(config.audio_format, AudioFormat::Mp3) {
        check_ffmpeg().context("MP3 export needs FFmpeg; use --audio-format wav otherwise")?;
    }

    let base_name = cli
        .name
        .unwrap_or_else(|| derive_base_name(&cli.script, cli.video.as_deref()));

    info!("Script:     {}", cli.script.display());
    info!("Duration:   {:.2}s", video_duration);
    info!("Output dir: {}", config.output_dir.display());
    info!("Base name:  {}", base_name);
    info!("Formats:    {} / {}", config.subtitle_format, config.audio_format);

    let cancelled = Arc::new(AtomicBool::new(false));
    let handler_flag = cancelled.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let pipeline_config = PipelineConfig {
        base_name,
        speech,
        script_only: cli.script_only,
        show_progress: !cli.no_progress,
    };

    let result = run_pipeline(
        &cli.script,
        video_duration,
        &config,
        pipeline_config,
        cancelled,
    )
    .await
    .context("Narration pipeline failed")?;

    print_summary(&result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_base_name() {
        let script = PathBuf::from("/scripts/intro.json");
        assert_eq!(derive_base_name(&script, None), "intro");

        let video = PathBuf::from("/videos/launch day.mp4");
        assert_eq!(derive_base_name(&script, Some(video.as_path())), "launch day");
    }

    #[test]
    fn test_cli_requires_duration_source() {
        assert!(Cli::try_parse_from(["narrate", "script.json"]).is_err());
        assert!(Cli::try_parse_from(["narrate", "script.json", "--duration", "60"]).is_ok());
        assert!(Cli::try_parse_from([
            "narrate",
            "script.json",
            "--video",
            "a.mp4",
            "--duration",
            "60"
        ])
        .is_err());
    }
}
