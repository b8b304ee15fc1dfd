use crate::config::Config;
use crate::error::{NarrateError, Result};
use crate::script::{reconcile, ValidatedSegment};
use crate::subtitle::create_formatter;
use crate::timeline::{build_timeline, clean_filename, export, render, TimelineItem};
use crate::tts::{load_manifest, SpeechSynthesizer, SynthesisOrchestrator, TtsResults};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Where synthesized speech comes from.
pub enum SpeechSource {
    /// A JSON manifest of clips rendered elsewhere.
    Manifest(PathBuf),
    /// Synthesize every segment during the run.
    Synthesizer(Box<dyn SpeechSynthesizer>),
}

/// Per-run options for the narration pipeline.
pub struct PipelineConfig {
    /// Base name for every artifact, sanitized before use.
    pub base_name: String,
    /// Required unless `script_only` is set.
    pub speech: Option<SpeechSource>,
    /// Stop after writing subtitles.
    pub script_only: bool,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_name: "narration".to_string(),
            speech: None,
            script_only: false,
            show_progress: true,
        }
    }
}

/// Statistics from a narration run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub reconcile_time: Duration,
    pub synthesis_time: Duration,
    pub render_time: Duration,
    /// Segments kept after reconciliation.
    pub segments: usize,
    /// Segments with speech available for the timeline.
    pub speech_segments: usize,
    /// Segments whose synthesis failed.
    pub failed_segments: usize,
    /// Length of the exported track.
    pub audio_duration: Duration,
}

/// Result of a narration run.
#[derive(Debug)]
pub struct PipelineResult {
    pub subtitle_path: PathBuf,
    /// `None` when only the script was processed.
    pub audio_path: Option<PathBuf>,
    pub segments: Vec<ValidatedSegment>,
    pub stats: PipelineStats,
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(NarrateError::Cancelled);
    }
    Ok(())
}

fn stage_spinner(multi: Option<&MultiProgress>, message: &str) -> Option<ProgressBar> {
    multi.map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Subtitle path for a run: `<dir>/<base>_narration.<ext>`.
pub fn subtitle_path(config: &Config, base_name: &str) -> PathBuf {
    config.output_dir.join(format!(
        "{}_narration.{}",
        clean_filename(base_name),
        config.subtitle_format.extension()
    ))
}

/// Turn a generated narration script into subtitles and a narration track.
///
/// 1. Reads and reconciles the script against the video duration
/// 2. Writes the subtitle file
/// 3. Loads or synthesizes speech for every segment
/// 4. Lays speech and silence on a timeline, renders and exports it
///
/// Cancellation is checked between stages. Nothing is published after the
/// flag is set.
pub async fn run_pipeline(
    script_path: &Path,
    video_duration_sec: f64,
    config: &Config,
    pipeline_config: PipelineConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();
    let mut stats = PipelineStats::default();

    if !script_path.exists() {
        return Err(NarrateError::FileNotFound(script_path.display().to_string()));
    }
    if !pipeline_config.script_only && pipeline_config.speech.is_none() {
        return Err(NarrateError::Config(
            "No speech source. Provide a TTS manifest or a TTS command, or run script-only."
                .to_string(),
        ));
    }

    let multi_progress = if pipeline_config.show_progress {
        Some(MultiProgress::new())
    } else {
        None
    };

    check_cancelled(&cancelled)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 1: Script reconciliation
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 1/4: Reconciling script {:?}", script_path);
    let reconcile_start = Instant::now();

    let raw = fs::read_to_string(script_path)?;
    let segments = reconcile(&raw, video_duration_sec)?;

    stats.reconcile_time = reconcile_start.elapsed();
    stats.segments = segments.len();
    info!(
        "Reconciled {} segments against {:.2}s of video",
        segments.len(),
        video_duration_sec
    );

    check_cancelled(&cancelled)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 2: Subtitles
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 2/4: Writing {} subtitles", config.subtitle_format);

    fs::create_dir_all(&config.output_dir)?;
    let formatter = create_formatter(config.subtitle_format);
    let subtitle_path = subtitle_path(config, &pipeline_config.base_name);
    fs::write(&subtitle_path, formatter.format(&segments))?;

    info!("Wrote {} cues to {:?}", segments.len(), subtitle_path);

    if pipeline_config.script_only {
        stats.total_time = start_time.elapsed();
        return Ok(PipelineResult {
            subtitle_path,
            audio_path: None,
            segments,
            stats,
        });
    }

    check_cancelled(&cancelled)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 3: Speech
    // ═══════════════════════════════════════════════════════════════════════
    let synthesis_start = Instant::now();

    let tts: TtsResults = match pipeline_config.speech {
        Some(SpeechSource::Manifest(ref manifest)) => {
            info!("Stage 3/4: Loading speech manifest {:?}", manifest);
            load_manifest(manifest)?
        }
        Some(SpeechSource::Synthesizer(synthesizer)) => {
            info!(
                "Stage 3/4: Synthesizing speech with {} (concurrency: {})",
                synthesizer.name(),
                config.concurrency
            );
            let orchestrator = SynthesisOrchestrator::new(synthesizer, config.concurrency)
                .with_progress(pipeline_config.show_progress);
            let (results, synthesis_stats) = orchestrator
                .synthesize_all(&segments, &config.output_dir.join("tts_audio"))
                .await?;
            stats.failed_segments = synthesis_stats.failed;
            results
        }
        None => TtsResults::new(),
    };

    stats.synthesis_time = synthesis_start.elapsed();
    stats.speech_segments = segments.iter().filter(|s| tts.contains_key(&s.id)).count();

    check_cancelled(&cancelled)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 4: Timeline, render, export
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 4/4: Assembling {} narration", config.audio_format);
    let render_start = Instant::now();

    let render_pb = stage_spinner(multi_progress.as_ref(), "Rendering narration...");

    let items: Vec<TimelineItem> = build_timeline(&segments, &tts);
    let buffer = render(&items, config.sample_rate, config.channels);

    check_cancelled(&cancelled)?;

    let audio_path = export(
        &buffer,
        &config.output_dir,
        &pipeline_config.base_name,
        config.audio_format.extension(),
        &config.mp3_bitrate,
    )?;

    if let Some(pb) = render_pb {
        pb.finish_with_message(format!(
            "✓ Rendered {:.1}s of narration",
            buffer.duration_secs()
        ));
    }

    stats.render_time = render_start.elapsed();
    stats.audio_duration = Duration::from_secs_f64(buffer.duration_secs());
    stats.total_time = start_time.elapsed();

    Ok(PipelineResult {
        subtitle_path,
        audio_path: Some(audio_path),
        segments,
        stats,
    })
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Narration Complete                        ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Subtitles:  {}", result.subtitle_path.display());
    if let Some(ref audio) = result.audio_path {
        println!("  Audio:      {}", audio.display());
        println!(
            "  Duration:   {:.1}s narration",
            result.stats.audio_duration.as_secs_f64()
        );
    }
    println!("  Segments:   {}", result.stats.segments);
    if result.audio_path.is_some() {
        println!(
            "  With speech: {} ({} failed)",
            result.stats.speech_segments, result.stats.failed_segments
        );
    }
    println!();
    println!("  Timing:");
    println!(
        "    Reconcile:   {:.2}s",
        result.stats.reconcile_time.as_secs_f64()
    );
    if result.audio_path.is_some() {
        println!(
            "    Speech:      {:.2}s",
            result.stats.synthesis_time.as_secs_f64()
        );
        println!(
            "    Render:      {:.2}s",
            result.stats.render_time.as_secs_f64()
        );
    }
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
