use crate::audio::media_duration;
use crate::error::{NarrateError, Result};
use crate::script::ValidatedSegment;
use crate::tts::{SpeechSynthesizer, TtsResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const TEXT_PLACEHOLDER: &str = "{text}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs an external TTS program once per segment.
///
/// The template is split on whitespace and run without a shell, e.g.
/// `espeak-ng -w {output} {text}` or `piper --model voice.onnx --output_file {output}`.
/// When the template has no `{text}` argument the text is written to stdin.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn from_template(template: &str) -> Result<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| NarrateError::Config("TTS command template is empty".to_string()))?;
        let args: Vec<String> = parts.collect();

        if !args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            return Err(NarrateError::Config(format!(
                "TTS command template must contain {}",
                OUTPUT_PLACEHOLDER
            )));
        }

        Ok(Self { program, args })
    }

    fn takes_text_argument(&self) -> bool {
        self.args.iter().any(|a| a.contains(TEXT_PLACEHOLDER))
    }

    fn build_args(&self, text: &str, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| {
                a.replace(OUTPUT_PLACEHOLDER, &output)
                    .replace(TEXT_PLACEHOLDER, text)
            })
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(&self, segment: &ValidatedSegment, output_dir: &Path) -> Result<TtsResult> {
        let output = output_dir.join(format!("narration_{}.wav", segment.id));
        let args = self.build_args(&segment.text, &output);
        let pipe_text = !self.takes_text_argument();

        debug!("Running {} for segment {}", self.program, segment.id);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(if pipe_text { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                NarrateError::Synthesis(format!("Failed to start {}: {e}", self.program))
            })?;

        if pipe_text {
            if let Some(mut stdin) = child.stdin.take() {
                // A program that exits without reading stdin closes the pipe.
                // Its exit status and output file decide the result.
                if let Err(e) = stdin.write_all(segment.text.as_bytes()).await {
                    if e.kind() != ErrorKind::BrokenPipe {
                        return Err(e.into());
                    }
                    debug!("{} closed stdin early for segment {}", self.program, segment.id);
                }
            }
        }

        let finished = child.wait_with_output().await?;
        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(NarrateError::Synthesis(format!(
                "{} failed for segment {}: {}",
                self.program,
                segment.id,
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(NarrateError::Synthesis(format!(
                "{} produced no audio for segment {}",
                self.program, segment.id
            )));
        }

        let duration_sec = media_duration(&output)?;

        Ok(TtsResult {
            segment_id: segment.id,
            audio_file_path: output,
            duration_sec,
            text_segment: segment.text.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
