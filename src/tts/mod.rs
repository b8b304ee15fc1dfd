pub mod command;
pub mod orchestrator;

pub use command::CommandSynthesizer;
pub use orchestrator::{SynthesisOrchestrator, SynthesisStats};

use crate::error::Result;
use crate::script::ValidatedSegment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Speech rendered for one validated segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsResult {
    pub segment_id: usize,
    pub audio_file_path: PathBuf,
    /// Real length of the rendered speech, which may differ from the script.
    pub duration_sec: f64,
    #[serde(default)]
    pub text_segment: String,
}

/// Synthesized speech keyed by segment id.
pub type TtsResults = HashMap<usize, TtsResult>;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `segment.text` into a file under `output_dir`.
    async fn synthesize(&self, segment: &ValidatedSegment, output_dir: &Path) -> Result<TtsResult>;
    fn name(&self) -> &'static str;
}

/// Key results by segment id. A later duplicate replaces an earlier one.
pub fn index_results(results: Vec<TtsResult>) -> TtsResults {
    let mut indexed = TtsResults::with_capacity(results.len());
    for result in results {
        let id = result.segment_id;
        if indexed.insert(id, result).is_some() {
            warn!("Duplicate TTS result for segment {}, keeping the last one", id);
        }
    }
    indexed
}

/// Load speech produced elsewhere from a JSON array of [`TtsResult`].
///
/// Relative audio paths are resolved against the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<TtsResults> {
    let contents = std::fs::read_to_string(path)?;
    let mut results: Vec<TtsResult> = serde_json::from_str(&contents)?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for result in &mut results {
        if result.audio_file_path.is_relative() {
            result.audio_file_path = base.join(&result.audio_file_path);
        }
    }

    info!(
        "Loaded {} TTS results from {}",
        results.len(),
        path.display()
    );
    Ok(index_results(results))
}
