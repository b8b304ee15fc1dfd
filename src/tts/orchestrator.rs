use crate::error::{NarrateError, Result};
use crate::script::ValidatedSegment;
use crate::tts::{SpeechSynthesizer, TtsResult, TtsResults};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Statistics from the synthesis stage.
#[derive(Debug, Clone)]
pub struct SynthesisStats {
    pub total_segments: usize,
    pub synthesized: usize,
    pub failed: usize,
    pub total_time: Duration,
}

/// Runs a [`SpeechSynthesizer`] over every segment with bounded concurrency.
pub struct SynthesisOrchestrator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    concurrency: usize,
    show_progress: bool,
}

impl SynthesisOrchestrator {
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>, concurrency: usize) -> Self {
        Self {
            synthesizer: Arc::from(synthesizer),
            concurrency: concurrency.max(1),
            show_progress: true,
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Synthesize all segments into `output_dir`. Blank segments are not sent.
    ///
    /// Failed segments are logged and left out of the returned map, so the
    /// assembler treats them as missing. Errors only when every segment failed.
    pub async fn synthesize_all(
        &self,
        segments: &[ValidatedSegment],
        output_dir: &Path,
    ) -> Result<(TtsResults, SynthesisStats)> {
        let total_segments = segments.len();
        let start_time = Instant::now();

        if segments.is_empty() {
            return Ok((
                TtsResults::new(),
                SynthesisStats {
                    total_segments: 0,
                    synthesized: 0,
                    failed: 0,
                    total_time: Duration::ZERO,
                },
            ));
        }

        std::fs::create_dir_all(output_dir)?;

        info!(
            "Synthesizing {} segments with {} concurrent jobs using {}",
            total_segments,
            self.concurrency,
            self.synthesizer.name()
        );

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(total_segments as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut futures = FuturesUnordered::new();

        for segment in segments.iter().filter(|s| !s.text.trim().is_empty()) {
            let sem = semaphore.clone();
            let synthesizer = self.synthesizer.clone();
            let pb = progress_bar.clone();

            futures.push(async move {
                let _permit = sem.acquire().await.ok();
                debug!("Synthesizing segment {}", segment.id);

                let result = synthesizer.synthesize(segment, output_dir).await;

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }
                (segment.id, result)
            });
        }

        let mut results = TtsResults::with_capacity(total_segments);
        let mut errors: Vec<String> = Vec::new();

        while let Some((id, result)) = futures.next().await {
            match result {
                Ok(tts) => {
                    results.insert(id, checked(id, tts));
                }
                Err(e) => {
                    warn!("Segment {} synthesis failed: {}", id, e);
                    errors.push(format!("segment {}: {}", id, e));
                }
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Synthesis complete");
        }

        let stats = SynthesisStats {
            total_segments,
            synthesized: results.len(),
            failed: errors.len(),
            total_time: start_time.elapsed(),
        };

        info!(
            "Synthesis complete: {}/{} segments in {:.2}s",
            stats.synthesized,
            total_segments,
            stats.total_time.as_secs_f64()
        );

        if results.is_empty() {
            return Err(NarrateError::Synthesis(format!(
                "All {} segments failed. Errors: {}",
                total_segments,
                errors.join("; ")
            )));
        }

        Ok((results, stats))
    }
}

/// Keep the map key and the result's own id in agreement.
fn checked(id: usize, mut tts: TtsResult) -> TtsResult {
    if tts.segment_id != id {
        warn!(
            "Synthesizer returned id {} for segment {}, using {}",
            tts.segment_id, id, id
        );
        tts.segment_id = id;
    }
    tts
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock synthesizer for testing.
    struct MockSynthesizer {
        call_count: AtomicUsize,
        fail_on_id: Option<usize>,
    }

    impl MockSynthesizer {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail_on_id: None,
            }
        }

        fn failing_on(id: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail_on_id: Some(id),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for MockSynthesizer {
        async fn synthesize(
            &self,
            segment: &ValidatedSegment,
            output_dir: &Path,
        ) -> Result<TtsResult> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;

            if self.fail_on_id == Some(segment.id) {
                return Err(NarrateError::Synthesis("Mock error".to_string()));
            }

            Ok(TtsResult {
                segment_id: segment.id,
                audio_file_path: output_dir.join(format!("narration_{}.wav", segment.id)),
                duration_sec: segment.duration_sec(),
                text_segment: segment.text.clone(),
            })
        }

        fn name(&self) -> &'static str {
            "Mock"
        }
    }

    fn create_segments(count: usize) -> Vec<ValidatedSegment> {
        (0..count)
            .map(|i| ValidatedSegment {
                id: i + 1,
                start_sec: i as f64 * 10.0,
                end_sec: i as f64 * 10.0 + 4.0,
                text: format!("Segment {}", i + 1),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_synthesize_empty() {
        let orchestrator =
            SynthesisOrchestrator::new(Box::new(MockSynthesizer::new()), 4).with_progress(false);
        let (results, stats) = orchestrator
            .synthesize_all(&[], &PathBuf::from("/nonexistent"))
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(stats.total_segments, 0);
    }

    #[tokio::test]
    async fn test_synthesize_all_segments() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            SynthesisOrchestrator::new(Box::new(MockSynthesizer::new()), 2).with_progress(false);

        let (results, stats) = orchestrator
            .synthesize_all(&create_segments(6), dir.path())
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert_eq!(stats.synthesized, 6);
        assert_eq!(stats.failed, 0);
        assert_eq!(results[&3].text_segment, "Segment 3");
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_gap_in_map() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = SynthesisOrchestrator::new(Box::new(MockSynthesizer::failing_on(2)), 4)
            .with_progress(false);

        let (results, stats) = orchestrator
            .synthesize_all(&create_segments(3), dir.path())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results.contains_key(&2));
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_all_failed_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = SynthesisOrchestrator::new(Box::new(MockSynthesizer::failing_on(1)), 1)
            .with_progress(false);

        let result = orchestrator
            .synthesize_all(&create_segments(1), dir.path())
            .await;
        assert!(matches!(result, Err(NarrateError::Synthesis(_))));
    }

    #[test]
    fn test_checked_rewrites_mismatched_id() {
        let tts = TtsResult {
            segment_id: 9,
            audio_file_path: PathBuf::from("a.wav"),
            duration_sec: 1.0,
            text_segment: String::new(),
        };
        assert_eq!(checked(3, tts).segment_id, 3);
    }
}
