pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod script;
pub mod subtitle;
pub mod timeline;
pub mod tts;

pub use config::Config;
pub use error::{NarrateError, Result};
pub use pipeline::{
    print_summary, run_pipeline, PipelineConfig, PipelineResult, PipelineStats, SpeechSource,
};
pub use script::{reconcile, ValidatedSegment};
pub use timeline::{build_timeline, export, render, TimelineItem};
pub use tts::{TtsResult, TtsResults};
