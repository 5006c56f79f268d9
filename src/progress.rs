//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as a run moves through extract → synthesise → flatten → write.
//!
//! # Example
//!
//! ```rust
//! use docqa::{PipelineProgressCallback, PipelineConfig, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, items: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done ({items} items)");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::config::PipelineKind;
use std::fmt;
use std::sync::Arc;

/// Steps of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading text out of the source document.
    Extract,
    /// Calling the generation service (generative pipelines).
    Generate,
    /// Segmenting product blocks (pattern pipeline).
    Match,
    /// Turning product records into Q&A pairs (pattern pipeline).
    Flatten,
    /// Serialising the dataset to disk.
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extract => "extract",
            Stage::Generate => "generate",
            Stage::Match => "match",
            Stage::Flatten => "flatten",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the source document is opened.
    fn on_pipeline_start(&self, pipeline: PipelineKind) {
        let _ = pipeline;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes.
    ///
    /// `items` is stage-specific: characters extracted, items generated,
    /// records matched, pairs flattened, or items written.
    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let _ = (stage, items);
    }

    /// Called when the run stops on an error.
    fn on_pipeline_error(&self, pipeline: PipelineKind, error: &str) {
        let _ = (pipeline, error);
    }

    /// Called once after a run that ended without a fatal error.
    fn on_pipeline_complete(&self, pipeline: PipelineKind, written: bool) {
        let _ = (pipeline, written);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
