//! Record and result types produced by the pipelines.
//!
//! The two flat Q&A schemas ([`QuestionAnswer`] and [`InstructionResponse`])
//! are never unified: downstream consumers read the key names literally, so
//! each schema keeps its own type and its own serde field names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One product block cut out of a specification sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Trimmed text after `Product name:`.
    pub name: String,
    /// Non-empty trimmed lines of the features block, in source order.
    pub features: Vec<String>,
    /// Trimmed text after `Price:`, possibly empty.
    pub price: String,
}

/// `{"Question": …, "Answer": …}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

/// `{"instruction": …, "response": …}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionResponse {
    pub instruction: String,
    pub response: String,
}

/// Which flat schema a dataset uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    QuestionAnswer,
    InstructionResponse,
}

impl DatasetKind {
    /// The two literal JSON keys of this schema.
    pub fn keys(self) -> (&'static str, &'static str) {
        match self {
            DatasetKind::QuestionAnswer => ("Question", "Answer"),
            DatasetKind::InstructionResponse => ("instruction", "response"),
        }
    }

    /// Whether a generated item deserialises into this schema.
    pub fn accepts(self, item: &serde_json::Value) -> bool {
        match self {
            DatasetKind::QuestionAnswer => {
                serde_json::from_value::<QuestionAnswer>(item.clone()).is_ok()
            }
            DatasetKind::InstructionResponse => {
                serde_json::from_value::<InstructionResponse>(item.clone()).is_ok()
            }
        }
    }
}

/// Counters and timings for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Characters of extracted source text.
    pub source_chars: usize,
    /// Product records matched (pattern pipeline only).
    pub products: usize,
    /// Items in the written dataset.
    pub items: usize,
    /// Generated items that do not match the expected two-key schema.
    pub malformed_items: usize,
    /// Prompt tokens reported by the service (generative pipelines only).
    pub prompt_tokens: u64,
    /// Completion tokens reported by the service (generative pipelines only).
    pub completion_tokens: u64,
    pub extract_duration_ms: u64,
    pub synthesis_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The dataset was written to `path`.
    Written { path: PathBuf, stats: DatasetStats },
    /// The run produced no items, so no file was written.
    NothingToWrite { reason: String, stats: DatasetStats },
}

impl PipelineOutcome {
    pub fn stats(&self) -> &DatasetStats {
        match self {
            PipelineOutcome::Written { stats, .. } | PipelineOutcome::NothingToWrite { stats, .. } => {
                stats
            }
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            PipelineOutcome::Written { path, .. } => Some(path),
            PipelineOutcome::NothingToWrite { .. } => None,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, PipelineOutcome::Written { .. })
    }
}
