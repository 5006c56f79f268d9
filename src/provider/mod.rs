//! Generation service seam.
//!
//! The generative pipelines talk to a [`GenerativeProvider`]: one prompt in,
//! one block of text out. [`gemini::GeminiProvider`] is the production
//! implementation; tests and callers with their own middleware inject any
//! other implementation through
//! [`crate::config::PipelineConfigBuilder::provider`].

pub mod gemini;

pub use gemini::GeminiProvider;

use crate::error::GenerationError;
use async_trait::async_trait;
use std::fmt::Debug;

/// MIME type asking the service to answer with JSON.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Per-request knobs passed to the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Response-format hint, e.g. [`JSON_MIME_TYPE`]. Not a guarantee.
    pub response_mime_type: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Options requesting a JSON-typed response.
    pub fn json() -> Self {
        Self {
            response_mime_type: Some(JSON_MIME_TYPE.to_string()),
            ..Default::default()
        }
    }
}

/// Text returned by one generation call plus its token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A hosted text-generation service.
#[async_trait]
pub trait GenerativeProvider: Send + Sync + Debug {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send one prompt and return the generated text.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, GenerationError>;
}
