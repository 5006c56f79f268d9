//! Generative strategy: one prompt in, one JSON array of flat records out.
//!
//! Prompt wording lives in [`crate::prompts`] and HTTP details in
//! [`crate::provider`]. Here we render the prompt, make a single call, and
//! check that what came back is a non-empty JSON array.
//!
//! There is no retry and no partial recovery. A failed call or a response of
//! the wrong shape is returned as a [`GenerationError`] and logged with its
//! full error chain, and the caller writes nothing.

use crate::config::PipelineConfig;
use crate::error::GenerationError;
use crate::output::DatasetKind;
use crate::pipeline::postprocess::clean_json_response;
use crate::prompts::render_prompt;
use crate::provider::{GenerationOptions, GenerativeProvider};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The validated result of one generative call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDataset {
    /// Items in the order the service returned them.
    pub items: Vec<Value>,
    /// Items that are not objects carrying both expected keys. They are kept
    /// in `items`; the count is diagnostic only.
    pub malformed_items: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub duration_ms: u64,
}

/// Render `template` with `text`, call the provider once and parse the reply.
pub async fn generate_records(
    provider: &dyn GenerativeProvider,
    template: &str,
    text: &str,
    kind: DatasetKind,
    config: &PipelineConfig,
) -> Result<GeneratedDataset, GenerationError> {
    let start = Instant::now();
    let prompt = render_prompt(template, text);
    let options = build_options(config);

    info!(
        "Requesting {:?} items from {} ({})",
        kind,
        provider.name(),
        provider.model()
    );
    debug!("Prompt: {} chars", prompt.len());

    let result = match provider.generate(&prompt, &options).await {
        Ok(generation) => parse_generated(&generation.text).map(|items| (items, generation)),
        Err(e) => Err(e),
    };

    let (items, generation) = match result {
        Ok(ok) => ok,
        Err(e) => {
            error!("Generation failed: {}", error_chain(&e));
            return Err(e);
        }
    };

    let duration = start.elapsed();
    debug!(
        "{} input tokens, {} output tokens, {:?}",
        generation.prompt_tokens, generation.completion_tokens, duration
    );

    let malformed_items = items.iter().filter(|item| !kind.accepts(item)).count();
    if malformed_items > 0 {
        let (a, b) = kind.keys();
        warn!(
            "{} of {} generated items are not {{\"{}\", \"{}\"}} objects",
            malformed_items,
            items.len(),
            a,
            b
        );
    }
    info!("Generated {} items", items.len());

    Ok(GeneratedDataset {
        items,
        malformed_items,
        prompt_tokens: generation.prompt_tokens,
        completion_tokens: generation.completion_tokens,
        duration_ms: duration.as_millis() as u64,
    })
}

/// Parse a raw generation into a non-empty JSON array.
pub fn parse_generated(raw: &str) -> Result<Vec<Value>, GenerationError> {
    let cleaned = clean_json_response(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|source| GenerationError::MalformedJson { source })?;

    match value {
        Value::Array(items) if items.is_empty() => Err(GenerationError::EmptyArray),
        Value::Array(items) => Ok(items),
        other => Err(GenerationError::NotAnArray {
            found: json_type_name(&other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build request options from the pipeline config.
fn build_options(config: &PipelineConfig) -> GenerationOptions {
    GenerationOptions {
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
        ..GenerationOptions::json()
    }
}

/// `outer: inner: innermost` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        let msg = s.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = s.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Generation, JSON_MIME_TYPE};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct ScriptedProvider {
        reply: Result<String, fn() -> GenerationError>,
        seen: Mutex<Vec<(String, GenerationOptions)>>,
    }

    impl ScriptedProvider {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(f: fn() -> GenerationError) -> Self {
            Self {
                reply: Err(f),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn generate(
            &self,
            prompt: &str,
            options: &GenerationOptions,
        ) -> Result<Generation, GenerationError> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), options.clone()));
            match &self.reply {
                Ok(text) => Ok(Generation {
                    text: text.clone(),
                    prompt_tokens: 120,
                    completion_tokens: 30,
                }),
                Err(f) => Err(f()),
            }
        }
    }

    #[test]
    fn parse_plain_array() {
        let items = parse_generated(r#"[{"Question": "q", "Answer": "a"}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["Answer"], "a");
    }

    #[test]
    fn parse_fenced_array() {
        let items =
            parse_generated("```json\n[{\"instruction\": \"i\", \"response\": \"r\"}]\n```")
                .unwrap();
        assert_eq!(items[0]["instruction"], "i");
    }

    #[test]
    fn parse_keeps_joiners_in_answers() {
        let answer = "\u{645}\u{6CC}\u{200C}\u{62E}\u{648}\u{627}\u{647}\u{645} \u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let raw = format!(r#"[{{"Question": "q", "Answer": "{answer}"}}]"#);
        let items = parse_generated(&raw).unwrap();
        assert_eq!(items[0]["Answer"], answer);
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_generated("Sure! Here are your questions:").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedJson { .. }));
    }

    #[test]
    fn parse_rejects_object() {
        let err = parse_generated(r#"{"Question": "q", "Answer": "a"}"#).unwrap_err();
        assert!(matches!(err, GenerationError::NotAnArray { found: "object" }));
    }

    #[test]
    fn parse_rejects_empty_array() {
        let err = parse_generated("  []  ").unwrap_err();
        assert!(matches!(err, GenerationError::EmptyArray));
    }

    #[test]
    fn options_request_json_and_carry_sampling() {
        let config = PipelineConfig::builder()
            .temperature(0.3)
            .max_output_tokens(2048)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.response_mime_type.as_deref(), Some(JSON_MIME_TYPE));
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_output_tokens, Some(2048));
    }

    #[tokio::test]
    async fn generate_substitutes_text_and_counts_malformed() {
        let provider = ScriptedProvider::ok(
            r#"[{"Question": "Who?", "Answer": "Us."}, {"Question": "missing answer"}, "stray"]"#,
        );
        let config = PipelineConfig::default();
        let dataset = generate_records(
            &provider,
            "Text:\n{text_content}\nJSON:",
            "CubeTriangle builds robots.",
            DatasetKind::QuestionAnswer,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(dataset.items.len(), 3);
        assert_eq!(dataset.malformed_items, 2);
        assert_eq!(dataset.prompt_tokens, 120);
        assert_eq!(dataset.completion_tokens, 30);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "Text:\nCubeTriangle builds robots.\nJSON:");
        assert_eq!(seen[0].1.response_mime_type.as_deref(), Some(JSON_MIME_TYPE));
    }

    #[tokio::test]
    async fn service_failure_is_returned_after_one_call() {
        let provider = ScriptedProvider::failing(|| GenerationError::Auth {
            provider: "scripted".into(),
            detail: "API key not valid".into(),
        });
        let err = generate_records(
            &provider,
            "{text_content}",
            "text",
            DatasetKind::InstructionResponse,
            &PipelineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GenerationError::Auth { .. }));
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn error_chain_includes_sources() {
        let source = serde_json::from_str::<Value>("{").unwrap_err();
        let err = GenerationError::MalformedJson { source };
        let chain = error_chain(&err);
        assert!(chain.starts_with("Could not parse JSON"), "got: {chain}");
    }
}
