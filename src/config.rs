//! Configuration for dataset preparation runs.
//!
//! Two layers:
//!
//! * [`ProjectConfig`] — the YAML file (`config/config.yml`) naming where the
//!   raw documents live and where each JSON dataset goes, plus optional model
//!   settings. It only describes *paths and defaults*.
//! * [`PipelineConfig`] — the explicit value every `prepare_*` entry point
//!   takes: model, credential source, prompt override, progress callback.
//!   Built via [`PipelineConfig::builder()`] and validated in `build()`.
//!
//! Nothing is read from ambient process state except the API key, and only
//! when no key and no pre-built provider were supplied.

use crate::error::DocQaError;
use crate::output::DatasetKind;
use crate::progress::ProgressCallback;
use crate::provider::GenerativeProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default Gemini model for the generative pipelines.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the Gemini API key by default.
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Base URL of the Gemini REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Config file location relative to the project root.
pub const DEFAULT_CONFIG_FILE: &str = "config/config.yml";

/// Configuration for one dataset preparation run.
///
/// # Example
/// ```rust
/// use docqa::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("gemini-2.5-flash")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Gemini model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Name of the environment variable read for the API key when `api_key`
    /// is `None`. Default: `GOOGLE_API_KEY`.
    pub api_key_env: String,

    /// Explicit API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,

    /// REST base URL, overridable for proxies and tests.
    pub api_base_url: String,

    /// Pre-constructed provider. Takes precedence over every credential field.
    pub provider: Option<Arc<dyn GenerativeProvider>>,

    /// Sampling temperature. `None` leaves the service default.
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens. `None` leaves the service default.
    pub max_output_tokens: Option<u32>,

    /// Per-request timeout in seconds. `None` blocks until the service answers.
    pub api_timeout_secs: Option<u64>,

    /// Prompt template replacing the built-in one. Must contain `{text_content}`.
    pub prompt_template: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// pdfium shared library (file or directory). Falls back to
    /// `PDFIUM_LIB_PATH`, then to the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Stage events for progress display.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            provider: None,
            temperature: None,
            max_output_tokens: None,
            api_timeout_secs: None,
            prompt_template: None,
            password: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn GenerativeProvider>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt_template", &self.prompt_template.as_ref().map(|t| t.len()))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Start a builder pre-filled from the `llm:` section of a project config.
    pub fn from_settings(settings: &LlmSettings) -> PipelineConfigBuilder {
        let mut builder = Self::builder();
        if let Some(ref model) = settings.model {
            builder = builder.model(model.clone());
        }
        if let Some(ref env) = settings.api_key_env {
            builder = builder.api_key_env(env.clone());
        }
        if let Some(ref url) = settings.api_base_url {
            builder = builder.api_base_url(url.clone());
        }
        if let Some(t) = settings.temperature {
            builder = builder.temperature(t);
        }
        if let Some(n) = settings.max_output_tokens {
            builder = builder.max_output_tokens(n);
        }
        if let Some(secs) = settings.timeout_secs {
            builder = builder.api_timeout_secs(secs);
        }
        builder
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key_env(mut self, name: impl Into<String>) -> Self {
        self.config.api_key_env = name.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn GenerativeProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, DocQaError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DocQaError::InvalidConfig("Model must not be empty".into()));
        }
        if c.api_key_env.trim().is_empty() {
            return Err(DocQaError::InvalidConfig(
                "API key environment variable name must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(DocQaError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains(crate::prompts::TEXT_PLACEHOLDER) {
                return Err(DocQaError::InvalidConfig(format!(
                    "Prompt template must contain the {} placeholder",
                    crate::prompts::TEXT_PLACEHOLDER
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Pipelines ────────────────────────────────────────────────────────────

/// The three dataset preparation pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Word company description → generated `{Question, Answer}` pairs.
    CompanyDescription,
    /// PDF product manual → generated `{instruction, response}` pairs.
    ProductManual,
    /// PDF specification sheet → pattern-extracted `{Question, Answer}` pairs.
    ProductSpecifications,
}

/// Document format a pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Docx,
    Pdf,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] = [
        PipelineKind::CompanyDescription,
        PipelineKind::ProductManual,
        PipelineKind::ProductSpecifications,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PipelineKind::CompanyDescription => "company-description",
            PipelineKind::ProductManual => "product-manual",
            PipelineKind::ProductSpecifications => "product-specifications",
        }
    }

    pub fn source_format(self) -> SourceFormat {
        match self {
            PipelineKind::CompanyDescription => SourceFormat::Docx,
            PipelineKind::ProductManual | PipelineKind::ProductSpecifications => SourceFormat::Pdf,
        }
    }

    pub fn dataset_kind(self) -> DatasetKind {
        match self {
            PipelineKind::ProductManual => DatasetKind::InstructionResponse,
            PipelineKind::CompanyDescription | PipelineKind::ProductSpecifications => {
                DatasetKind::QuestionAnswer
            }
        }
    }

    /// JSON indentation width of the written dataset.
    pub fn indent(self) -> usize {
        match self {
            PipelineKind::ProductSpecifications => 2,
            PipelineKind::CompanyDescription | PipelineKind::ProductManual => 4,
        }
    }

    /// Whether the pipeline calls the generation service.
    pub fn is_generative(self) -> bool {
        !matches!(self, PipelineKind::ProductSpecifications)
    }

    fn input_key(self) -> &'static str {
        match self {
            PipelineKind::CompanyDescription => "raw_data_dir.company_description_docx_dir",
            PipelineKind::ProductManual => "raw_data_dir.product_manual_pdf_dir",
            PipelineKind::ProductSpecifications => "raw_data_dir.product_specifications_pdf_dir",
        }
    }

    fn output_key(self) -> &'static str {
        match self {
            PipelineKind::CompanyDescription => "json_dir.company_description_json_dir",
            PipelineKind::ProductManual => "json_dir.product_manual_json_dir",
            PipelineKind::ProductSpecifications => "json_dir.product_specifications_json_dir",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully resolved paths for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineJob {
    pub kind: PipelineKind,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Product-specifications only: also dump the intermediate records here.
    pub records_output: Option<PathBuf>,
}

// ── YAML project config ──────────────────────────────────────────────────

/// The `config/config.yml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub raw_data_dir: RawDataDirs,
    #[serde(default)]
    pub json_dir: JsonDirs,
    #[serde(default)]
    pub llm: LlmSettings,
}

/// `raw_data_dir:` section. Despite the `_dir` suffix each entry is a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataDirs {
    pub company_description_docx_dir: Option<PathBuf>,
    /// Legacy spelling of `company_description_docx_dir`.
    pub company_description_doc_dir: Option<PathBuf>,
    pub product_manual_pdf_dir: Option<PathBuf>,
    pub product_specifications_pdf_dir: Option<PathBuf>,
}

/// `json_dir:` section. Each entry is an output file path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonDirs {
    pub company_description_json_dir: Option<PathBuf>,
    pub product_manual_json_dir: Option<PathBuf>,
    pub product_specifications_json_dir: Option<PathBuf>,
    pub product_records_json_dir: Option<PathBuf>,
}

/// Optional `llm:` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSettings {
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Load and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocQaError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| DocQaError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_yaml(&raw).map_err(|e| DocQaError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// The company-description source path.
    ///
    /// Two spellings of this key exist in the wild (`_docx_dir` and
    /// `_doc_dir`). `_docx_dir` wins; the other is accepted with a warning.
    pub fn company_description_source(&self) -> Option<&Path> {
        let raw = &self.raw_data_dir;
        match (
            raw.company_description_docx_dir.as_deref(),
            raw.company_description_doc_dir.as_deref(),
        ) {
            (Some(docx), Some(doc)) => {
                if docx != doc {
                    warn!(
                        "Both raw_data_dir.company_description_docx_dir ({}) and the legacy \
                         raw_data_dir.company_description_doc_dir ({}) are set; using the first",
                        docx.display(),
                        doc.display()
                    );
                }
                Some(docx)
            }
            (Some(docx), None) => Some(docx),
            (None, Some(doc)) => {
                warn!(
                    "raw_data_dir.company_description_doc_dir is a legacy key; \
                     rename it to company_description_docx_dir"
                );
                Some(doc)
            }
            (None, None) => None,
        }
    }

    fn input_for(&self, kind: PipelineKind) -> Option<&Path> {
        match kind {
            PipelineKind::CompanyDescription => self.company_description_source(),
            PipelineKind::ProductManual => self.raw_data_dir.product_manual_pdf_dir.as_deref(),
            PipelineKind::ProductSpecifications => {
                self.raw_data_dir.product_specifications_pdf_dir.as_deref()
            }
        }
    }

    fn output_for(&self, kind: PipelineKind) -> Option<&Path> {
        match kind {
            PipelineKind::CompanyDescription => {
                self.json_dir.company_description_json_dir.as_deref()
            }
            PipelineKind::ProductManual => self.json_dir.product_manual_json_dir.as_deref(),
            PipelineKind::ProductSpecifications => {
                self.json_dir.product_specifications_json_dir.as_deref()
            }
        }
    }

    /// The configured source document of `kind`, resolved against `root`.
    pub fn input_path(&self, kind: PipelineKind, root: &Path) -> Result<PathBuf, DocQaError> {
        self.input_for(kind)
            .map(|p| resolve_path(root, p))
            .ok_or_else(|| DocQaError::MissingConfigKey {
                key: kind.input_key().to_string(),
            })
    }

    /// The configured dataset file of `kind`, resolved against `root`.
    pub fn output_path(&self, kind: PipelineKind, root: &Path) -> Result<PathBuf, DocQaError> {
        self.output_for(kind)
            .map(|p| resolve_path(root, p))
            .ok_or_else(|| DocQaError::MissingConfigKey {
                key: kind.output_key().to_string(),
            })
    }

    /// The optional product-records dump. Only product specifications has one.
    pub fn records_output_path(&self, kind: PipelineKind, root: &Path) -> Option<PathBuf> {
        match kind {
            PipelineKind::ProductSpecifications => self
                .json_dir
                .product_records_json_dir
                .as_deref()
                .map(|p| resolve_path(root, p)),
            _ => None,
        }
    }

    /// Resolve the paths of one pipeline against the project root.
    pub fn job(&self, kind: PipelineKind, root: &Path) -> Result<PipelineJob, DocQaError> {
        Ok(PipelineJob {
            kind,
            input: self.input_path(kind, root)?,
            output: self.output_path(kind, root)?,
            records_output: self.records_output_path(kind, root),
        })
    }
}

/// Join a relative path onto the project root; absolute paths pass through.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Find the project root: the nearest ancestor of `start` (inclusive)
/// containing `config/config.yml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(DEFAULT_CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
raw_data_dir:
  company_description_docx_dir: data/raw/company description.docx
  product_manual_pdf_dir: data/raw/product_manual.pdf
  product_specifications_pdf_dir: /srv/docs/specs.pdf
json_dir:
  company_description_json_dir: data/json/company_description.json
  product_manual_json_dir: data/json/product_manual.json
  product_specifications_json_dir: data/json/product_specifications.json
llm:
  model: gemini-1.5-flash-latest
  api_key_env: GOOGLE_API_KEY3
  temperature: 0.3
"#;

    #[test]
    fn builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key_env, "GOOGLE_API_KEY");
        assert!(config.api_timeout_secs.is_none());
        assert!(config.provider.is_none());
    }

    #[test]
    fn builder_rejects_template_without_placeholder() {
        let err = PipelineConfig::builder()
            .prompt_template("Summarise the document as JSON.")
            .build()
            .unwrap_err();
        assert!(matches!(err, DocQaError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(PipelineConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let config = PipelineConfig::builder().temperature(7.5).build().unwrap();
        assert_eq!(config.temperature, Some(2.0));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = PipelineConfig::builder().api_key("secret-123").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret-123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn parse_sample_yaml() {
        let cfg = ProjectConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            cfg.raw_data_dir.product_manual_pdf_dir.as_deref(),
            Some(Path::new("data/raw/product_manual.pdf"))
        );
        assert_eq!(cfg.llm.model.as_deref(), Some("gemini-1.5-flash-latest"));
    }

    #[test]
    fn settings_flow_into_builder() {
        let cfg = ProjectConfig::from_yaml(SAMPLE).unwrap();
        let config = PipelineConfig::from_settings(&cfg.llm).build().unwrap();
        assert_eq!(config.model, "gemini-1.5-flash-latest");
        assert_eq!(config.api_key_env, "GOOGLE_API_KEY3");
        assert_eq!(config.temperature, Some(0.3));
    }

    #[test]
    fn job_resolves_relative_and_absolute_paths() {
        let cfg = ProjectConfig::from_yaml(SAMPLE).unwrap();
        let root = Path::new("/work/project");

        let job = cfg.job(PipelineKind::CompanyDescription, root).unwrap();
        assert_eq!(
            job.input,
            PathBuf::from("/work/project/data/raw/company description.docx")
        );
        assert!(job.records_output.is_none());

        let job = cfg.job(PipelineKind::ProductSpecifications, root).unwrap();
        assert_eq!(job.input, PathBuf::from("/srv/docs/specs.pdf"));
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let cfg = ProjectConfig::from_yaml("json_dir: {}\n").unwrap();
        let err = cfg
            .job(PipelineKind::ProductManual, Path::new("/tmp"))
            .unwrap_err();
        match err {
            DocQaError::MissingConfigKey { key } => {
                assert_eq!(key, "raw_data_dir.product_manual_pdf_dir")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn legacy_doc_key_is_accepted() {
        let cfg = ProjectConfig::from_yaml(
            "raw_data_dir:\n  company_description_doc_dir: data/raw/company.docx\n",
        )
        .unwrap();
        assert_eq!(
            cfg.company_description_source(),
            Some(Path::new("data/raw/company.docx"))
        );
    }

    #[test]
    fn docx_key_wins_over_legacy_key() {
        let cfg = ProjectConfig::from_yaml(
            "raw_data_dir:\n  company_description_docx_dir: a.docx\n  company_description_doc_dir: b.docx\n",
        )
        .unwrap();
        assert_eq!(cfg.company_description_source(), Some(Path::new("a.docx")));
    }

    #[test]
    fn records_output_only_for_specifications() {
        let cfg = ProjectConfig::from_yaml(
            "raw_data_dir:\n  product_specifications_pdf_dir: s.pdf\n  product_manual_pdf_dir: m.pdf\n\
             json_dir:\n  product_specifications_json_dir: s.json\n  product_manual_json_dir: m.json\n  product_records_json_dir: r.json\n",
        )
        .unwrap();
        let root = Path::new("/p");
        let spec = cfg.job(PipelineKind::ProductSpecifications, root).unwrap();
        assert_eq!(spec.records_output, Some(PathBuf::from("/p/r.json")));
        let manual = cfg.job(PipelineKind::ProductManual, root).unwrap();
        assert!(manual.records_output.is_none());
    }

    #[test]
    fn pipeline_kind_properties() {
        assert_eq!(PipelineKind::ProductSpecifications.indent(), 2);
        assert_eq!(PipelineKind::ProductManual.indent(), 4);
        assert!(!PipelineKind::ProductSpecifications.is_generative());
        assert_eq!(
            PipelineKind::CompanyDescription.source_format(),
            SourceFormat::Docx
        );
        assert_eq!(
            PipelineKind::ProductManual.dataset_kind(),
            DatasetKind::InstructionResponse
        );
    }

    #[test]
    fn find_root_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("config")).unwrap();
        std::fs::write(tmp.path().join(DEFAULT_CONFIG_FILE), "{}\n").unwrap();
        let nested = tmp.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).as_deref(), Some(tmp.path()));
    }
}
