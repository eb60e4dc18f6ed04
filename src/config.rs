//! Configuration for table extraction.
//!
//! All behaviour is controlled through [`ExtractConfig`], built via
//! [`ExtractConfigBuilder`]. The credential is an explicit field rather than
//! a process-wide environment lookup: the library never reads env vars, so a
//! missing key fails loudly at the first call instead of deep inside a
//! request. The CLI layers `TOGETHER_API_KEY` on top via clap's `env`
//! support.

use crate::engine::OcrEngine;
use crate::error::TableScanError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default vision model, the one llama-style OCR wrappers use.
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo";

/// Default OpenAI-compatible API base.
pub const DEFAULT_API_BASE: &str = "https://api.together.xyz/v1";

/// Configuration for an extraction run.
///
/// Built via [`ExtractConfig::builder()`] or [`ExtractConfig::default()`].
///
/// # Example
/// ```rust
/// use tablescan::ExtractConfig;
///
/// let config = ExtractConfig::builder()
///     .api_key("tok-...")
///     .max_retries(5)
///     .output_dir("results")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// OCR service credential. Checked before the first attempt; absent key
    /// (with no injected [`ExtractConfig::engine`]) is
    /// [`TableScanError::MissingApiKey`].
    pub api_key: Option<String>,

    /// Vision model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// Custom transcription prompt. If None, uses [`crate::prompts::DEFAULT_OCR_PROMPT`].
    pub prompt: Option<String>,

    /// Pre-constructed OCR engine. Takes precedence over `api_key`; when set,
    /// no HTTP client is built at all. This is also the seam tests use to
    /// script responses.
    pub engine: Option<Arc<dyn OcrEngine>>,

    /// Maximum OCR attempts, first try included. Default: 3.
    ///
    /// Each attempt is the full sequence: service call, parse, row-count
    /// check. A run that produces zero rows consumes an attempt just like a
    /// failed call, because an empty table from a table image usually means
    /// the model misread it.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s. Set to 0 to retry
    /// immediately, which is what the tests do.
    pub retry_backoff_ms: u64,

    /// Per-attempt OCR call timeout in seconds. Default: 60.
    ///
    /// Without it, the only bound on a run is the attempt count, not
    /// wall-clock time.
    pub api_timeout_secs: u64,

    /// Directory the JSON result file is written into. Created if missing.
    /// Default: `ocr_results`.
    pub output_dir: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            prompt: None,
            engine: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            output_dir: PathBuf::from("ocr_results"),
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("engine", &self.engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, TableScanError> {
        let c = &self.config;
        if c.max_retries == 0 {
            return Err(TableScanError::InvalidConfig(
                "max_retries must be >= 1".into(),
            ));
        }
        if c.api_base.trim().is_empty() {
            return Err(TableScanError::InvalidConfig("api_base is empty".into()));
        }
        if c.model.trim().is_empty() {
            return Err(TableScanError::InvalidConfig("model is empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractConfig::default();
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.model, DEFAULT_MODEL);
        assert!(c.api_key.is_none());
        assert_eq!(c.output_dir, PathBuf::from("ocr_results"));
    }

    #[test]
    fn zero_retries_rejected() {
        let err = ExtractConfig::builder().max_retries(0).build().unwrap_err();
        assert!(matches!(err, TableScanError::InvalidConfig(_)));
    }

    #[test]
    fn empty_model_rejected() {
        let err = ExtractConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, TableScanError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let c = ExtractConfig::builder()
            .api_key("tok-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("tok-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
