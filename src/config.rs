//! Configuration types for page-image-to-document conversion.
//!
//! All conversion behaviour is controlled through [`ConvertConfig`], built via
//! its [`ConvertConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to construct the process-wide [`crate::Converter`] once at startup
//! and share it across calls.

use crate::error::Page2DocError;
use serde::{Deserialize, Serialize};

/// Default logical model name the engine serves.
pub const DEFAULT_MODEL: &str = "ds4sd/SmolDocling-256M-preview";

/// Default OpenAI-compatible endpoint base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/v1";

/// Configuration for one conversion pipeline.
///
/// Built via [`ConvertConfig::builder()`] or [`ConvertConfig::default()`].
///
/// # Example
/// ```rust
/// use page2doc::ConvertConfig;
///
/// let config = ConvertConfig::builder()
///     .max_tokens(2048)
///     .base_url("http://localhost:11434/v1")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Logical model identifier resolved by the engine at process start.
    /// Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the OpenAI-compatible streaming endpoint.
    /// Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Optional bearer token for the engine endpoint.
    pub api_key: Option<String>,

    /// Maximum fragments the generation driver accumulates. Default: 4096.
    ///
    /// Generation stops at the `</doctag>` closing marker when the model
    /// emits one; this cap bounds the cost when it never does. Streams cut
    /// at the cap are handled per [`ConvertConfig::truncation`].
    pub max_tokens: usize,

    /// Sampling temperature. Default: 0.0.
    ///
    /// DocTags transcription wants the model faithful to the page, not
    /// creative, so greedy decoding is the right default.
    pub temperature: f32,

    /// HTTP timeout for fetching a URL input, in seconds. Default: 10.
    ///
    /// Only the image fetch is bounded; generation itself has no timeout
    /// (the token cap is its only bound).
    pub fetch_timeout_secs: u64,

    /// Policy for tag streams truncated at the token cap.
    /// Default: [`TruncationPolicy::Salvage`].
    pub truncation: TruncationPolicy,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_tokens: 4096,
            temperature: 0.0,
            fetch_timeout_secs: 10,
            truncation: TruncationPolicy::default(),
        }
    }
}

impl ConvertConfig {
    /// Create a new builder for `ConvertConfig`.
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn truncation(mut self, policy: TruncationPolicy) -> Self {
        self.config.truncation = policy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConvertConfig, Page2DocError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(Page2DocError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Page2DocError::InvalidConfig("model must not be empty".into()));
        }
        if c.base_url.trim().is_empty() {
            return Err(Page2DocError::InvalidConfig(
                "base_url must not be empty".into(),
            ));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(Page2DocError::InvalidConfig(
                "fetch_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// What to do when generation hits the token cap before `</doctag>` appears.
///
/// The cap cutoff is a real edge case, not hypothetical: the driver stops at
/// `max_tokens` regardless of completeness, so a dense page can hand the
/// parser a stream with unclosed elements. The policy is explicit so callers
/// choose between silent best-effort output and a hard failure they can
/// surface to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TruncationPolicy {
    /// Close any open elements at end of input and export the partial
    /// document. (default)
    #[default]
    Salvage,
    /// Reject truncated streams with a parse error.
    Strict,
}
