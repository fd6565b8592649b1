//! The conversion orchestrator: one image in, four document renditions out.
//!
//! [`Converter`] wires the pipeline stages together: resolve the input,
//! format the prompt, stream generation to a DocTags string, parse it into a
//! structured document, and export Markdown, self-contained HTML, and plain
//! text alongside the raw tag stream.
//!
//! [`Converter::convert`] never returns `Err`. Every failure is folded into
//! the returned [`OutputBundle`]: the DocTags slot carries the contextual
//! message and the other three slots hold the literal string `"Error"`, so
//! callers that fan the four outputs out to a UI always have something to
//! show.

use crate::config::ConvertConfig;
use crate::doctags::{parse, text};
use crate::engine::{GenerationOptions, OpenAiCompatEngine, VlmEngine};
use crate::error::Page2DocError;
use crate::pipeline::{generate, input};
use crate::prompts::format_prompt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Placeholder written into the structured slots of a failed conversion.
pub const ERROR_PLACEHOLDER: &str = "Error";

/// The four renditions produced by one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct OutputBundle {
    /// The raw DocTags stream, or the failure message.
    pub doctags: String,
    /// Markdown export, or [`ERROR_PLACEHOLDER`].
    pub markdown: String,
    /// Self-contained HTML export, or [`ERROR_PLACEHOLDER`].
    pub html: String,
    /// Plain-text projection of the raw stream, or [`ERROR_PLACEHOLDER`].
    pub plain_text: String,
}

impl OutputBundle {
    /// Bundle representing a failed conversion: the first slot carries the
    /// error's message, the rest the fixed placeholder.
    pub fn from_error(err: &Page2DocError) -> Self {
        Self {
            doctags: err.to_string(),
            markdown: ERROR_PLACEHOLDER.to_string(),
            html: ERROR_PLACEHOLDER.to_string(),
            plain_text: ERROR_PLACEHOLDER.to_string(),
        }
    }

    /// True when this bundle was produced by [`OutputBundle::from_error`].
    pub fn is_error(&self) -> bool {
        self.markdown == ERROR_PLACEHOLDER
            && self.html == ERROR_PLACEHOLDER
            && self.plain_text == ERROR_PLACEHOLDER
    }
}

/// A reusable image-to-document converter bound to one engine and one
/// configuration. Cheap to share: hold it in an `Arc` and call
/// [`Converter::convert`] concurrently.
pub struct Converter {
    engine: Arc<dyn VlmEngine>,
    config: ConvertConfig,
}

impl Converter {
    /// Build a converter over an explicit engine.
    pub fn new(engine: Arc<dyn VlmEngine>, config: ConvertConfig) -> Self {
        Self { engine, config }
    }

    /// Build a converter backed by the bundled OpenAI-compatible engine,
    /// pointed at the configured endpoint.
    pub fn from_config(config: ConvertConfig) -> Result<Self, Page2DocError> {
        let engine = OpenAiCompatEngine::from_config(&config)
            .map_err(|e| Page2DocError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(Arc::new(engine), config))
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Convert one page image into the four output renditions.
    ///
    /// An empty `prompt` falls back to [`crate::prompts::DEFAULT_PROMPT`].
    /// This never fails outward; see the module docs for the error contract.
    pub async fn convert(&self, input: Option<input::ImageInput>, prompt: &str) -> OutputBundle {
        let source = input.as_ref().map(|i| i.source_id());
        match self.convert_inner(input, prompt).await {
            Ok(bundle) => bundle,
            Err(e) => {
                match source {
                    Some(src) => error!("Conversion failed for {}: {}", src, e),
                    None => error!("Conversion failed: {}", e),
                }
                OutputBundle::from_error(&e)
            }
        }
    }

    async fn convert_inner(
        &self,
        input: Option<input::ImageInput>,
        prompt: &str,
    ) -> Result<OutputBundle, Page2DocError> {
        let resolved = input::resolve(input, self.config.fetch_timeout_secs).await?;
        let prompt = format_prompt(prompt, 1);

        info!("Generating DocTags for image: {}", resolved.source);
        let options = GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let stream = self
            .engine
            .stream_generate(&resolved.image, &prompt, &options)
            .await
            .map_err(|e| Page2DocError::Generation(e.to_string()))?;

        let doctags = generate::collect_doctags(stream, self.config.max_tokens).await?;
        info!(
            "Generation finished: {} chars of DocTags from {}",
            doctags.len(),
            self.engine.model_id()
        );

        let document = parse::parse_doctags(&doctags, self.config.truncation)?;
        if document.truncated {
            warn!("Tag stream was truncated; exporting salvaged partial document");
        }

        let markdown = document.to_markdown();
        let html = document
            .to_html(&resolved.image)
            .map_err(|e| Page2DocError::Parse(e.to_string()))?;
        let plain_text = text::extract_plain_text(&doctags);

        Ok(OutputBundle {
            doctags,
            markdown,
            html,
            plain_text,
        })
    }
}
