//! The VLM engine seam: a streaming generation contract plus the bundled
//! OpenAI-compatible implementation.
//!
//! The pipeline never talks to a model directly; it consumes a
//! [`TokenStream`] — a lazy, finite sequence of text fragments. The consumer
//! may stop at any point (early break on the closing marker) with no side
//! effect beyond dropping the stream and releasing the underlying connection.
//!
//! [`OpenAiCompatEngine`] drives any endpoint speaking the OpenAI
//! chat-completions protocol with `stream: true` (vLLM, SGLang, Ollama,
//! LM Studio all qualify), hand-parsing the SSE `data:` framing. The model is
//! identified by a fixed logical name resolved by the serving side at process
//! start; this crate never loads weights itself.

use crate::prompts::FormattedPrompt;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use image::DynamicImage;
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, warn};

/// A lazy, finite stream of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, EngineError>> + Send>>;

/// Failures raised by a [`VlmEngine`].
///
/// The pipeline converts all of these into
/// [`crate::error::Page2DocError::Generation`], keeping the original message.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The byte stream broke or carried an undecodable frame mid-generation.
    #[error("stream error: {0}")]
    Stream(String),

    /// The page image could not be encoded for the request.
    #[error("image encoding failed: {0}")]
    Encode(String),
}

/// Per-call generation knobs, derived from [`crate::ConvertConfig`].
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens, forwarded to the endpoint and
    /// enforced again by the driver.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A vision-language model that generates text incrementally from one image
/// and one formatted prompt.
#[async_trait]
pub trait VlmEngine: Send + Sync {
    /// The logical model name this engine serves.
    fn model_id(&self) -> &str;

    /// Start a generation and return the fragment stream.
    ///
    /// Errors returned here mean generation never started; errors inside the
    /// stream mean it broke mid-flight. The caller owns the stream and may
    /// drop it early.
    async fn stream_generate(
        &self,
        image: &DynamicImage,
        prompt: &FormattedPrompt,
        options: &GenerationOptions,
    ) -> Result<TokenStream, EngineError>;
}

// ── OpenAI-compatible engine ─────────────────────────────────────────────

/// Engine over an OpenAI-compatible `/chat/completions` streaming endpoint.
pub struct OpenAiCompatEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatEngine {
    /// Build an engine for the given endpoint and logical model name.
    ///
    /// The client carries no overall timeout: generation length is bounded by
    /// the token cap, not wall-clock time.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    /// Build an engine from a [`crate::ConvertConfig`].
    pub fn from_config(config: &crate::ConvertConfig) -> Result<Self, EngineError> {
        Self::new(&config.base_url, &config.model, config.api_key.clone())
    }
}

#[async_trait]
impl VlmEngine for OpenAiCompatEngine {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_generate(
        &self,
        image: &DynamicImage,
        prompt: &FormattedPrompt,
        options: &GenerationOptions,
    ) -> Result<TokenStream, EngineError> {
        let data_uri = crate::pipeline::encode::encode_png_data_uri(image)
            .map_err(|e| EngineError::Encode(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "stream": true,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": data_uri } },
                    { "type": "text", "text": prompt.text },
                ],
            }],
        });

        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model={})", url, self.model);

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(sse_token_stream(response.bytes_stream().boxed()))
    }
}

// ── SSE decoding ─────────────────────────────────────────────────────────

/// One decoded SSE line.
#[derive(Debug, PartialEq)]
enum SseLine {
    /// A content fragment from a `data:` frame.
    Token(String),
    /// The `data: [DONE]` sentinel.
    Done,
    /// Comment, empty line, keep-alive, or a frame without content.
    Ignore,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode a single SSE line into a token, the DONE sentinel, or nothing.
///
/// Frames that are not valid chunk JSON are skipped with a warning rather
/// than failing the stream; endpoints interleave role/usage frames that
/// carry no content.
fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches('\r');
    let Some(rest) = line.strip_prefix("data:") else {
        return SseLine::Ignore;
    };
    let payload = rest.trim_start();
    if payload.is_empty() {
        return SseLine::Ignore;
    }
    if payload == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => match chunk.choices.first().and_then(|c| c.delta.content.clone()) {
            Some(content) if !content.is_empty() => SseLine::Token(content),
            _ => SseLine::Ignore,
        },
        Err(e) => {
            warn!("Skipping undecodable SSE frame: {}", e);
            SseLine::Ignore
        }
    }
}

struct SseDecoder<S> {
    bytes: S,
    buf: String,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn a raw HTTP byte stream into a [`TokenStream`] by line-buffering the
/// SSE framing. Content fragments are yielded in arrival order; the stream
/// ends at `data: [DONE]` or when the connection closes.
fn sse_token_stream<S>(bytes: S) -> TokenStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + Unpin + 'static,
{
    let decoder = SseDecoder {
        bytes,
        buf: String::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(decoder, |mut st| async move {
        loop {
            if let Some(token) = st.pending.pop_front() {
                return Some((Ok(token), st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                None => {
                    st.done = true;
                    // Trailing partial line without a final newline.
                    let leftover = std::mem::take(&mut st.buf);
                    if let SseLine::Token(t) = parse_sse_line(&leftover) {
                        st.pending.push_back(t);
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(EngineError::Stream(e.to_string())), st));
                }
                Some(Ok(chunk)) => {
                    st.buf.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(pos) = st.buf.find('\n') {
                        let line: String = st.buf.drain(..=pos).collect();
                        match parse_sse_line(line.trim_end_matches('\n')) {
                            SseLine::Token(t) => st.pending.push_back(t),
                            SseLine::Done => {
                                st.done = true;
                                break;
                            }
                            SseLine::Ignore => {}
                        }
                    }
                }
            }
        }
    }))
}
