//! Error types for the page2doc library.
//!
//! Every failure in the pipeline is terminal for its invocation: there is no
//! retry anywhere, and nothing panics across the public boundary. The
//! [`crate::convert::Converter::convert`] entry point recovers every
//! [`Page2DocError`] into an error-shaped [`crate::OutputBundle`], so the
//! `Display` strings below are not just diagnostics — they are the exact
//! first-slot messages the caller sees. Keep them stable.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the page2doc pipeline.
///
/// The variants mirror the pipeline stages: input resolution
/// (`MissingInput` .. `UrlDecode`), generation (`Generation`), DocTags
/// processing (`Parse`) and configuration (`InvalidConfig`).
#[derive(Debug, Error)]
pub enum Page2DocError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No image was supplied (absent input, or an empty string).
    #[error("Error: No image uploaded.")]
    MissingInput,

    /// Local image file does not exist.
    #[error("Error: Image file not found.")]
    FileNotFound { path: PathBuf },

    /// Local image file exists but could not be read.
    #[error("Error opening image from filepath: {reason}")]
    FileOpen { path: PathBuf, reason: String },

    /// Local file was read but is not a recognisable image.
    #[error(
        "Error: Could not identify image file: {path}. \
         Please check if the file is a valid image. Details: {detail}"
    )]
    FileDecode { path: String, detail: String },

    /// HTTP transport failure or non-success status while fetching the URL.
    #[error("Error fetching image from URL: {reason}")]
    UrlFetch { url: String, reason: String },

    /// URL fetch succeeded but the body is not a recognisable image.
    #[error(
        "Error: Could not identify image from URL: {url}. \
         Please check if the URL is a valid image. Details: {detail}"
    )]
    UrlDecode { url: String, detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The VLM engine failed; carries the engine's original message.
    #[error("Error during model generation: {0}")]
    Generation(String),

    // ── DocTags errors ────────────────────────────────────────────────────
    /// The tag stream is malformed, empty, or (under
    /// [`crate::config::TruncationPolicy::Strict`]) truncated.
    #[error("Error processing DocTags output: {0}")]
    Parse(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
