//! # page2doc
//!
//! Convert a single page image into a structured document using a streaming
//! vision-language model that emits the DocTags markup vocabulary.
//!
//! One call produces four renditions of the same page: the raw DocTags
//! stream, Markdown, a self-contained HTML file with embedded images, and a
//! plain-text projection.
//!
//! ## Pipeline
//!
//! ```text
//! URL / path / decoded image
//!        │ resolve + decode
//!        ▼
//! page raster ──▶ prompt + PNG data URI ──▶ streaming engine
//!                                               │ fragments
//!                                               ▼
//!                                   DocTags stream (stop at </doctag>
//!                                    or token cap)
//!                                               │ parse
//!                                               ▼
//!                                   structured document
//!                                      │           │
//!                                 Markdown   self-contained HTML
//!                                   (plain text comes from the raw
//!                                    stream, not the parse)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use page2doc::{Converter, ConvertConfig, ImageInput};
//!
//! # async fn run() -> Result<(), page2doc::Page2DocError> {
//! let config = ConvertConfig::builder()
//!     .base_url("http://localhost:8000/v1")
//!     .build()?;
//! let converter = Converter::from_config(config)?;
//!
//! let bundle = converter
//!     .convert(ImageInput::from_str_input("page.png"), "")
//!     .await;
//! if bundle.is_error() {
//!     eprintln!("{}", bundle.doctags);
//! } else {
//!     println!("{}", bundle.markdown);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Conversion never fails outward: errors come back inside the
//! [`OutputBundle`], with the contextual message in the DocTags slot and the
//! literal string `"Error"` in the other three.

pub mod config;
pub mod convert;
pub mod doctags;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod prompts;

pub use config::{ConvertConfig, ConvertConfigBuilder, TruncationPolicy};
pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use convert::{Converter, OutputBundle, ERROR_PLACEHOLDER};
pub use doctags::{DocItem, DocTagsDocument};
pub use engine::{EngineError, GenerationOptions, OpenAiCompatEngine, TokenStream, VlmEngine};
pub use error::Page2DocError;
pub use pipeline::input::ImageInput;
pub use prompts::DEFAULT_PROMPT;
