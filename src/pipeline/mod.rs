//! Pipeline stages for image-to-document conversion.
//!
//! Each submodule implements exactly one transformation step, keeping stages
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ generate ──▶ doctags parse/export
//! (URL/path/  (base64    (stream      (structured document,
//!  decoded)    PNG)       + cutoff)    four outputs)
//! ```
//!
//! 1. [`input`]    — decide the input shape once and decode to one raster
//! 2. [`encode`]   — PNG-encode + base64-wrap for the engine request and for
//!    inline HTML embedding
//! 3. [`generate`] — drive the engine's token stream with marker/cap cutoff;
//!    the only stage with unbounded-duration I/O

pub mod encode;
pub mod generate;
pub mod input;
