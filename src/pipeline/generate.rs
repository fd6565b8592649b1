//! Generation driver: accumulate streamed fragments into a DocTags stream.
//!
//! Generation cost is proportional to output length, so the driver consumes
//! the engine's lazy stream fragment by fragment and stops the moment the
//! accumulated text contains the closing marker — dropping the stream
//! releases the underlying connection. The cutoff is inclusive: the marker
//! (and whatever rode in on the same fragment) stays in the output.
//!
//! The second stop condition is the token cap. A stream cut at the cap may
//! hold unclosed elements; that outcome is not handled here — the document
//! builder applies the configured [`crate::config::TruncationPolicy`].

use crate::doctags::CLOSING_MARKER;
use crate::engine::TokenStream;
use crate::error::Page2DocError;
use futures::StreamExt;
use tracing::debug;

/// Drain a token stream until the closing marker appears or `max_tokens`
/// fragments have been consumed, whichever comes first.
///
/// Engine failures mid-stream abort the accumulation and surface as
/// `Generation` errors carrying the engine's message. No retry.
pub async fn collect_doctags(
    mut stream: TokenStream,
    max_tokens: usize,
) -> Result<String, Page2DocError> {
    let mut accumulated = String::new();
    let mut consumed = 0usize;

    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(|e| Page2DocError::Generation(e.to_string()))?;
        accumulated.push_str(&fragment);
        consumed += 1;

        if accumulated.contains(CLOSING_MARKER) {
            debug!("Closing marker seen after {} fragments", consumed);
            break;
        }
        if consumed >= max_tokens {
            debug!("Token cap {} reached before closing marker", max_tokens);
            break;
        }
    }

    Ok(accumulated)
}
