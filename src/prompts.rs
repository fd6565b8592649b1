//! Prompt formatting for DocTags generation.
//!
//! Centralising the prompt text and the conversation shape here serves two
//! purposes:
//!
//! 1. **Single source of truth** — the instruction wording and the chat
//!    template live in exactly one place.
//!
//! 2. **Testability** — formatting is pure and deterministic, so unit tests
//!    can assert the exact payload without spinning up an engine.

/// Default instruction when the caller supplies no prompt of their own.
pub const DEFAULT_PROMPT: &str = "Convert this page to docling.";

/// A prompt wrapped into the single-turn conversation shape the engine
/// expects: the user's instruction plus the number of attached images
/// (always 1 in this pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPrompt {
    /// The instruction text, trimmed.
    pub text: String,
    /// Number of image attachments the request carries.
    pub image_count: usize,
}

impl FormattedPrompt {
    /// Render the chat-template form used by SmolDocling-style checkpoints,
    /// with one `<image>` placeholder per attachment. Engines speaking a
    /// structured message format use [`FormattedPrompt::text`] directly
    /// instead.
    pub fn to_chat_template(&self) -> String {
        let placeholders = "<image>".repeat(self.image_count);
        format!(
            "<|im_start|>User:{placeholders}{}<end_of_utterance>\nAssistant:",
            self.text
        )
    }
}

/// Wrap an instruction into a [`FormattedPrompt`]. Pure, no I/O.
///
/// An empty or whitespace-only instruction falls back to [`DEFAULT_PROMPT`]
/// so the model always receives a task description.
pub fn format_prompt(text: &str, image_count: usize) -> FormattedPrompt {
    let trimmed = text.trim();
    let text = if trimmed.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        trimmed.to_string()
    };
    FormattedPrompt { text, image_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_deterministic() {
        let a = format_prompt("Convert this page to docling.", 1);
        let b = format_prompt("Convert this page to docling.", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_prompt_falls_back_to_default() {
        let p = format_prompt("   ", 1);
        assert_eq!(p.text, DEFAULT_PROMPT);
    }

    #[test]
    fn chat_template_has_one_image_placeholder() {
        let p = format_prompt("Read the table.", 1);
        let rendered = p.to_chat_template();
        assert_eq!(rendered.matches("<image>").count(), 1);
        assert!(rendered.contains("Read the table."));
        assert!(rendered.ends_with("Assistant:"));
    }
}
