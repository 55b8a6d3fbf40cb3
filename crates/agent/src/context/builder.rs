//! Context builder: turns a history into the prompt for one model call.
//!
//! # Determinism
//!
//! `build` is a pure function of the system prompt, the window size and
//! the history. Nothing time-dependent or random goes into the prompt, so
//! a retried call sees exactly the prompt the failed call saw.

use stepwise_core::message::History;

/// Heading placed between the system instructions and the transcript.
pub const HISTORY_HEADING: &str = "Conversation History:";

/// Marker for the unanswered assistant turn that closes every prompt.
pub const OPEN_TURN: &str = "ASSISTANT:";

#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
    window: Option<usize>,
}

impl ContextBuilder {
    /// A builder that renders the full history.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            window: None,
        }
    }

    /// Only render the most recent `window` messages (`None` for all).
    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.window = window;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn window(&self) -> Option<usize> {
        self.window
    }

    /// Render the prompt for the next model call.
    ///
    /// Messages outside the window stay in `history`; they are only left
    /// out of the rendered text.
    pub fn build(&self, history: &History) -> String {
        let mut prompt = String::with_capacity(self.system_prompt.len() + 256);
        prompt.push_str(&self.system_prompt);
        prompt.push_str("\n\n");
        prompt.push_str(HISTORY_HEADING);
        prompt.push('\n');

        for message in history.window(self.window) {
            prompt.push_str(message.role.label());
            prompt.push_str(": ");
            prompt.push_str(&message.content);
            prompt.push('\n');
        }

        prompt.push_str(OPEN_TURN);
        prompt
    }
}
