/// Scripted chat model for tests and offline runs.
///
/// Replies with a fixed answer (or a fixed failure) and remembers the last
/// prompt it was given.
use std::sync::Mutex;

use super::{ChatModel, GenerationError};
use crate::prompt::Prompt;

pub struct MockChatModel {
    reply: Option<String>,
    last_prompt: Mutex<Option<Prompt>>,
}

impl MockChatModel {
    /// A model that always answers `reply`.
    #[must_use]
    pub fn answering(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            last_prompt: Mutex::new(None),
        }
    }

    /// A model whose provider is always unavailable.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            reply: None,
            last_prompt: Mutex::new(None),
        }
    }

    /// The most recent prompt passed to [`ChatModel::generate`].
    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ChatModel for MockChatModel {
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.clone());
        }
        self.reply.clone().ok_or_else(|| GenerationError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }

    fn model(&self) -> &str {
        "mock"
    }
}
