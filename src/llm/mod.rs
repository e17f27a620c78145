/// Chat-completion providers used to answer a question from its prompt.
pub mod gemini;
pub mod mock;

use std::sync::Arc;

use thiserror::Error;

use crate::prompt::Prompt;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("chat request failed: {0}")]
    Request(String),

    #[error("chat request timed out")]
    Timeout,

    #[error("chat provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response blocked by the provider: {0}")]
    Blocked(String),

    #[error("chat provider returned no text")]
    EmptyResponse,
}

/// Trait for chat-completion models.
pub trait ChatModel: Send + Sync {
    /// Send the two-turn prompt and return the generated text.
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        (**self).generate(prompt)
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}
