//! Two-turn prompt assembly: a system turn carrying the retrieved context and
//! a human turn carrying the question.

/// Fixed instruction placed before the retrieved context.
pub const SYSTEM_INSTRUCTION: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.";

/// Joins retrieved chunks inside the context slot.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub human: String,
}

impl Prompt {
    /// The interpolated context slot of the system turn.
    pub fn context(&self) -> &str {
        self.system
            .strip_prefix(SYSTEM_INSTRUCTION)
            .and_then(|rest| rest.strip_prefix(CONTEXT_SEPARATOR))
            .unwrap_or_default()
    }
}

/// Builds the prompt for `query` from chunks in retrieval order.
///
/// Chunk and query text are inserted verbatim.
pub fn assemble_prompt<S: AsRef<str>>(context: &[S], query: &str) -> Prompt {
    let joined = context
        .iter()
        .map(|chunk| chunk.as_ref())
        .collect::<Vec<&str>>()
        .join(CONTEXT_SEPARATOR);

    Prompt {
        system: format!("{SYSTEM_INSTRUCTION}{CONTEXT_SEPARATOR}{joined}"),
        human: query.to_string(),
    }
}
