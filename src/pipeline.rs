//! The question-answering pipeline.
//!
//! Startup runs load → split → index exactly once and yields a
//! [`RagPipeline`] only when every step succeeded. Each query then runs
//! retrieve → assemble → generate against the read-only index.
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::embedder::{Embedder, EmbeddingError};
use crate::index::{IndexError, RetrievedChunk};
use crate::indexer::{BuildError, Indexer};
use crate::llm::{ChatModel, GenerationError};
use crate::loader::{LoadError, Page, load_pdf};
use crate::prompt::assemble_prompt;
use crate::retriever::{RetrievalError, Retriever};
use crate::splitter::{SplitterError, TextSplitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Uninitialized,
    Indexing,
    Ready,
    Failed,
}

/// Fatal errors raised while building the index.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("failed to load document: {0}")]
    Load(#[from] LoadError),

    #[error("invalid splitter settings: {0}")]
    Split(#[from] SplitterError),

    #[error("failed to embed document chunks: {0}")]
    Embedding(EmbeddingError),

    #[error("failed to build vector index: {0}")]
    Index(IndexError),

    #[error("startup already ran (state: {0:?})")]
    InvalidState(PipelineState),
}

impl From<BuildError> for StartupError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Embedding(e) => Self::Embedding(e),
            BuildError::Index(e) => Self::Index(e),
        }
    }
}

impl StartupError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Load(_) => "LoadError",
            Self::Split(_) => "ConfigError",
            Self::Embedding(_) => "EmbeddingError",
            Self::Index(_) => "IndexError",
            Self::InvalidState(_) => "StateError",
        }
    }
}

/// Errors that fail a single query; the pipeline stays ready.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("failed to embed query: {0}")]
    Embedding(EmbeddingError),

    #[error("similarity search failed: {0}")]
    Index(IndexError),

    #[error("failed to generate answer: {0}")]
    Generation(#[from] GenerationError),
}

impl From<RetrievalError> for QueryError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::Embedding(e) => Self::Embedding(e),
            RetrievalError::Index(e) => Self::Index(e),
        }
    }
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Embedding(_) => "EmbeddingError",
            Self::Index(_) => "IndexError",
            Self::Generation(_) => "GenerationError",
        }
    }
}

/// The model's answer and the context it was given.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub context: Vec<RetrievedChunk>,
}

/// Drives the one-time `Uninitialized → Indexing → Ready` transition.
#[derive(Debug)]
pub struct Bootstrap {
    state: PipelineState,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Uninitialized,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        info!("Pipeline state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Loads `config.pdf_path` and indexes it.
    pub fn run(
        &mut self,
        config: &Config,
        embedder: Box<dyn Embedder>,
        chat: Box<dyn ChatModel>,
    ) -> Result<RagPipeline, StartupError> {
        self.start()?;
        let result = load_pdf(&config.pdf_path)
            .map_err(StartupError::from)
            .and_then(|pages| index_pages(&pages, config, embedder, chat));
        self.finish(result)
    }

    /// Indexes pages that were already extracted.
    pub fn run_with_pages(
        &mut self,
        pages: &[Page],
        config: &Config,
        embedder: Box<dyn Embedder>,
        chat: Box<dyn ChatModel>,
    ) -> Result<RagPipeline, StartupError> {
        self.start()?;
        let result = index_pages(pages, config, embedder, chat);
        self.finish(result)
    }

    fn start(&mut self) -> Result<(), StartupError> {
        if self.state != PipelineState::Uninitialized {
            return Err(StartupError::InvalidState(self.state));
        }
        self.transition(PipelineState::Indexing);
        Ok(())
    }

    fn finish(
        &mut self,
        result: Result<RagPipeline, StartupError>,
    ) -> Result<RagPipeline, StartupError> {
        match &result {
            Ok(_) => self.transition(PipelineState::Ready),
            Err(e) => {
                error!("Startup failed ({}): {e}", e.kind());
                self.transition(PipelineState::Failed);
            }
        }
        result
    }
}

fn index_pages(
    pages: &[Page],
    config: &Config,
    embedder: Box<dyn Embedder>,
    chat: Box<dyn ChatModel>,
) -> Result<RagPipeline, StartupError> {
    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
    let chunks = splitter.split_pages(pages);
    info!(
        "Split {} pages into {} chunks (size {}, overlap {})",
        pages.len(),
        chunks.len(),
        splitter.chunk_size(),
        splitter.chunk_overlap()
    );

    let index = Indexer::new(
        embedder.as_ref(),
        config.embedding.dimensions,
        config.embedding.batch_size,
    )
    .build(&chunks)?;

    Ok(RagPipeline {
        retriever: Retriever::new(index, embedder, config.search_top_k),
        chat,
    })
}

/// A ready pipeline: the built index plus the chat model.
pub struct RagPipeline {
    retriever: Retriever,
    chat: Box<dyn ChatModel>,
}

impl RagPipeline {
    /// Runs the full startup sequence from `config.pdf_path`.
    pub fn build(
        config: &Config,
        embedder: Box<dyn Embedder>,
        chat: Box<dyn ChatModel>,
    ) -> Result<Self, StartupError> {
        Bootstrap::new().run(config, embedder, chat)
    }

    /// Runs startup on pages that were already extracted.
    pub fn from_pages(
        pages: &[Page],
        config: &Config,
        embedder: Box<dyn Embedder>,
        chat: Box<dyn ChatModel>,
    ) -> Result<Self, StartupError> {
        Bootstrap::new().run_with_pages(pages, config, embedder, chat)
    }

    /// Always `Ready`: a pipeline value only exists after a successful startup.
    pub fn state(&self) -> PipelineState {
        PipelineState::Ready
    }

    pub fn chunk_count(&self) -> usize {
        self.retriever.index().len()
    }

    pub fn top_k(&self) -> usize {
        self.retriever.top_k()
    }

    pub fn model(&self) -> &str {
        self.chat.model()
    }

    /// Answers one question. Failures affect only this query.
    pub fn ask(&self, query: &str) -> Result<Answer, QueryError> {
        let context = self.retriever.retrieve(query)?;
        let prompt = assemble_prompt(&context, query);
        let text = self.chat.generate(&prompt)?;

        info!("Q: {query}");
        info!("A: {text} ({} context chunks)", context.len());
        Ok(Answer { text, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use crate::llm::mock::MockChatModel;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        inner: MockEmbedder,
        calls: Arc<AtomicUsize>,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts)
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
    }

    struct DownEmbedder;

    impl Embedder for DownEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Request("connection refused".to_string()))
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Request("connection refused".to_string()))
        }

        fn dimensions(&self) -> usize {
            768
        }
    }

    /// Indexing works; every query embedding fails.
    struct QueryDownEmbedder(MockEmbedder);

    impl Embedder for QueryDownEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Request("connection reset".to_string()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.0.embed_batch(texts)
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }
    }

    fn mock_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_sky_scenario() {
        let chat = Arc::new(MockChatModel::answering("The sky is blue."));
        let pages = vec![Page::new(1, "The sky is blue. Grass is green.")];
        let pipeline = RagPipeline::from_pages(
            &pages,
            &mock_config(),
            Box::new(MockEmbedder::default()),
            Box::new(chat.clone()),
        )
        .unwrap();

        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(pipeline.chunk_count(), 1);

        let answer = pipeline.ask("What color is the sky?").unwrap();
        assert_eq!(answer.text, "The sky is blue.");
        assert_eq!(answer.context.len(), 1);
        assert_eq!(answer.context[0].text, "The sky is blue. Grass is green.");
        assert_eq!(answer.context[0].page, 1);

        let prompt = chat.last_prompt().unwrap();
        assert_eq!(prompt.context(), "The sky is blue. Grass is green.");
        assert_eq!(prompt.human, "What color is the sky?");
    }

    #[test]
    fn test_missing_document_never_embeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = mock_config();
        config.pdf_path = "/definitely/not/here.pdf".to_string();

        let mut bootstrap = Bootstrap::new();
        let err = bootstrap
            .run(
                &config,
                Box::new(CountingEmbedder {
                    inner: MockEmbedder::default(),
                    calls: calls.clone(),
                }),
                Box::new(MockChatModel::answering("unused")),
            )
            .err()
            .unwrap();

        assert!(matches!(err, StartupError::Load(LoadError::NotFound(_))));
        assert_eq!(err.kind(), "LoadError");
        assert_eq!(bootstrap.state(), PipelineState::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_embedding_failure_is_fatal() {
        let mut bootstrap = Bootstrap::new();
        let err = bootstrap
            .run_with_pages(
                &[Page::new(1, "some text")],
                &mock_config(),
                Box::new(DownEmbedder),
                Box::new(MockChatModel::answering("unused")),
            )
            .err()
            .unwrap();
        assert_eq!(err.kind(), "EmbeddingError");
        assert_eq!(bootstrap.state(), PipelineState::Failed);

        // No second attempt from the same bootstrap
        let again = bootstrap
            .run_with_pages(
                &[Page::new(1, "some text")],
                &mock_config(),
                Box::new(MockEmbedder::default()),
                Box::new(MockChatModel::answering("unused")),
            )
            .err()
            .unwrap();
        assert!(matches!(
            again,
            StartupError::InvalidState(PipelineState::Failed)
        ));
    }

    #[test]
    fn test_bad_splitter_settings() {
        let mut config = mock_config();
        config.chunk_overlap = config.chunk_size;
        let err = RagPipeline::from_pages(
            &[Page::new(1, "text")],
            &config,
            Box::new(MockEmbedder::default()),
            Box::new(MockChatModel::answering("unused")),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StartupError::Split(_)));
    }

    #[test]
    fn test_three_chunks_top_four() {
        let mut config = mock_config();
        config.chunk_size = 30;
        config.chunk_overlap = 0;
        let pages = vec![
            Page::new(1, "Rust is a systems language."),
            Page::new(2, "The sky is blue today."),
            Page::new(3, "Bread needs flour."),
        ];
        let pipeline = RagPipeline::from_pages(
            &pages,
            &config,
            Box::new(MockEmbedder::default()),
            Box::new(MockChatModel::answering("ok")),
        )
        .unwrap();
        assert_eq!(pipeline.chunk_count(), 3);
        assert_eq!(pipeline.top_k(), 4);

        let answer = pipeline.ask("anything").unwrap();
        assert_eq!(answer.context.len(), 3);
    }

    #[test]
    fn test_empty_document_still_answers() {
        let chat = Arc::new(MockChatModel::answering("I don't know."));
        let pipeline = RagPipeline::from_pages(
            &[Page::new(1, ""), Page::new(2, "   ")],
            &mock_config(),
            Box::new(MockEmbedder::default()),
            Box::new(chat.clone()),
        )
        .unwrap();
        assert_eq!(pipeline.chunk_count(), 0);

        let answer = pipeline.ask("What is this about?").unwrap();
        assert_eq!(answer.text, "I don't know.");
        assert!(answer.context.is_empty());
        assert_eq!(chat.last_prompt().unwrap().context(), "");
    }

    #[test]
    fn test_generation_failure_keeps_pipeline_ready() {
        let pipeline = RagPipeline::from_pages(
            &[Page::new(1, "The sky is blue.")],
            &mock_config(),
            Box::new(MockEmbedder::default()),
            Box::new(MockChatModel::failing()),
        )
        .unwrap();

        let err = pipeline.ask("What color is the sky?").unwrap_err();
        assert_eq!(err.kind(), "GenerationError");
        assert_eq!(pipeline.state(), PipelineState::Ready);
        // The next query is served independently
        assert_eq!(pipeline.ask("again").unwrap_err().kind(), "GenerationError");
    }

    #[test]
    fn test_query_embedding_failure_keeps_pipeline_ready() {
        let chat = Arc::new(MockChatModel::answering("unused"));
        let pipeline = RagPipeline::from_pages(
            &[Page::new(1, "The sky is blue.")],
            &mock_config(),
            Box::new(QueryDownEmbedder(MockEmbedder::default())),
            Box::new(chat.clone()),
        )
        .unwrap();
        assert_eq!(pipeline.chunk_count(), 1);

        let err = pipeline.ask("What color is the sky?").unwrap_err();
        assert!(matches!(
            err,
            QueryError::Embedding(EmbeddingError::Request(_))
        ));
        assert_eq!(err.kind(), "EmbeddingError");
        // The chat model is never reached
        assert!(chat.last_prompt().is_none());

        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(pipeline.ask("again").unwrap_err().kind(), "EmbeddingError");
    }
}
