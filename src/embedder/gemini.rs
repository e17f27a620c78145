//! Gemini embedding provider (`batchEmbedContents`).
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbeddingError, check_dimensions};
use crate::config::EmbeddingConfig;

/// The API rejects batches with more requests than this.
const MAX_BATCH_REQUESTS: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Blocking client for the Gemini embedding endpoint.
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

/// Model ids are addressed as `models/<name>` in both the URL and the body.
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl GeminiEmbedder {
    pub fn new(
        api_base_url: &str,
        config: &EmbeddingConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        let model = qualified_model(&config.model);
        let endpoint = format!(
            "{}/{model}:batchEmbedContents",
            api_base_url.trim_end_matches('/')
        );

        Ok(Self {
            client,
            endpoint,
            model,
            api_key: api_key.into(),
            dimensions: config.dimensions,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request<'a>(&'a self, texts: &[&'a str], task_type: TaskType) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type,
                })
                .collect(),
        }
    }

    fn send(&self, texts: &[&str], task_type: TaskType) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = self.build_request(texts, task_type);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let vectors = parse_embeddings(parsed, texts.len())?;
        for vector in &vectors {
            check_dimensions(vector, self.dimensions)?;
        }
        Ok(vectors)
    }
}

fn parse_embeddings(
    response: BatchEmbedResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.embeddings.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "requested {expected} embeddings, received {}",
            response.embeddings.len()
        )));
    }
    Ok(response.embeddings.into_iter().map(|e| e.values).collect())
}

impl Embedder for GeminiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.send(&[text], TaskType::RetrievalQuery)?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding in response".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_REQUESTS) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            vectors.extend(self.send(batch, TaskType::RetrievalDocument)?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
