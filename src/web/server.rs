/// Web server setup using `axum`.
///
/// Provides `WebContext` (shared state) and `WebServer` (startup logic).
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex as TokioMutex;
use tracing::info;

use crate::pipeline::RagPipeline;
use crate::web::routes;

/// Shared application context available to all handlers.
#[derive(Clone)]
pub struct WebContext {
    pub pipeline: Arc<TokioMutex<RagPipeline>>,
    /// Fixed at startup; the index is never modified afterwards.
    pub chunk_count: usize,
}

impl WebContext {
    pub fn new(pipeline: Arc<TokioMutex<RagPipeline>>, chunk_count: usize) -> Self {
        Self {
            pipeline,
            chunk_count,
        }
    }
}

/// HTTP server wrapping the context.
#[derive(Clone)]
pub struct WebServer {
    pub ctx: WebContext,
}

impl WebServer {
    pub fn new(ctx: WebContext) -> Self {
        Self { ctx }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(routes::index).post(routes::submit))
            .route("/api/ask", post(routes::api_ask))
            .route("/health", get(routes::health))
            .with_state(self.ctx.clone())
    }

    /// Serve until Ctrl-C.
    pub async fn start(self, bind: &str) -> Result<()> {
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("failed to bind {bind}"))?;
        info!("Serving on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down");
            })
            .await
            .context("web server encountered an error")?;

        Ok(())
    }
}
