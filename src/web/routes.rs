//! HTTP handlers: the single chat page plus a JSON endpoint.
//!
//! Pipeline calls block on network I/O, so they run on tokio's blocking pool.
//! The pipeline mutex keeps queries strictly one at a time.
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use html_escape::encode_text;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::index::RetrievedChunk;
use crate::pipeline::{Answer, PipelineState};
use crate::web::server::WebContext;

pub const PAGE_TITLE: &str = "Experimenting with Gemini and Streamlit";
pub const INPUT_PLACEHOLDER: &str = "Ask me anything";

const STYLE: &str = "body{font-family:sans-serif;max-width:46rem;margin:3rem auto;padding:0 1rem}\
input{width:100%;padding:.7rem;font-size:1rem;box-sizing:border-box}\
.question{font-weight:bold}.answer{white-space:pre-wrap}.error{color:#b00020}";

// ── Request / response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub query: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub context: Vec<RetrievedChunk>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Serialize)]
pub struct HealthBody {
    pub status: PipelineState,
    pub chunks: usize,
}

/// A failed query as shown to the user.
struct Failure {
    kind: &'static str,
    message: String,
}

// ── Rendering ────────────────────────────────────────────────────────

fn render_page(turn: Option<(&str, Result<&str, &Failure>)>) -> Html<String> {
    let result = match turn {
        None => String::new(),
        Some((query, outcome)) => {
            let body = match outcome {
                Ok(answer) => format!(r#"<p class="answer">{}</p>"#, encode_text(answer)),
                Err(failure) => format!(
                    r#"<p class="error">{}: {}</p>"#,
                    failure.kind,
                    encode_text(&failure.message)
                ),
            };
            format!(
                r#"<section class="turn"><p class="question">{}</p>{body}</section>"#,
                encode_text(query)
            )
        }
    };

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
<style>{STYLE}</style>
</head>
<body>
<main>
<h1>{PAGE_TITLE}</h1>
<form method="post" action="/">
<input type="text" name="query" placeholder="{INPUT_PLACEHOLDER}" autocomplete="off" autofocus>
</form>
{result}
</main>
</body>
</html>
"#
    ))
}

// ── Pipeline bridge ──────────────────────────────────────────────────

async fn run_query(ctx: &WebContext, query: String) -> Result<Answer, Failure> {
    let pipeline = ctx.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.blocking_lock().ask(&query)).await;

    match outcome {
        Ok(Ok(answer)) => Ok(answer),
        Ok(Err(e)) => {
            error!("Query failed ({}): {e}", e.kind());
            Err(Failure {
                kind: e.kind(),
                message: e.to_string(),
            })
        }
        Err(e) => {
            error!("Query task failed: {e}");
            Err(Failure {
                kind: "InternalError",
                message: e.to_string(),
            })
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET / — the empty chat page.
pub async fn index() -> Html<String> {
    render_page(None)
}

/// POST / — run one query and render its answer under the input.
pub async fn submit(State(ctx): State<WebContext>, Form(form): Form<AskForm>) -> Html<String> {
    if form.query.trim().is_empty() {
        return render_page(None);
    }

    let outcome = run_query(&ctx, form.query.clone()).await;
    let shown = match &outcome {
        Ok(answer) => Ok(answer.text.as_str()),
        Err(failure) => Err(failure),
    };
    render_page(Some((&form.query, shown)))
}

/// POST /api/ask — JSON variant returning the answer and its context.
pub async fn api_ask(State(ctx): State<WebContext>, Json(request): Json<AskRequest>) -> Response {
    if request.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "BadRequest",
                message: "query is required".to_string(),
            }),
        )
            .into_response();
    }

    match run_query(&ctx, request.query).await {
        Ok(answer) => Json(AskResponse {
            answer: answer.text,
            context: answer.context,
        })
        .into_response(),
        Err(failure) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody {
                error: failure.kind,
                message: failure.message,
            }),
        )
            .into_response(),
    }
}

/// GET /health
pub async fn health(State(ctx): State<WebContext>) -> Json<HealthBody> {
    Json(HealthBody {
        status: PipelineState::Ready,
        chunks: ctx.chunk_count,
    })
}
