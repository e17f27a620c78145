//! # pdfqa — ask questions about a single PDF
//!
//! Loads one PDF at startup, splits it into overlapping chunks, embeds them
//! into an in-memory vector index and answers questions with a chat model
//! grounded on the most similar chunks.
//!
//! ## Architecture
//!
//! - **[`config`]** — JSON configuration, `.env` loading, API key lookup
//! - **[`loader`]** — Per-page text extraction via lopdf
//! - **[`splitter`]** — Recursive character splitter with overlap
//! - **[`embedder`]** — Embedding providers (Gemini, deterministic mock)
//! - **[`index`]** — SQLite + sqlite-vec in-memory vector index
//! - **[`indexer`]** — Batch embedding of chunks into the index
//! - **[`retriever`]** — Top-k similarity retrieval for a query
//! - **[`prompt`]** — System instruction and context assembly
//! - **[`llm`]** — Chat providers (Gemini, scripted mock)
//! - **[`pipeline`]** — Startup state machine and per-query flow
//! - **[`web`]** — axum chat page and JSON API

pub mod config;
pub mod embedder;
pub mod index;
pub mod indexer;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod splitter;
pub mod web;
