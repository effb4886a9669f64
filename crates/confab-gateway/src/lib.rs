//! Confab gateway crate - remote inference over HTTP.
//!
//! Talks to OpenAI/Ollama-style endpoints exposing `/v1/models`,
//! `/v1/chat/completions`, and `/v1/embeddings`, translating the two
//! supported response dialects for each route into uniform results. The
//! gateway is stateless: every call takes an explicit endpoint
//! configuration and no local state is retained between calls.

pub mod client;
pub mod dialect;

pub use client::{normalize_host, GatewayClient};
