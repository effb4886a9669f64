//! HTTP client for OpenAI/Ollama-style inference endpoints.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tracing::debug;

use confab_core::error::ConfabError;
use confab_core::types::{ApiConfig, ChatTurn, ModelInfo};

use crate::dialect;

/// Normalize a user-entered hostname into a base URL.
///
/// Trims whitespace, prefixes `https://` when no explicit scheme is present,
/// and strips exactly one trailing slash. Applied at call time on every
/// request and never cached, so the hostname can be edited between calls
/// without re-saving.
pub fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    match with_scheme.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => with_scheme,
    }
}

/// Build the chat-completions request body.
///
/// Streaming is disabled regardless of caller intent: partial frames are
/// never processed.
pub fn chat_request_body(model: &str, turns: &[ChatTurn]) -> Value {
    json!({
        "model": model,
        "messages": turns,
        "stream": false,
    })
}

/// Stateless client for the three inference routes.
///
/// Every call takes an explicit endpoint configuration; nothing is retained
/// between calls beyond reqwest's connection pool. No retries and no
/// client-level timeout live here.
#[derive(Clone, Default)]
pub struct GatewayClient {
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// List the models the endpoint advertises.
    ///
    /// An unrecognized 2xx body yields an empty list, not an error.
    pub async fn list_models(&self, config: &ApiConfig) -> Result<Vec<ModelInfo>, ConfabError> {
        let url = format!("{}/v1/models", normalize_host(&config.host));
        debug!(%url, "Listing models");

        let response = self
            .with_headers(self.http.get(&url), config)
            .send()
            .await
            .map_err(transport)?;
        let body: Value = ok_body(response).await?;
        Ok(dialect::parse_models(&body))
    }

    /// Request a chat completion for the given turns.
    pub async fn send_chat(
        &self,
        config: &ApiConfig,
        model: &str,
        turns: &[ChatTurn],
    ) -> Result<String, ConfabError> {
        let url = format!("{}/v1/chat/completions", normalize_host(&config.host));
        debug!(%url, model, turns = turns.len(), "Sending chat completion");

        let response = self
            .with_headers(self.http.post(&url), config)
            .json(&chat_request_body(model, turns))
            .send()
            .await
            .map_err(transport)?;
        let body: Value = ok_body(response).await?;
        dialect::parse_chat(&body)
    }

    /// Request an embedding vector for the given input text.
    pub async fn get_embedding(
        &self,
        config: &ApiConfig,
        model: &str,
        input: &str,
    ) -> Result<Vec<f32>, ConfabError> {
        let url = format!("{}/v1/embeddings", normalize_host(&config.host));
        debug!(%url, model, "Requesting embedding");

        let response = self
            .with_headers(self.http.post(&url), config)
            .json(&json!({ "model": model, "input": input }))
            .send()
            .await
            .map_err(transport)?;
        let body: Value = ok_body(response).await?;
        dialect::parse_embedding(&body)
    }

    /// Attach the JSON content type and, when present, the credential.
    ///
    /// The credential is sent verbatim as the `Authorization` value: the
    /// caller supplies the exact expected format, `Bearer ` prefix included
    /// if the target requires one.
    fn with_headers(&self, request: RequestBuilder, config: &ApiConfig) -> RequestBuilder {
        let request = request.header(CONTENT_TYPE, "application/json");
        match &config.credential {
            Some(credential) => request.header(AUTHORIZATION, credential),
            None => request,
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient").finish()
    }
}

fn transport(err: reqwest::Error) -> ConfabError {
    ConfabError::Transport(err.to_string())
}

/// Fail non-2xx responses with their status text and body; decode the rest
/// as JSON.
async fn ok_body(response: reqwest::Response) -> Result<Value, ConfabError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ConfabError::RequestFailed {
            status: status.to_string(),
            body,
        });
    }
    response.json().await.map_err(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::types::Role;

    // ---- Hostname normalization ----

    #[test]
    fn test_normalize_bare_host_gets_https() {
        assert_eq!(normalize_host("localhost:11434"), "https://localhost:11434");
    }

    #[test]
    fn test_normalize_keeps_explicit_scheme() {
        assert_eq!(normalize_host("http://x/"), "http://x");
        assert_eq!(normalize_host("https://api.example.com"), "https://api.example.com");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_host("  ollama.local \n"), "https://ollama.local");
    }

    #[test]
    fn test_normalize_strips_exactly_one_trailing_slash() {
        assert_eq!(normalize_host("http://x//"), "http://x/");
    }

    #[test]
    fn test_normalize_preserves_path() {
        assert_eq!(normalize_host("http://x/api/"), "http://x/api");
    }

    // ---- Request body ----

    #[test]
    fn test_chat_request_body_forces_stream_off() {
        let turns = vec![ChatTurn {
            role: Role::User,
            content: "hi".to_string(),
        }];
        let body = chat_request_body("llama3", &turns);
        assert_eq!(body["stream"], serde_json::json!(false));
        assert_eq!(body["model"], "llama3");
    }

    #[test]
    fn test_chat_request_body_carries_only_role_and_content() {
        let turns = vec![ChatTurn {
            role: Role::Assistant,
            content: "reply".to_string(),
        }];
        let body = chat_request_body("m", &turns);
        let message = &body["messages"][0];
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["content"], "reply");
        assert_eq!(message.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_client_is_cloneable() {
        let client = GatewayClient::new();
        let _clone = client.clone();
    }
}
