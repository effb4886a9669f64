//! Dialect-tolerant response parsing.
//!
//! Each route supports two response shapes (OpenAI-style and a flatter
//! Ollama-style). Every shape gets a named matcher that either produces a
//! result or declines; matchers are tried in a fixed priority order, so
//! supporting a third dialect is a pure extension.

use serde_json::Value;
use tracing::debug;

use confab_core::error::ConfabError;
use confab_core::types::ModelInfo;

// =============================================================================
// Model listing
// =============================================================================

/// OpenAI-style `{"data": [{"id", "name"?}]}`.
fn models_openai(body: &Value) -> Option<Vec<ModelInfo>> {
    let items = body.get("data")?.as_array()?;
    let mut models = Vec::new();
    for item in items {
        let id = item.get("id")?.as_str()?.to_string();
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        models.push(ModelInfo { id, name });
    }
    Some(models)
}

/// Ollama-style `{"models": [{"name", "model"?}]}`.
fn models_ollama(body: &Value) -> Option<Vec<ModelInfo>> {
    let items = body.get("models")?.as_array()?;
    let mut models = Vec::new();
    for item in items {
        let name = item.get("name")?.as_str()?.to_string();
        let id = item
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());
        models.push(ModelInfo { id, name });
    }
    Some(models)
}

/// Parse a model-listing response body.
///
/// Any shape matching neither dialect yields an empty sequence, not an
/// error: zero models means "try again or proceed without validation".
pub fn parse_models(body: &Value) -> Vec<ModelInfo> {
    const MATCHERS: &[(&str, fn(&Value) -> Option<Vec<ModelInfo>>)] =
        &[("openai", models_openai), ("ollama", models_ollama)];

    for (name, matcher) in MATCHERS {
        if let Some(models) = matcher(body) {
            debug!(dialect = name, count = models.len(), "Parsed model listing");
            return models;
        }
    }
    Vec::new()
}

// =============================================================================
// Chat completion
// =============================================================================

/// OpenAI-style `choices[0].message.content`.
fn chat_openai(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Flat `message.content`.
fn chat_flat(body: &Value) -> Option<String> {
    body.get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Extract the assistant text from a 2xx chat-completion body.
pub fn parse_chat(body: &Value) -> Result<String, ConfabError> {
    const MATCHERS: &[(&str, fn(&Value) -> Option<String>)] =
        &[("openai", chat_openai), ("flat", chat_flat)];

    for (name, matcher) in MATCHERS {
        if let Some(content) = matcher(body) {
            debug!(dialect = name, "Parsed chat completion");
            return Ok(content);
        }
    }
    Err(ConfabError::UnexpectedFormat(format!(
        "chat completion body matched no known dialect: {}",
        truncate_for_error(body)
    )))
}

// =============================================================================
// Embeddings
// =============================================================================

fn as_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// OpenAI-style `data[0].embedding`.
fn embedding_openai(body: &Value) -> Option<Vec<f32>> {
    as_vector(body.get("data")?.get(0)?.get("embedding")?)
}

/// Flat `embedding`.
fn embedding_flat(body: &Value) -> Option<Vec<f32>> {
    as_vector(body.get("embedding")?)
}

/// Extract the vector from a 2xx embeddings body.
pub fn parse_embedding(body: &Value) -> Result<Vec<f32>, ConfabError> {
    const MATCHERS: &[(&str, fn(&Value) -> Option<Vec<f32>>)] =
        &[("openai", embedding_openai), ("flat", embedding_flat)];

    for (name, matcher) in MATCHERS {
        if let Some(vector) = matcher(body) {
            debug!(dialect = name, dims = vector.len(), "Parsed embedding");
            return Ok(vector);
        }
    }
    Err(ConfabError::UnexpectedFormat(format!(
        "embeddings body matched no known dialect: {}",
        truncate_for_error(body)
    )))
}

/// Keep error messages readable when the body is large.
fn truncate_for_error(body: &Value) -> String {
    let mut text = body.to_string();
    if text.chars().count() > 200 {
        text = text.chars().take(200).collect();
        text.push_str("...");
    }
    text
}
