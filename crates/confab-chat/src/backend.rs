//! The remote backend seam.
//!
//! The orchestrator talks to the network through this trait so tests can
//! substitute a stub. The production implementation is the HTTP
//! [`GatewayClient`].

use async_trait::async_trait;

use confab_core::error::ConfabError;
use confab_core::types::{ApiConfig, ChatTurn, ModelInfo};
use confab_gateway::GatewayClient;

/// Remote inference operations as the orchestrator consumes them.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// List the models the configured endpoint advertises.
    async fn list_models(&self, config: &ApiConfig) -> Result<Vec<ModelInfo>, ConfabError>;

    /// Request a chat completion and return the assistant text.
    async fn complete(
        &self,
        config: &ApiConfig,
        model: &str,
        turns: &[ChatTurn],
    ) -> Result<String, ConfabError>;

    /// Request an embedding vector for the given input text.
    async fn embed(
        &self,
        config: &ApiConfig,
        model: &str,
        input: &str,
    ) -> Result<Vec<f32>, ConfabError>;
}

#[async_trait]
impl ChatBackend for GatewayClient {
    async fn list_models(&self, config: &ApiConfig) -> Result<Vec<ModelInfo>, ConfabError> {
        GatewayClient::list_models(self, config).await
    }

    async fn complete(
        &self,
        config: &ApiConfig,
        model: &str,
        turns: &[ChatTurn],
    ) -> Result<String, ConfabError> {
        self.send_chat(config, model, turns).await
    }

    async fn embed(
        &self,
        config: &ApiConfig,
        model: &str,
        input: &str,
    ) -> Result<Vec<f32>, ConfabError> {
        self.get_embedding(config, model, input).await
    }
}
