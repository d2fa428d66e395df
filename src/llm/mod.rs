pub mod backend;
pub mod catalog;
pub mod error;
pub mod extract;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };

use crate::models::chat::RoleMessage;
use self::error::ServiceError;

/// Substring the backend uses when no API key is registered for a provider.
pub const PROVIDER_NOT_CONFIGURED: &str = "Provider not configured";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            persona: None,
            mode: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub provider: String,
    pub model: String,
    pub messages: Vec<RoleMessage>,
    pub options: GenerationOptions,
}

/// What the service answered, once a body was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReply {
    Text(String),
    Error(String),
}

pub fn is_provider_not_configured(error: &str) -> bool {
    error.contains(PROVIDER_NOT_CONFIGURED)
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionReply, ServiceError>;
}

#[async_trait]
pub trait KeyRegistry: Send + Sync {
    async fn register_provider(&self, provider_id: &str, api_key: &str) -> Result<(), ServiceError>;
}
