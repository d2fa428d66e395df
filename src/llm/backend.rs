use async_trait::async_trait;
use log::{ debug, error, info, warn };
use reqwest::{ Client as HttpClient, StatusCode };
use serde::de::DeserializeOwned;
use serde_json::{ json, Value as JsonValue };
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

use super::catalog::{ ModelInfo, ProviderDirectory, ProviderInfo };
use super::error::ServiceError;
use super::extract::{ default_chain, extract_reply, ReplyExtractor };
use super::{ CompletionReply, CompletionRequest, CompletionService, KeyRegistry };
use crate::models::chat::RoleMessage;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001/api";

pub const MARKDOWN_HINT: &str =
    "\n\nPlease format your response using Markdown syntax (e.g., **bold**, *italic*, # Heading, - lists, ```code blocks```, etc.) for better readability.";

/// HTTP client for the chat backend: completions, the provider/model
/// directory and API key registration all go through the same base URL.
pub struct BackendClient {
    http: HttpClient,
    base_url: String,
    markdown_hint: bool,
    extractors: Vec<Box<dyn ReplyExtractor>>,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        timeout: Option<Duration>,
        markdown_hint: bool
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let parsed = Url::parse(base_url).map_err(|e|
            format!("Invalid backend URL '{}': {}", base_url, e)
        )?;
        if parsed.cannot_be_a_base() {
            return Err(format!("Backend URL '{}' cannot be used as a base", base_url).into());
        }

        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            markdown_hint,
            extractors: default_chain(),
        })
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn get_json(&self, route: &str) -> Result<JsonValue, ServiceError> {
        let url = self.endpoint(route);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ServiceError::Transport(format!("GET {} failed with status {}", url, resp.status())));
        }
        Ok(resp.json::<JsonValue>().await?)
    }
}

/// Appends [`MARKDOWN_HINT`] to the final message when the user sent it.
pub fn with_markdown_hint(messages: &[RoleMessage]) -> Vec<RoleMessage> {
    let mut messages = messages.to_vec();
    if let Some(last) = messages.last_mut() {
        if last.role == "user" {
            last.content.push_str(MARKDOWN_HINT);
        }
    }
    messages
}

/// Interprets a completion body. The backend reports failures as
/// `{"error": "..."}` (usually with a 4xx status), so the body is inspected
/// before the status.
pub fn parse_completion_body(
    status: StatusCode,
    body: &str,
    extractors: &[Box<dyn ReplyExtractor>]
) -> Result<CompletionReply, ServiceError> {
    let value: JsonValue = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if !status.is_success() => {
            return Err(ServiceError::Transport(format!("HTTP error! status: {} ({})", status, e)));
        }
        Err(e) => {
            return Err(e.into());
        }
    };

    match value.get("error") {
        Some(JsonValue::String(msg)) if !msg.is_empty() => {
            return Ok(CompletionReply::Error(msg.clone()));
        }
        Some(JsonValue::Null) | Some(JsonValue::String(_)) | None => {}
        Some(other) => {
            return Ok(CompletionReply::Error(other.to_string()));
        }
    }

    Ok(CompletionReply::Text(extract_reply(extractors, &value)))
}

/// Accepts `{"<key>": [...]}` as well as a bare array.
fn list_from<T: DeserializeOwned>(body: JsonValue, key: &str) -> Result<Vec<T>, ServiceError> {
    let list = match body {
        JsonValue::Array(_) => body,
        JsonValue::Object(mut map) => map.remove(key).unwrap_or(JsonValue::Array(Vec::new())),
        _ => JsonValue::Array(Vec::new()),
    };
    Ok(serde_json::from_value(list)?)
}

#[async_trait]
impl CompletionService for BackendClient {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionReply, ServiceError> {
        let url = self.endpoint("/chat/completions");
        let payload = if self.markdown_hint {
            CompletionRequest {
                messages: with_markdown_hint(&request.messages),
                ..request.clone()
            }
        } else {
            request.clone()
        };

        info!(
            "Requesting completion: provider={}, model={}, messages={}",
            payload.provider,
            payload.model,
            payload.messages.len()
        );

        let resp = self.http.post(&url).json(&payload).send().await.map_err(|e| {
            error!("Completion request to {} failed: {}", url, e);
            ServiceError::from(e)
        })?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!("Raw completion response ({}): {}", status, body);

        let reply = parse_completion_body(status, &body, &self.extractors)?;
        if let CompletionReply::Error(msg) = &reply {
            warn!("Backend reported an error: {}", msg);
        }
        Ok(reply)
    }
}

#[async_trait]
impl ProviderDirectory for BackendClient {
    async fn list_providers(&self) -> Result<Vec<ProviderInfo>, ServiceError> {
        let body = self.get_json("/providers").await?;
        list_from(body, "providers")
    }

    async fn list_models(&self, provider_id: &str) -> Result<Vec<ModelInfo>, ServiceError> {
        let body = self.get_json(&format!("/providers/{}/models", provider_id)).await?;
        list_from(body, "models")
    }
}

#[async_trait]
impl KeyRegistry for BackendClient {
    async fn register_provider(&self, provider_id: &str, api_key: &str) -> Result<(), ServiceError> {
        let url = self.endpoint("/providers/register");
        let resp = self.http
            .post(&url)
            .json(&json!({ "provider_id": provider_id, "api_key": api_key }))
            .send().await?;
        let body: JsonValue = resp.json().await?;

        if body.get("success").and_then(|s| s.as_bool()).unwrap_or(false) {
            info!("Registered API key for provider '{}'", provider_id);
            return Ok(());
        }
        let msg = body
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("Failed to register provider")
            .to_string();
        Err(ServiceError::Rejected(msg))
    }
}
