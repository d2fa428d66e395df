//! Reply text extraction.
//!
//! The backend has returned reply text under several shapes over time. Each
//! shape is an [`ReplyExtractor`]; [`extract_reply`] walks the chain in order
//! and the first strategy that finds text wins.

use log::{ debug, warn };
use serde_json::Value as JsonValue;

pub const UNEXTRACTABLE_PLACEHOLDER: &str = "Unable to extract response content";
pub const EMPTY_CHOICE_PLACEHOLDER: &str = "No content in response";

pub trait ReplyExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, body: &JsonValue) -> Option<String>;
}

fn non_empty_str(value: Option<&JsonValue>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// `{"text": "..."}`
pub struct TextField;

impl ReplyExtractor for TextField {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract(&self, body: &JsonValue) -> Option<String> {
        non_empty_str(body.get("text"))
    }
}

/// `{"content": "..."}`
pub struct ContentField;

impl ReplyExtractor for ContentField {
    fn name(&self) -> &'static str {
        "content"
    }

    fn extract(&self, body: &JsonValue) -> Option<String> {
        non_empty_str(body.get("content"))
    }
}

/// `{"data": {"content": "..."}}`
pub struct DataContent;

impl ReplyExtractor for DataContent {
    fn name(&self) -> &'static str {
        "data.content"
    }

    fn extract(&self, body: &JsonValue) -> Option<String> {
        non_empty_str(body.get("data").and_then(|d| d.get("content")))
    }
}

/// OpenAI style `{"choices": [{"message": {"content": "..."}}]}`.
///
/// A first choice that carries a message but no content still counts as a
/// match and yields [`EMPTY_CHOICE_PLACEHOLDER`].
pub struct OpenAiChoice;

impl ReplyExtractor for OpenAiChoice {
    fn name(&self) -> &'static str {
        "choices[0].message.content"
    }

    fn extract(&self, body: &JsonValue) -> Option<String> {
        let message = body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .filter(|m| m.is_object())?;
        Some(
            non_empty_str(message.get("content")).unwrap_or_else(||
                EMPTY_CHOICE_PLACEHOLDER.to_string()
            )
        )
    }
}

pub fn default_chain() -> Vec<Box<dyn ReplyExtractor>> {
    vec![Box::new(TextField), Box::new(ContentField), Box::new(DataContent), Box::new(OpenAiChoice)]
}

pub fn extract_reply(chain: &[Box<dyn ReplyExtractor>], body: &JsonValue) -> String {
    for extractor in chain {
        if let Some(text) = extractor.extract(body) {
            debug!("Reply extracted via '{}'", extractor.name());
            return text;
        }
    }
    warn!("Unexpected response structure, no content found: {}", body);
    UNEXTRACTABLE_PLACEHOLDER.to_string()
}
