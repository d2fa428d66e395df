use async_trait::async_trait;
use log::{ info, warn };
use serde::{ Deserialize, Serialize };

use super::error::ServiceError;

pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

type CatalogEntry = (&'static str, &'static str, &'static [(&'static str, &'static str)]);

const FALLBACK_CATALOG: &[CatalogEntry] = &[
    (
        "groq",
        "Groq",
        &[
            ("llama-3.1-8b-instant", "LLaMA 3.1 8B Instant"),
            ("llama-3.1-70b-versatile", "LLaMA 3.1 70B Versatile"),
            ("llama3-70b-8192", "LLaMA 3 70B"),
        ],
    ),
    (
        "deepseek",
        "Deepseek",
        &[
            ("deepseek-chat", "Deepseek Chat"),
            ("deepseek-coder", "Deepseek Coder"),
            ("deepseek-llm", "Deepseek LLM"),
        ],
    ),
    (
        "openai",
        "OpenAI",
        &[
            ("gpt-4.1-nano-2025-04-14", "GPT-4.1 Nano (2025-04-14)"),
            ("gpt-4.1-nano", "GPT-4.1 Nano"),
            ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
            ("gpt-4", "GPT-4"),
        ],
    ),
    (
        "anthropic",
        "Anthropic",
        &[
            ("claude-2.0", "Claude 2.0"),
            ("claude-instant-1.2", "Claude Instant 1.2"),
        ],
    ),
    ("google", "Google", &[("gemini-pro", "Gemini Pro")]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawModel")]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// The directory lists models either as `{id, name}` objects or as bare ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawModel {
    Full {
        id: String,
        name: Option<String>,
    },
    Bare(String),
}

impl From<RawModel> for ModelInfo {
    fn from(raw: RawModel) -> Self {
        match raw {
            RawModel::Full { id, name } => {
                let name = name.unwrap_or_else(|| id.clone());
                ModelInfo { id, name }
            }
            RawModel::Bare(id) => ModelInfo { name: id.clone(), id },
        }
    }
}

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn list_providers(&self) -> Result<Vec<ProviderInfo>, ServiceError>;

    async fn list_models(&self, provider_id: &str) -> Result<Vec<ModelInfo>, ServiceError>;
}

pub fn fallback_providers() -> Vec<ProviderInfo> {
    FALLBACK_CATALOG.iter()
        .map(|(id, name, _)| ProviderInfo {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

pub fn fallback_models(provider_id: &str) -> Vec<ModelInfo> {
    let wanted = provider_id.to_lowercase();
    FALLBACK_CATALOG.iter()
        .find(|(id, _, _)| *id == wanted)
        .map(|(_, _, models)| {
            models
                .iter()
                .map(|(id, name)| ModelInfo {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Model to preselect when a provider is chosen and no model is set yet.
pub fn default_model_for(provider_id: &str) -> Option<&'static str> {
    if provider_id.eq_ignore_ascii_case(DEFAULT_PROVIDER) {
        Some(DEFAULT_GROQ_MODEL)
    } else {
        None
    }
}

pub async fn providers_or_fallback(directory: &dyn ProviderDirectory) -> Vec<ProviderInfo> {
    match directory.list_providers().await {
        Ok(providers) if !providers.is_empty() => {
            info!("Loaded {} providers from directory", providers.len());
            providers
        }
        Ok(_) => {
            warn!("Provider directory returned no providers, using fallback catalog");
            fallback_providers()
        }
        Err(e) => {
            warn!("Failed to fetch providers ({}), using fallback catalog", e);
            fallback_providers()
        }
    }
}

pub async fn models_or_fallback(
    directory: &dyn ProviderDirectory,
    provider_id: &str
) -> Vec<ModelInfo> {
    match directory.list_models(provider_id).await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => {
            warn!("No models listed for '{}', using fallback catalog", provider_id);
            fallback_models(provider_id)
        }
        Err(e) => {
            warn!("Failed to fetch models for '{}' ({}), using fallback catalog", provider_id, e);
            fallback_models(provider_id)
        }
    }
}
