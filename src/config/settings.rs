use async_trait::async_trait;
use log::info;
use serde::{ Deserialize, Serialize };
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::llm::catalog::{ DEFAULT_GROQ_MODEL, DEFAULT_PROVIDER };
use crate::llm::GenerationOptions;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the settings panel controls. Persona and mode are passed
/// through to the backend untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: String,
    pub model: String,
    pub persona: String,
    pub mode: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub audio_response: bool,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_GROQ_MODEL.to_string(),
            persona: "Default".to_string(),
            mode: "chat".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            audio_response: false,
            dark_mode: false,
        }
    }
}

impl Settings {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            persona: Some(self.persona.clone()).filter(|p| !p.is_empty()),
            mode: Some(self.mode.clone()).filter(|m| !m.is_empty()),
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.provider.trim().is_empty() && !self.model.trim().is_empty()
    }
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// `Ok(None)` when no defaults were ever saved.
    async fn load_defaults(&self) -> Result<Option<Settings>, SettingsError>;

    async fn save_defaults(&self, settings: &Settings) -> Result<(), SettingsError>;
}

#[derive(Default)]
pub struct MemorySettingsRepository {
    stored: RwLock<Option<Settings>>,
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn load_defaults(&self) -> Result<Option<Settings>, SettingsError> {
        Ok(self.stored.read().await.clone())
    }

    async fn save_defaults(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.stored.write().await = Some(settings.clone());
        Ok(())
    }
}

pub struct FileSettingsRepository {
    path: PathBuf,
}

impl FileSettingsRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SettingsRepository for FileSettingsRepository {
    async fn load_defaults(&self) -> Result<Option<Settings>, SettingsError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings: Settings = serde_json::from_str(&raw)?;
        info!("Loaded default settings from {}", self.path.display());
        Ok(Some(settings))
    }

    async fn save_defaults(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(settings)?).await?;
        info!("Saved default settings to {}", self.path.display());
        Ok(())
    }
}
