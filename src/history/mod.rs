mod file;
mod memory;

pub use file::FileSavedChatStore;
pub use memory::MemorySavedChatStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error as ThisError;

use crate::models::chat::{ Conversation, SavedChat };

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Saved chat store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Saved chat store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The set of named, frozen conversations.
#[async_trait]
pub trait SavedChatStore: Send + Sync {
    /// Stores a snapshot and returns the name it was stored under.
    async fn save(&self, name: &str, history: &Conversation) -> Result<String, StoreError>;

    async fn load(&self, name: &str) -> Result<Option<SavedChat>, StoreError>;

    /// Returns whether anything was removed.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;

    async fn names(&self) -> Result<Vec<String>, StoreError>;
}

/// Picks `name`, or `name (2)`, `name (3)`... whichever is not taken.
pub fn unique_name(name: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", name, n))
        .find(|candidate| !taken.iter().any(|t| t == candidate))
        .unwrap_or_else(|| name.to_string())
}

pub fn create_saved_chat_store(
    store_type: &str,
    data_dir: &Path
) -> Result<Arc<dyn SavedChatStore>, Box<dyn Error + Send + Sync>> {
    match store_type.to_lowercase().as_str() {
        "file" => {
            let path = data_dir.join("saved_chats.json");
            info!("Saved chats will be stored in: {}", path.display());
            Ok(Arc::new(FileSavedChatStore::open(path)?))
        }
        "memory" => {
            info!("Saved chats will be kept in memory for this session");
            Ok(Arc::new(MemorySavedChatStore::default()))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported saved chat store type: {}", store_type)
                    )
                )
            ),
    }
}
