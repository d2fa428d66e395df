use async_trait::async_trait;
use log::{ error, info };
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::{ unique_name, SavedChatStore, StoreError };
use crate::models::chat::{ Conversation, SavedChat };

/// Saved chats persisted as one pretty-printed JSON array.
///
/// The whole file is rewritten on every change; the in-memory copy is the
/// source of truth while the process runs.
pub struct FileSavedChatStore {
    path: PathBuf,
    chats: Mutex<Vec<SavedChat>>,
}

impl FileSavedChatStore {
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let chats = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() { Vec::new() } else { serde_json::from_str(&raw)? }
        } else {
            Vec::new()
        };
        info!("Loaded {} saved chats from {}", chats.len(), path.display());
        Ok(Self {
            path,
            chats: Mutex::new(chats),
        })
    }

    /// Replaces the file through a temp file and a rename.
    async fn persist(&self, chats: &[SavedChat]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(chats)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            error!("Failed to replace {}: {}", self.path.display(), e);
            StoreError::from(e)
        })
    }
}

#[async_trait]
impl SavedChatStore for FileSavedChatStore {
    async fn save(&self, name: &str, history: &Conversation) -> Result<String, StoreError> {
        let mut chats = self.chats.lock().await;
        let taken: Vec<String> = chats.iter().map(|c| c.name.clone()).collect();
        let name = unique_name(name, &taken);
        chats.push(SavedChat {
            name: name.clone(),
            history: history.clone(),
        });
        if let Err(e) = self.persist(&chats).await {
            chats.pop();
            return Err(e);
        }
        Ok(name)
    }

    async fn load(&self, name: &str) -> Result<Option<SavedChat>, StoreError> {
        Ok(self.chats.lock().await.iter().find(|c| c.name == name).cloned())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut chats = self.chats.lock().await;
        let before = chats.clone();
        chats.retain(|c| c.name != name);
        if chats.len() == before.len() {
            return Ok(false);
        }
        if let Err(e) = self.persist(&chats).await {
            *chats = before;
            return Err(e);
        }
        Ok(true)
    }

    async fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.chats.lock().await.iter().map(|c| c.name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Message;

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("saved_chats.json");
        let history = vec![Message::user("hello"), Message::assistant("**hi**")];

        let store = FileSavedChatStore::open(path.clone()).unwrap();
        store.save("work", &history).await.unwrap();
        store.save("scratch", &Vec::new()).await.unwrap();
        assert!(store.delete("scratch").await.unwrap());
        drop(store);

        let reopened = FileSavedChatStore::open(path).unwrap();
        assert_eq!(reopened.names().await.unwrap(), vec!["work"]);
        assert_eq!(reopened.load("work").await.unwrap().unwrap().history, history);
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_and_disk_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store = FileSavedChatStore::open(blocker.join("saved_chats.json")).unwrap();
        assert!(matches!(store.save("a", &Vec::new()).await, Err(StoreError::Io(_))));
        assert!(store.names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved_chats.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileSavedChatStore::open(path), Err(StoreError::Json(_))));
    }
}
