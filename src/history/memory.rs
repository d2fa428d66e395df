use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ unique_name, SavedChatStore, StoreError };
use crate::models::chat::{ Conversation, SavedChat };

#[derive(Default)]
pub struct MemorySavedChatStore {
    chats: RwLock<Vec<SavedChat>>,
}

#[async_trait]
impl SavedChatStore for MemorySavedChatStore {
    async fn save(&self, name: &str, history: &Conversation) -> Result<String, StoreError> {
        let mut chats = self.chats.write().await;
        let taken: Vec<String> = chats.iter().map(|c| c.name.clone()).collect();
        let name = unique_name(name, &taken);
        chats.push(SavedChat {
            name: name.clone(),
            history: history.clone(),
        });
        Ok(name)
    }

    async fn load(&self, name: &str) -> Result<Option<SavedChat>, StoreError> {
        Ok(self.chats.read().await.iter().find(|c| c.name == name).cloned())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut chats = self.chats.write().await;
        let before = chats.len();
        chats.retain(|c| c.name != name);
        Ok(chats.len() != before)
    }

    async fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.chats.read().await.iter().map(|c| c.name.clone()).collect())
    }
}
