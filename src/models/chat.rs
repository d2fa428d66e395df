use chrono::Local;
use serde::{ Serialize, Deserialize };
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "ai")]
    Assistant,
    System,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
            Sender::System => "system",
        }
    }

    /// Role used when the message is replayed to the completion service.
    pub fn wire_role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant | Sender::System => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: String,
    #[serde(default)]
    pub is_retry: bool,
    #[serde(default)]
    pub is_retry_response: bool,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            is_retry: false,
            is_retry_response: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }
}

pub type Conversation = Vec<Message>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedChat {
    pub name: String,
    pub history: Conversation,
}

/// A message as the completion service sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for RoleMessage {
    fn from(msg: &Message) -> Self {
        RoleMessage {
            role: msg.sender.wire_role().to_string(),
            content: msg.text.clone(),
        }
    }
}

pub fn to_role_messages(conversation: &[Message]) -> Vec<RoleMessage> {
    conversation.iter().map(RoleMessage::from).collect()
}
