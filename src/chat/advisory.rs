use thiserror::Error;

/// Non-fatal, user-correctable notices. Raising one never changes the
/// conversation, except [`Advisory::MissingSelection`] which leaves a system
/// notice behind so the reason stays visible in the history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Advisory {
    #[error("Type a message first.")]
    EmptyInput,
    #[error("Please select a provider and model before sending a message.")]
    MissingSelection,
    #[error("A request is already in progress; wait for the reply.")]
    RequestInFlight,
    #[error("No previous query to retry.")]
    NothingToRetry,
    #[error("Enter a name for this chat.")]
    EmptyName,
    #[error("No saved chats.")]
    NoSavedChats,
    #[error("Chat \"{0}\" not found.")]
    ChatNotFound(String),
    #[error("No chat history to export.")]
    NothingToExport,
    #[error("Unsupported export format \"{0}\" (supported: txt, json, md, html).")]
    UnsupportedFormat(String),
    #[error("Please select a provider first.")]
    NoProvider,
    #[error("API key cannot be empty.")]
    EmptyApiKey,
    #[error("Temperature must be a number between 0.0 and 2.0.")]
    InvalidTemperature,
}
