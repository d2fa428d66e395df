use clap::Parser;
use std::path::PathBuf;

use crate::llm::backend::DEFAULT_BACKEND_URL;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the chat backend API (completions, providers, key registration)
    #[arg(long, env = "OMNICHAT_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Timeout in seconds for a single backend request. 0 disables the timeout.
    #[arg(long, env = "OMNICHAT_REQUEST_TIMEOUT_SECS", default_value = "120")]
    pub request_timeout_secs: u64,

    /// Do not ask the model to format its reply as Markdown.
    #[arg(long, env = "OMNICHAT_NO_MARKDOWN_HINT", default_value = "false")]
    pub no_markdown_hint: bool,

    // --- Storage Args ---
    /// Directory holding default settings, saved chats and exports
    #[arg(long, env = "OMNICHAT_DATA_DIR", default_value = ".omnichat")]
    pub data_dir: PathBuf,

    /// Saved chat store type (file, memory)
    #[arg(long, env = "OMNICHAT_STORE_TYPE", default_value = "file")]
    pub store_type: String,

    // --- Selection Args ---
    /// Provider to start with, overriding saved defaults (e.g., groq, openai)
    #[arg(long, env = "OMNICHAT_PROVIDER")]
    pub provider: Option<String>,

    /// Model to start with, overriding saved defaults (e.g., llama-3.1-8b-instant)
    #[arg(long, env = "OMNICHAT_MODEL")]
    pub model: Option<String>,

    /// Persona preset passed through to the backend (Default, Technical, Friendly)
    #[arg(long, env = "OMNICHAT_PERSONA")]
    pub persona: Option<String>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}
