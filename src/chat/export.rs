use chrono::Local;
use std::str::FromStr;

use super::advisory::Advisory;
use super::view;
use crate::models::chat::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Json,
    Markdown,
    Html,
}

impl FromStr for ExportFormat {
    type Err = Advisory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            _ => Err(Advisory::UnsupportedFormat(s.trim().to_string())),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain",
            ExportFormat::Json => "application/json",
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Html => "text/html",
        }
    }
}

/// A ready-to-write export: the caller decides where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

pub fn export(
    conversation: &[Message],
    format: ExportFormat
) -> Result<ExportArtifact, serde_json::Error> {
    let contents = match format {
        ExportFormat::Txt => to_txt(conversation),
        ExportFormat::Json => serde_json::to_string_pretty(conversation)?,
        ExportFormat::Markdown => to_markdown(conversation),
        ExportFormat::Html => view::render_transcript(conversation),
    };
    Ok(ExportArtifact {
        file_name: format!(
            "chat-export-{}.{}",
            Local::now().format("%Y%m%d-%H%M%S"),
            format.extension()
        ),
        mime_type: format.mime_type(),
        contents,
    })
}

fn to_txt(conversation: &[Message]) -> String {
    conversation
        .iter()
        .map(|msg| format!("{}: {}", msg.sender, msg.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_markdown(conversation: &[Message]) -> String {
    let mut out = String::from("# Chat export\n");
    for msg in conversation {
        let retry = if msg.is_retry { " (retry)" } else { "" };
        out.push_str(&format!("\n### {}{} at {}\n\n{}\n", msg.sender, retry, msg.timestamp, msg.text));
    }
    out
}
