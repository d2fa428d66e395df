use crate::markdown::{ self, inline::escape_html };
use crate::models::chat::{ Message, Sender };

/// Body HTML for one message: assistant text is Markdown, everything else is
/// shown verbatim.
pub fn render_body(message: &Message) -> String {
    match message.sender {
        Sender::Assistant => markdown::render(&message.text),
        Sender::User | Sender::System => format!("<p>{}</p>", escape_html(&message.text)),
    }
}

pub fn render_message(message: &Message) -> String {
    let mut classes = format!("message {}", message.sender);
    if message.is_retry {
        classes.push_str(" retry");
    }
    if message.is_retry_response {
        classes.push_str(" retry-response");
    }
    let body = match message.sender {
        Sender::Assistant => format!("<div class=\"markdown-content\">{}</div>", render_body(message)),
        _ => render_body(message),
    };
    format!(
        "<div class=\"{}\" data-id=\"{}\"><div class=\"message-content\">{}<span class=\"timestamp\">{}</span></div></div>",
        classes,
        escape_html(&message.id),
        body,
        escape_html(&message.timestamp)
    )
}

pub fn render_transcript(conversation: &[Message]) -> String {
    let messages = if conversation.is_empty() {
        "<p class=\"empty\">No messages yet.</p>".to_string()
    } else {
        conversation.iter().map(render_message).collect::<Vec<_>>().join("\n")
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Chat export</title>\n</head>\n<body>\n<div class=\"chat-messages\">\n{}\n</div>\n</body>\n</html>\n",
        messages
    )
}
