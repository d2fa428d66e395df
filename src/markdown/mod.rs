//! Markdown-to-HTML rendering for assistant replies.
//!
//! The dialect is the small subset LLMs tend to emit: ATX headings, flat
//! lists, blockquotes, fenced code, rules, emphasis, inline code, links and
//! images. Rendering escapes the whole input first, classifies the escaped
//! lines into [`block::Block`]s and then emits HTML, so no substitution ever
//! sees raw markup.

pub mod block;
pub mod inline;

use block::{ parse_blocks, Block };
use inline::{ escape_html, render_inline };

pub fn render(text: &str) -> String {
    let escaped = escape_html(text);
    parse_blocks(&escaped)
        .iter()
        .map(emit)
        .collect::<Vec<_>>()
        .join("\n")
}

fn emit(block: &Block) -> String {
    match block {
        Block::Heading { level, text } => {
            format!("<h{level}>{}</h{level}>", render_inline(text), level = level)
        }
        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let items: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", render_inline(item)))
                .collect();
            format!("<{tag}>{items}</{tag}>", tag = tag, items = items)
        }
        Block::Quote(lines) => {
            let body = lines
                .iter()
                .map(|line| render_inline(line))
                .collect::<Vec<_>>()
                .join("<br>");
            format!("<blockquote>{}</blockquote>", body)
        }
        Block::Code { lang: Some(lang), body } => {
            format!("<pre><code class=\"language-{}\">{}</code></pre>", lang, body)
        }
        Block::Code { lang: None, body } => format!("<pre><code>{}</code></pre>", body),
        Block::Rule => "<hr>".to_string(),
        Block::Paragraph(text) => format!("<p>{}</p>", render_inline(text)),
    }
}
