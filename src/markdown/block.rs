//! Line classification and block grouping.
//!
//! Input is text that has already been HTML-escaped, so a blockquote marker
//! arrives as `&gt;`.

const QUOTE_MARKER: &str = "&gt;";
const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    List { ordered: bool, items: Vec<String> },
    Quote(Vec<String>),
    Code { lang: Option<String>, body: String },
    Rule,
    Paragraph(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Fence(Option<&'a str>),
    Heading(u8, &'a str),
    Item { ordered: bool, text: &'a str },
    Quote(&'a str),
    Rule,
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }
    if let Some(rest) = line.strip_prefix(FENCE) {
        let lang = rest.split_whitespace().next();
        return Line::Fence(lang);
    }
    if matches!(line.trim_end(), "---" | "***") {
        return Line::Rule;
    }
    if let Some(heading) = heading(line) {
        return heading;
    }
    if let Some(rest) = line.strip_prefix(QUOTE_MARKER) {
        if rest.is_empty() {
            return Line::Quote("");
        }
        if let Some(text) = rest.strip_prefix(' ') {
            return Line::Quote(text);
        }
    }
    let item = line.trim_start();
    if let Some(text) = item.strip_prefix("- ").or_else(|| item.strip_prefix("* ")) {
        return Line::Item { ordered: false, text };
    }
    if let Some(text) = ordered_item(item) {
        return Line::Item { ordered: true, text };
    }
    Line::Text(line)
}

fn heading(line: &str) -> Option<Line<'_>> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(|text| Line::Heading(level as u8, text))
}

fn ordered_item(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

/// Groups escaped input into blocks. Every non-blank text line becomes its own
/// paragraph; list items of the same kind that follow each other share a list;
/// adjacent quote lines share a quote. An unterminated fence runs to the end.
pub fn parse_blocks(escaped: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut lines = escaped.lines();

    while let Some(raw) = lines.next() {
        match classify(raw) {
            Line::Blank => {}
            Line::Fence(lang) => {
                let mut body: Vec<&str> = Vec::new();
                for inner in lines.by_ref() {
                    if inner.trim_end() == FENCE {
                        break;
                    }
                    body.push(inner);
                }
                blocks.push(Block::Code {
                    lang: lang.map(str::to_string),
                    body: body.join("\n"),
                });
            }
            Line::Heading(level, text) => {
                blocks.push(Block::Heading { level, text: text.to_string() });
            }
            Line::Item { ordered, text } => {
                match blocks.last_mut() {
                    Some(Block::List { ordered: prev, items }) if *prev == ordered => {
                        items.push(text.to_string());
                    }
                    _ => blocks.push(Block::List { ordered, items: vec![text.to_string()] }),
                }
            }
            Line::Quote(text) => {
                match blocks.last_mut() {
                    Some(Block::Quote(quoted)) => quoted.push(text.to_string()),
                    _ => blocks.push(Block::Quote(vec![text.to_string()])),
                }
            }
            Line::Rule => blocks.push(Block::Rule),
            Line::Text(text) => blocks.push(Block::Paragraph(text.to_string())),
        }
    }
    blocks
}
