use lazy_static::lazy_static;
use regex::{ Captures, Regex };

lazy_static! {
    // Spans whose contents must not be touched by emphasis rules.
    static ref ATOMIC_SPAN: Regex = Regex::new(
        r"`(?P<code>[^`]+)`|!\[(?P<alt>[^\]]*)\]\((?P<src>[^)\s]*)\)|\[(?P<label>[^\]]*)\]\((?P<href>[^)\s]*)\)"
    ).expect("atomic span pattern is valid");
    static ref BOLD_STAR: Regex = Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is valid");
    static ref BOLD_UNDERSCORE: Regex = Regex::new(r"__([^_]+)__").expect("bold pattern is valid");
    static ref ITALIC_STAR: Regex = Regex::new(r"\*([^*]+)\*").expect("italic pattern is valid");
    static ref ITALIC_UNDERSCORE: Regex = Regex::new(r"_([^_]+)_").expect("italic pattern is valid");
}

const SAFE_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Escapes the characters that could open markup or break out of an attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Relative targets and http(s)/mailto are allowed; anything else with a scheme is not.
pub fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    let scheme_end = match url.find(':') {
        Some(idx) => idx,
        None => return true,
    };
    if url[..scheme_end].contains(|c| c == '/' || c == '?' || c == '#') {
        return true;
    }
    let scheme = url[..scheme_end].to_ascii_lowercase();
    SAFE_SCHEMES.contains(&scheme.as_str())
}

/// Applies inline rules to text that has already been escaped.
///
/// Code spans, images and links are carved out first so that emphasis markers
/// inside them (underscores in URLs, asterisks in code) survive untouched.
/// Link labels still get emphasis.
pub fn render_inline(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len() + 16);
    let mut last = 0;
    for caps in ATOMIC_SPAN.captures_iter(escaped) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        out.push_str(&emphasis(&escaped[last..whole.start()]));
        out.push_str(&atomic(&caps));
        last = whole.end();
    }
    out.push_str(&emphasis(&escaped[last..]));
    out
}

fn atomic(caps: &Captures<'_>) -> String {
    if let Some(code) = caps.name("code") {
        return format!("<code>{}</code>", code.as_str());
    }
    if let (Some(alt), Some(src)) = (caps.name("alt"), caps.name("src")) {
        if !is_safe_url(src.as_str()) {
            return alt.as_str().to_string();
        }
        return format!("<img src=\"{}\" alt=\"{}\" />", src.as_str(), alt.as_str());
    }
    if let (Some(label), Some(href)) = (caps.name("label"), caps.name("href")) {
        let label = emphasis(label.as_str());
        if !is_safe_url(href.as_str()) {
            return label;
        }
        return format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            href.as_str(),
            label
        );
    }
    String::new()
}

fn emphasis(text: &str) -> String {
    if !text.contains('*') && !text.contains('_') {
        return text.to_string();
    }
    let text = BOLD_STAR.replace_all(text, "<strong>$1</strong>");
    let text = BOLD_UNDERSCORE.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC_STAR.replace_all(&text, "<em>$1</em>");
    ITALIC_UNDERSCORE.replace_all(&text, "<em>$1</em>").into_owned()
}
