//! Reduce editor HTML to plain text for AI prompts and markdown export

use regex::Regex;
use std::sync::LazyLock;

static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br\s*/?|/p|/div|/h[1-6]|/li|/blockquote|/pre|/tr)\s*>").unwrap()
});
static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<\s*li\b[^>]*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Strip markup, keeping block boundaries as line breaks
pub fn to_plain_text(html: &str) -> String {
    let text = BLOCK_END_RE.replace_all(html, "\n");
    let text = LIST_ITEM_RE.replace_all(&text, "- ");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    BLANK_RUN_RE
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_become_lines() {
        assert_eq!(
            to_plain_text("<p>Hello <strong>world</strong></p><p>Second</p>"),
            "Hello world\nSecond"
        );
    }

    #[test]
    fn test_lists_and_breaks() {
        assert_eq!(
            to_plain_text("<ul><li>one</li><li>two</li></ul>line<br/>next"),
            "- one\n- two\nline\nnext"
        );
    }

    #[test]
    fn test_entities_and_blank_runs() {
        assert_eq!(
            to_plain_text("<p>a &amp; b &lt;tag&gt;</p><p></p><p></p><p></p><p>end</p>"),
            "a & b <tag>\n\nend"
        );
        assert_eq!(to_plain_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_plain_input_passes_through() {
        assert_eq!(to_plain_text("  just text  "), "just text");
        assert_eq!(to_plain_text("<p> </p>"), "");
    }
}
