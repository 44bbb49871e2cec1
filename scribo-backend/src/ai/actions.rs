//! Prompt construction and output handling for each AI action

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::notes::html::to_plain_text;
use crate::validation::{TAG_MAX_CHARS, normalize_tag};

/// Longest plain-text input forwarded to the provider
pub const MAX_INPUT_CHARS: usize = 10_000;
/// Tag suggestions returned per request
pub const MAX_SUGGESTED_TAGS: usize = 5;

static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    fn instruction(&self) -> &'static str {
        match self {
            SummaryLength::Short => "in one or two sentences",
            SummaryLength::Medium => "in a short paragraph",
            SummaryLength::Long => "in several paragraphs covering every key point",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    Professional,
    Friendly,
    Confident,
    Empathetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Grammar,
    Summarize(SummaryLength),
    Tags,
    Tone(Tone),
    Generate,
}

impl AiAction {
    pub fn name(&self) -> &'static str {
        match self {
            AiAction::Grammar => "grammar",
            AiAction::Summarize(_) => "summarize",
            AiAction::Tags => "tags",
            AiAction::Tone(_) => "tone",
            AiAction::Generate => "generate",
        }
    }

    pub fn system_prompt(&self) -> String {
        match self {
            AiAction::Grammar => "You are a careful copy editor. Fix spelling, grammar and punctuation \
                in the user's text without changing its meaning or voice. \
                Reply with the corrected text only."
                .to_string(),
            AiAction::Summarize(length) => format!(
                "Summarize the user's text {}. Reply with the summary only.",
                length.instruction()
            ),
            AiAction::Tags => format!(
                "Suggest up to {} short topical tags for the user's text. \
                 Reply with a comma-separated list of lowercase tags and nothing else.",
                MAX_SUGGESTED_TAGS
            ),
            AiAction::Tone(tone) => format!(
                "Rewrite the user's text in a {} tone, keeping its meaning. \
                 Reply with the rewritten text only.",
                tone.as_ref()
            ),
            AiAction::Generate => "You are a writing assistant for a note-taking app. \
                Write the content the user asks for as plain text without markdown or HTML."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    Empty,
    TooLong,
}

/// Reduce input HTML to plain text and enforce the size bounds
pub fn prepare_input(raw: &str) -> Result<String, InputError> {
    let text = to_plain_text(raw);
    if text.is_empty() {
        return Err(InputError::Empty);
    }
    if text.chars().count() > MAX_INPUT_CHARS {
        return Err(InputError::TooLong);
    }
    Ok(text)
}

/// Turn a model reply into normalized, de-duplicated tags
pub fn parse_tag_suggestions(output: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in output.split([',', '\n']) {
        let unlisted = LIST_MARKER_RE.replace(raw, "");
        let cleaned = unlisted
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.'));
        let Some(tag) = normalize_tag(cleaned) else {
            continue;
        };
        if tag.chars().count() > TAG_MAX_CHARS || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_SUGGESTED_TAGS {
            break;
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_suggestions() {
        assert_eq!(
            parse_tag_suggestions("Rust, #Systems, rust,  \"async\""),
            vec!["rust", "systems", "async"]
        );
        assert_eq!(
            parse_tag_suggestions("1. travel\n2. food\n- budget"),
            vec!["travel", "food", "budget"]
        );
        assert_eq!(parse_tag_suggestions("3d-printing"), vec!["3d-printing"]);
    }

    #[test]
    fn test_tag_suggestions_capped() {
        let tags = parse_tag_suggestions("a, b, c, d, e, f, g");
        assert_eq!(tags.len(), MAX_SUGGESTED_TAGS);
        assert!(parse_tag_suggestions(&"x".repeat(TAG_MAX_CHARS + 1)).is_empty());
    }

    #[test]
    fn test_prepare_input_bounds() {
        assert_eq!(prepare_input("<p>hi</p>").unwrap(), "hi");
        assert_eq!(prepare_input("<p>  </p>"), Err(InputError::Empty));
        assert_eq!(
            prepare_input(&"a".repeat(MAX_INPUT_CHARS + 1)),
            Err(InputError::TooLong)
        );
        // Markup does not count toward the limit
        let wrapped = format!("<p>{}</p>", "a".repeat(MAX_INPUT_CHARS));
        assert!(prepare_input(&wrapped).is_ok());
    }

    #[test]
    fn test_prompts_mention_options() {
        assert!(AiAction::Tone(Tone::Empathetic).system_prompt().contains("empathetic"));
        assert!(AiAction::Summarize(SummaryLength::Short)
            .system_prompt()
            .contains("one or two sentences"));
        assert_eq!(AiAction::Generate.name(), "generate");
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("formal".parse::<Tone>().unwrap(), Tone::Formal);
        assert!("angry".parse::<Tone>().is_err());
        let len: SummaryLength = serde_json::from_str("\"long\"").unwrap();
        assert_eq!(len, SummaryLength::Long);
    }
}
