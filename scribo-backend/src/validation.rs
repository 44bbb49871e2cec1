//! Record validation for users and notes.
//!
//! Normalizing functions return the cleaned value so callers store exactly
//! what was validated.

use regex::Regex;
use std::sync::LazyLock;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 128;
pub const BIO_MAX_CHARS: usize = 500;
pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 100_000;
pub const MAX_TAGS_PER_NOTE: usize = 10;
pub const TAG_MAX_CHARS: usize = 30;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    let len = name.chars().count();
    if len < NAME_MIN_CHARS || len > NAME_MAX_CHARS {
        return Err(ValidationError::new(
            "name",
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        ));
    }
    Ok(name.to_string())
}

/// Emails are compared and stored lowercase
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(&email) {
        return Err(ValidationError::new("email", "Please provide a valid email address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_CHARS || len > PASSWORD_MAX_CHARS {
        return Err(ValidationError::new(
            "password",
            format!(
                "Password must be between {} and {} characters",
                PASSWORD_MIN_CHARS, PASSWORD_MAX_CHARS
            ),
        ));
    }

    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(ValidationError::new(
            "password",
            "Password must contain an uppercase letter, a lowercase letter, a number and a special character",
        ));
    }
    Ok(())
}

/// Empty bios are stored as NULL
pub fn validate_bio(bio: &str) -> Result<Option<String>, ValidationError> {
    let bio = bio.trim();
    if bio.chars().count() > BIO_MAX_CHARS {
        return Err(ValidationError::new(
            "bio",
            format!("Bio cannot exceed {} characters", BIO_MAX_CHARS),
        ));
    }
    Ok(if bio.is_empty() { None } else { Some(bio.to_string()) })
}

pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::new("title", "Title is required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::new(
            "title",
            format!("Title cannot exceed {} characters", TITLE_MAX_CHARS),
        ));
    }
    Ok(title.to_string())
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.chars().count() > CONTENT_MAX_CHARS {
        return Err(ValidationError::new(
            "content",
            format!("Content cannot exceed {} characters", CONTENT_MAX_CHARS),
        ));
    }
    Ok(())
}

/// Trim, lowercase and strip a leading '#'. Returns None for blank tags.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().trim_start_matches('#').trim().to_lowercase();
    if tag.is_empty() { None } else { Some(tag) }
}

/// Normalize a tag list: blanks dropped, duplicates removed keeping the first occurrence.
pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for raw in tags {
        let Some(tag) = normalize_tag(raw) else {
            continue;
        };
        if tag.chars().count() > TAG_MAX_CHARS {
            return Err(ValidationError::new(
                "tags",
                format!("Tags cannot exceed {} characters", TAG_MAX_CHARS),
            ));
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }

    if out.len() > MAX_TAGS_PER_NOTE {
        return Err(ValidationError::new(
            "tags",
            format!("A note can have at most {} tags", MAX_TAGS_PER_NOTE),
        ));
    }
    Ok(out)
}
