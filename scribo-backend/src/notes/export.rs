//! Note export (JSON or a single markdown document) and import validation

use serde::{Deserialize, Serialize};

use super::html::to_plain_text;
use crate::models::{NewNote, Note};
use crate::validation::{ValidationError, validate_content, validate_tags, validate_title};

/// Largest batch accepted by a single import
pub const MAX_IMPORT_ITEMS: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, strum::EnumString, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    #[default]
    Json,
    #[strum(serialize = "markdown", serialize = "md")]
    Markdown,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "scribo-notes.json",
            ExportFormat::Markdown => "scribo-notes.md",
        }
    }
}

/// One note as accepted by import
#[derive(Debug, Clone, Deserialize)]
pub struct ImportNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
}

/// Render notes as one markdown document, notes separated by `---`
pub fn to_markdown(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|note| {
            let mut section = format!("# {}\n", note.title);
            if !note.tags.is_empty() {
                let tags: Vec<String> = note.tags.iter().map(|t| format!("#{}", t)).collect();
                section.push_str(&format!("\nTags: {}\n", tags.join(" ")));
            }
            let body = to_plain_text(&note.content);
            if !body.is_empty() {
                section.push('\n');
                section.push_str(&body);
                section.push('\n');
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

/// Validate a whole import batch up front. Errors name the offending item.
pub fn validate_import(items: Vec<ImportNote>) -> Result<Vec<NewNote>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::new("notes", "Nothing to import"));
    }
    if items.len() > MAX_IMPORT_ITEMS {
        return Err(ValidationError::new(
            "notes",
            format!("At most {} notes can be imported at once", MAX_IMPORT_ITEMS),
        ));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let at = |e: ValidationError| {
                ValidationError::new(
                    format!("notes[{}].{}", idx, e.field),
                    format!("Note {}: {}", idx + 1, e.message),
                )
            };
            validate_content(&item.content).map_err(at)?;
            Ok(NewNote {
                title: validate_title(&item.title).map_err(at)?,
                tags: validate_tags(&item.tags).map_err(at)?,
                content: item.content,
                is_archived: item.is_archived,
            })
        })
        .collect()
}
