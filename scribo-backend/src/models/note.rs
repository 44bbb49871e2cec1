use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-authored note. `content` is HTML produced by the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A note sitting in the recycle bin
#[derive(Debug, Clone, Serialize)]
pub struct TrashedNote {
    #[serde(flatten)]
    pub note: Note,
    /// Whole days left before the purge worker removes it
    pub days_remaining: i64,
}

/// Validated fields for a note insert
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
}

/// Validated partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Sort order for note listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSort {
    #[default]
    Updated,
    Created,
    Title,
}

impl NoteSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteSort::Updated => "updated",
            NoteSort::Created => "created",
            NoteSort::Title => "title",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "updated" | "updated_at" => Some(NoteSort::Updated),
            "created" | "created_at" => Some(NoteSort::Created),
            "title" => Some(NoteSort::Title),
            _ => None,
        }
    }

    /// ORDER BY clause for the notes table
    pub fn order_by(&self) -> &'static str {
        match self {
            NoteSort::Updated => "updated_at DESC, pk DESC",
            NoteSort::Created => "created_at DESC, pk DESC",
            NoteSort::Title => "title COLLATE NOCASE ASC, pk ASC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub tag: Option<String>,
    pub q: Option<String>,
    pub archived: Option<bool>,
    pub sort: Option<String>,
}

/// Filters applied to an active-notes listing
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub archived: bool,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort: NoteSort,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A tag with its usage count and palette color
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
    pub color: String,
}
