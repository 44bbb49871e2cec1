//! Note and recycle-bin database operations
//!
//! Every query is scoped by `user_id`; a note owned by someone else behaves
//! exactly like a missing one.

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter};
use uuid::Uuid;

use super::super::sqlite::{DbResult, parse_ts, ts};
use super::super::Database;
use crate::models::{NewNote, Note, NoteChanges, NoteFilter, NoteStats, Pagination};
use crate::notes::html::to_plain_text;

const NOTE_COLUMNS: &str = "id, user_id, title, content, tags, is_pinned, is_archived, is_deleted, \
                            deleted_at, created_at, updated_at";

/// Outcome of a pin request
#[derive(Debug)]
pub enum PinResult {
    Updated(Note),
    NotFound,
    Archived,
    LimitReached,
}

fn map_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags: String = row.get(4)?;
    let deleted_at: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        is_pinned: row.get(5)?,
        is_archived: row.get(6)?,
        is_deleted: row.get(7)?,
        deleted_at: deleted_at.as_deref().map(|s| parse_ts(8, s)).transpose()?,
        created_at: parse_ts(9, &created_at)?,
        updated_at: parse_ts(10, &updated_at)?,
    })
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Build an FTS5 MATCH expression from free text.
///
/// Each word becomes a quoted prefix term, so user input can never inject
/// FTS5 operators. Words without any alphanumeric character are dropped.
pub fn fts5_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// WHERE clause + positional values for an active-notes listing
fn active_filter_clause(user_id: &str, filter: &NoteFilter) -> (String, Vec<Value>) {
    let mut clauses = vec![
        "user_id = ?".to_string(),
        "is_deleted = 0".to_string(),
        "is_archived = ?".to_string(),
    ];
    let mut values = vec![
        Value::Text(user_id.to_string()),
        Value::Integer(filter.archived as i64),
    ];

    if let Some(tag) = &filter.tag {
        clauses.push(
            "EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?)".to_string(),
        );
        values.push(Value::Text(tag.clone()));
    }

    if let Some(expr) = filter.search.as_deref().and_then(fts5_match_expression) {
        clauses.push("pk IN (SELECT rowid FROM notes_fts WHERE notes_fts MATCH ?)".to_string());
        values.push(Value::Text(expr));
    }

    (clauses.join(" AND "), values)
}

fn query_notes(conn: &Connection, sql: &str, values: &[Value]) -> DbResult<Vec<Note>> {
    let mut stmt = conn.prepare(sql)?;
    let notes = stmt
        .query_map(params_from_iter(values.iter()), map_note)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

fn count_rows(conn: &Connection, where_clause: &str, values: &[Value]) -> DbResult<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM notes WHERE {}", where_clause),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

fn fetch_note(conn: &Connection, user_id: &str, id: &str) -> rusqlite::Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {} FROM notes WHERE id = ?1 AND user_id = ?2", NOTE_COLUMNS),
        params![id, user_id],
        map_note,
    )
    .optional()
}

fn insert_note_row(
    conn: &Connection,
    user_id: &str,
    new: &NewNote,
    now: &DateTime<Utc>,
) -> rusqlite::Result<Note> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notes (id, user_id, title, content, content_text, tags, is_archived, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            user_id,
            new.title,
            new.content,
            to_plain_text(&new.content),
            encode_tags(&new.tags),
            new.is_archived,
            ts(now),
        ],
    )?;

    Ok(Note {
        id,
        user_id: user_id.to_string(),
        title: new.title.clone(),
        content: new.content.clone(),
        tags: new.tags.clone(),
        is_pinned: false,
        is_archived: new.is_archived,
        is_deleted: false,
        deleted_at: None,
        created_at: *now,
        updated_at: *now,
    })
}

impl Database {
    pub fn insert_note(&self, user_id: &str, new: &NewNote) -> DbResult<Note> {
        let conn = self.conn()?;
        Ok(insert_note_row(&conn, user_id, new, &Utc::now())?)
    }

    /// Insert a batch atomically (used by import)
    pub fn insert_notes(&self, user_id: &str, notes: &[NewNote]) -> DbResult<usize> {
        let mut conn = self.conn()?;
        let now = Utc::now();
        let tx = conn.transaction()?;
        for new in notes {
            insert_note_row(&tx, user_id, new, &now)?;
        }
        tx.commit()?;
        Ok(notes.len())
    }

    /// Fetch a note in any state (active, archived or trashed)
    pub fn get_note(&self, user_id: &str, id: &str) -> DbResult<Option<Note>> {
        let conn = self.conn()?;
        Ok(fetch_note(&conn, user_id, id)?)
    }

    /// Page through non-deleted notes matching `filter`
    pub fn list_notes(
        &self,
        user_id: &str,
        filter: &NoteFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> DbResult<(Vec<Note>, Pagination)> {
        let conn = self.conn()?;
        let (where_clause, mut values) = active_filter_clause(user_id, filter);

        let total = count_rows(&conn, &where_clause, &values)?;
        let pagination = Pagination::resolve(page, limit, total);

        values.push(Value::Integer(pagination.limit as i64));
        values.push(Value::Integer(pagination.offset() as i64));
        let sql = format!(
            "SELECT {} FROM notes WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            NOTE_COLUMNS,
            where_clause,
            filter.sort.order_by()
        );

        Ok((query_notes(&conn, &sql, &values)?, pagination))
    }

    /// Pinned notes shown in the always-visible section
    pub fn list_pinned_notes(&self, user_id: &str) -> DbResult<Vec<Note>> {
        let conn = self.conn()?;
        query_notes(
            &conn,
            &format!(
                "SELECT {} FROM notes
                 WHERE user_id = ? AND is_deleted = 0 AND is_archived = 0 AND is_pinned = 1
                 ORDER BY updated_at DESC, pk DESC",
                NOTE_COLUMNS
            ),
            &[Value::Text(user_id.to_string())],
        )
    }

    /// Apply a partial update to an active note
    pub fn update_note(&self, user_id: &str, id: &str, changes: &NoteChanges) -> DbResult<Option<Note>> {
        let conn = self.conn()?;

        let mut sets = vec!["updated_at = ?".to_string()];
        let mut values = vec![Value::Text(ts(&Utc::now()))];
        if let Some(title) = &changes.title {
            sets.push("title = ?".to_string());
            values.push(Value::Text(title.clone()));
        }
        if let Some(content) = &changes.content {
            sets.push("content = ?".to_string());
            values.push(Value::Text(content.clone()));
            sets.push("content_text = ?".to_string());
            values.push(Value::Text(to_plain_text(content)));
        }
        if let Some(tags) = &changes.tags {
            sets.push("tags = ?".to_string());
            values.push(Value::Text(encode_tags(tags)));
        }
        values.push(Value::Text(id.to_string()));
        values.push(Value::Text(user_id.to_string()));

        let rows = conn.execute(
            &format!(
                "UPDATE notes SET {} WHERE id = ? AND user_id = ? AND is_deleted = 0",
                sets.join(", ")
            ),
            params_from_iter(values.iter()),
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Ok(fetch_note(&conn, user_id, id)?)
    }

    /// Pin or unpin an active note, enforcing the per-user pin cap
    pub fn set_note_pinned(
        &self,
        user_id: &str,
        id: &str,
        pinned: bool,
        max_pinned: usize,
    ) -> DbResult<PinResult> {
        let mut conn = self.conn()?;
        // Take the write lock up front so concurrent pins queue on busy_timeout
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let note = match fetch_note(&tx, user_id, id)? {
            Some(note) if !note.is_deleted => note,
            _ => return Ok(PinResult::NotFound),
        };

        if pinned && !note.is_pinned {
            if note.is_archived {
                return Ok(PinResult::Archived);
            }
            let pinned_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM notes WHERE user_id = ?1 AND is_deleted = 0 AND is_pinned = 1",
                params![user_id],
                |row| row.get(0),
            )?;
            if pinned_count as usize >= max_pinned {
                return Ok(PinResult::LimitReached);
            }
        }

        tx.execute(
            "UPDATE notes SET is_pinned = ?1 WHERE id = ?2 AND user_id = ?3",
            params![pinned, id, user_id],
        )?;
        let updated = fetch_note(&tx, user_id, id)?;
        tx.commit()?;

        Ok(updated.map(PinResult::Updated).unwrap_or(PinResult::NotFound))
    }

    /// Archive (which also unpins) or unarchive an active note
    pub fn set_note_archived(&self, user_id: &str, id: &str, archived: bool) -> DbResult<Option<Note>> {
        let conn = self.conn()?;
        let rows = if archived {
            conn.execute(
                "UPDATE notes SET is_archived = 1, is_pinned = 0
                 WHERE id = ?1 AND user_id = ?2 AND is_deleted = 0",
                params![id, user_id],
            )?
        } else {
            conn.execute(
                "UPDATE notes SET is_archived = 0 WHERE id = ?1 AND user_id = ?2 AND is_deleted = 0",
                params![id, user_id],
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        Ok(fetch_note(&conn, user_id, id)?)
    }

    /// Move an active note to the recycle bin
    pub fn soft_delete_note(&self, user_id: &str, id: &str) -> DbResult<Option<Note>> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE notes SET is_deleted = 1, is_pinned = 0, deleted_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND is_deleted = 0",
            params![ts(&Utc::now()), id, user_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Ok(fetch_note(&conn, user_id, id)?)
    }

    /// Page through the recycle bin, most recently deleted first
    pub fn list_trash(
        &self,
        user_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> DbResult<(Vec<Note>, Pagination)> {
        let conn = self.conn()?;
        let where_clause = "user_id = ? AND is_deleted = 1";
        let mut values = vec![Value::Text(user_id.to_string())];

        let total = count_rows(&conn, where_clause, &values)?;
        let pagination = Pagination::resolve(page, limit, total);

        values.push(Value::Integer(pagination.limit as i64));
        values.push(Value::Integer(pagination.offset() as i64));
        let sql = format!(
            "SELECT {} FROM notes WHERE {} ORDER BY deleted_at DESC, pk DESC LIMIT ? OFFSET ?",
            NOTE_COLUMNS, where_clause
        );

        Ok((query_notes(&conn, &sql, &values)?, pagination))
    }

    /// Bring a trashed note back
    pub fn restore_note(&self, user_id: &str, id: &str) -> DbResult<Option<Note>> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE notes SET is_deleted = 0, deleted_at = NULL
             WHERE id = ?1 AND user_id = ?2 AND is_deleted = 1",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Ok(fetch_note(&conn, user_id, id)?)
    }

    /// Permanently delete a note that is already in the recycle bin
    pub fn delete_note_permanently(&self, user_id: &str, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2 AND is_deleted = 1",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn empty_trash(&self, user_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM notes WHERE user_id = ?1 AND is_deleted = 1",
            params![user_id],
        )?;
        Ok(rows)
    }

    /// Remove every trashed note deleted at or before `cutoff`, across all users
    pub fn purge_deleted_before(&self, cutoff: &DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM notes WHERE is_deleted = 1 AND deleted_at <= ?1",
            params![ts(cutoff)],
        )?;
        Ok(rows)
    }

    /// Distinct tags on non-deleted notes with usage counts, most used first
    pub fn list_tags(&self, user_id: &str) -> DbResult<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT j.value, COUNT(*) AS uses
             FROM notes, json_each(notes.tags) AS j
             WHERE notes.user_id = ?1 AND notes.is_deleted = 0
             GROUP BY j.value
             ORDER BY uses DESC, j.value ASC",
        )?;
        let tags = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    pub fn note_stats(&self, user_id: &str) -> DbResult<NoteStats> {
        let conn = self.conn()?;
        let mut stats = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN is_deleted = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND is_archived = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND is_pinned = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND is_archived = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_deleted = 1 THEN 1 ELSE 0 END), 0)
             FROM notes WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(NoteStats {
                    total: row.get(0)?,
                    active: row.get(1)?,
                    pinned: row.get(2)?,
                    archived: row.get(3)?,
                    trashed: row.get(4)?,
                    tags: 0,
                })
            },
        )?;

        stats.tags = conn.query_row(
            "SELECT COUNT(DISTINCT j.value)
             FROM notes, json_each(notes.tags) AS j
             WHERE notes.user_id = ?1 AND notes.is_deleted = 0",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(stats)
    }

    /// All non-deleted notes, oldest first (used by export)
    pub fn export_notes(&self, user_id: &str) -> DbResult<Vec<Note>> {
        let conn = self.conn()?;
        query_notes(
            &conn,
            &format!(
                "SELECT {} FROM notes WHERE user_id = ? AND is_deleted = 0 ORDER BY created_at ASC, pk ASC",
                NOTE_COLUMNS
            ),
            &[Value::Text(user_id.to_string())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteSort;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Database, String) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("Ada", "ada@example.com", "hash").unwrap();
        (dir, db, user.id)
    }

    fn new_note(title: &str, content: &str, tags: &[&str]) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_archived: false,
        }
    }

    #[test]
    fn test_fts5_match_expression() {
        assert_eq!(
            fts5_match_expression("rust notes").as_deref(),
            Some("\"rust\"* \"notes\"*")
        );
        assert_eq!(
            fts5_match_expression("say \"hi\"").as_deref(),
            Some("\"say\"* \"\"\"hi\"\"\"*")
        );
        assert_eq!(fts5_match_expression("  -- ** "), None);
        assert_eq!(fts5_match_expression(""), None);
    }

    #[test]
    fn test_insert_and_get_note() {
        let (_dir, db, user_id) = setup();
        let note = db
            .insert_note(&user_id, &new_note("Groceries", "<p>milk</p>", &["home"]))
            .unwrap();

        let fetched = db.get_note(&user_id, &note.id).unwrap().expect("note exists");
        assert_eq!(fetched.title, "Groceries");
        assert_eq!(fetched.tags, vec!["home"]);
        assert!(!fetched.is_deleted);

        assert!(db.get_note("someone-else", &note.id).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_tag_search_and_archive() {
        let (_dir, db, user_id) = setup();
        db.insert_note(&user_id, &new_note("Rust ownership", "<p>borrowing rules</p>", &["rust"]))
            .unwrap();
        db.insert_note(&user_id, &new_note("Dinner", "<p>pasta recipe</p>", &["food"]))
            .unwrap();
        let archived = db
            .insert_note(&user_id, &new_note("Old rust", "<p>legacy</p>", &["rust"]))
            .unwrap();
        db.set_note_archived(&user_id, &archived.id, true).unwrap();

        let by_tag = NoteFilter {
            tag: Some("rust".to_string()),
            ..Default::default()
        };
        let (notes, page) = db.list_notes(&user_id, &by_tag, None, None).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(notes[0].title, "Rust ownership");

        let search = NoteFilter {
            search: Some("borrow".to_string()),
            ..Default::default()
        };
        let (notes, _) = db.list_notes(&user_id, &search, None, None).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Rust ownership");

        let archived_filter = NoteFilter {
            archived: true,
            ..Default::default()
        };
        let (notes, _) = db.list_notes(&user_id, &archived_filter, None, None).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, archived.id);
    }

    #[test]
    fn test_search_follows_updates() {
        let (_dir, db, user_id) = setup();
        let note = db
            .insert_note(&user_id, &new_note("Draft", "<p>alpha</p>", &[]))
            .unwrap();

        let changes = NoteChanges {
            content: Some("<p>omega</p>".to_string()),
            ..Default::default()
        };
        db.update_note(&user_id, &note.id, &changes).unwrap().unwrap();

        let search = |q: &str| NoteFilter {
            search: Some(q.to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_notes(&user_id, &search("alpha"), None, None).unwrap().1.total, 0);
        assert_eq!(db.list_notes(&user_id, &search("omega"), None, None).unwrap().1.total, 1);
    }

    #[test]
    fn test_search_ignores_markup() {
        let (_dir, db, user_id) = setup();
        db.insert_note(
            &user_id,
            &new_note("Shopping", "<p><strong>milk</strong> and <span>eggs</span></p>", &[]),
        )
        .unwrap();

        let search = |q: &str| NoteFilter {
            search: Some(q.to_string()),
            ..Default::default()
        };
        for markup in ["strong", "span", "p"] {
            assert_eq!(
                db.list_notes(&user_id, &search(markup), None, None).unwrap().1.total,
                0,
                "markup word {:?} should not match",
                markup
            );
        }
        assert_eq!(db.list_notes(&user_id, &search("milk eggs"), None, None).unwrap().1.total, 1);
    }

    #[test]
    fn test_concurrent_pins_never_fail_or_exceed_cap() {
        let dir = tempdir().unwrap();
        let db = std::sync::Arc::new(
            Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap(),
        );
        let user_id = db.create_user("Ada", "ada@example.com", "hash").unwrap().id;
        let ids: Vec<String> = (0..8)
            .map(|i| db.insert_note(&user_id, &new_note(&format!("n{}", i), "", &[])).unwrap().id)
            .collect();

        for _round in 0..5 {
            let handles: Vec<_> = ids
                .iter()
                .cloned()
                .map(|id| {
                    let db = std::sync::Arc::clone(&db);
                    let user_id = user_id.clone();
                    std::thread::spawn(move || db.set_note_pinned(&user_id, &id, true, 3))
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().expect("pin should not hit a locked database");
            }
            assert_eq!(db.list_pinned_notes(&user_id).unwrap().len(), 3);

            for id in &ids {
                db.set_note_pinned(&user_id, id, false, 3).unwrap();
            }
        }
    }

    #[test]
    fn test_pagination_and_title_sort() {
        let (_dir, db, user_id) = setup();
        for title in ["charlie", "Alpha", "bravo", "delta", "echo"] {
            db.insert_note(&user_id, &new_note(title, "", &[])).unwrap();
        }

        let filter = NoteFilter {
            sort: NoteSort::Title,
            ..Default::default()
        };
        let (first, page) = db.list_notes(&user_id, &filter, Some(1), Some(2)).unwrap();
        assert_eq!(page.total_pages, 3);
        let titles: Vec<_> = first.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "bravo"]);

        let (last, page) = db.list_notes(&user_id, &filter, Some(99), Some(2)).unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].title, "echo");
    }

    #[test]
    fn test_pin_cap_and_archive_unpins() {
        let (_dir, db, user_id) = setup();
        let ids: Vec<String> = (0..3)
            .map(|i| db.insert_note(&user_id, &new_note(&format!("n{}", i), "", &[])).unwrap().id)
            .collect();

        assert!(matches!(
            db.set_note_pinned(&user_id, &ids[0], true, 2).unwrap(),
            PinResult::Updated(_)
        ));
        assert!(matches!(
            db.set_note_pinned(&user_id, &ids[1], true, 2).unwrap(),
            PinResult::Updated(_)
        ));
        assert!(matches!(
            db.set_note_pinned(&user_id, &ids[2], true, 2).unwrap(),
            PinResult::LimitReached
        ));
        // Re-pinning an already pinned note is not blocked by the cap
        assert!(matches!(
            db.set_note_pinned(&user_id, &ids[0], true, 2).unwrap(),
            PinResult::Updated(_)
        ));

        let archived = db.set_note_archived(&user_id, &ids[0], true).unwrap().unwrap();
        assert!(!archived.is_pinned);
        assert!(matches!(
            db.set_note_pinned(&user_id, &ids[0], true, 2).unwrap(),
            PinResult::Archived
        ));
        assert_eq!(db.list_pinned_notes(&user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_trash_lifecycle() {
        let (_dir, db, user_id) = setup();
        let note = db.insert_note(&user_id, &new_note("Temp", "", &[])).unwrap();
        db.set_note_pinned(&user_id, &note.id, true, 3).unwrap();

        let trashed = db.soft_delete_note(&user_id, &note.id).unwrap().unwrap();
        assert!(trashed.is_deleted);
        assert!(!trashed.is_pinned);
        assert!(trashed.deleted_at.is_some());

        // Deleted notes disappear from listings and cannot be edited or deleted twice
        let (active, _) = db.list_notes(&user_id, &NoteFilter::default(), None, None).unwrap();
        assert!(active.is_empty());
        assert!(db.soft_delete_note(&user_id, &note.id).unwrap().is_none());
        assert!(db
            .update_note(&user_id, &note.id, &NoteChanges { title: Some("x".into()), ..Default::default() })
            .unwrap()
            .is_none());

        let (bin, page) = db.list_trash(&user_id, None, None).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(bin[0].id, note.id);

        let restored = db.restore_note(&user_id, &note.id).unwrap().unwrap();
        assert!(!restored.is_deleted);
        assert!(restored.deleted_at.is_none());

        // Active notes cannot be permanently deleted
        assert!(!db.delete_note_permanently(&user_id, &note.id).unwrap());
        db.soft_delete_note(&user_id, &note.id).unwrap();
        assert!(db.delete_note_permanently(&user_id, &note.id).unwrap());
        assert!(db.get_note(&user_id, &note.id).unwrap().is_none());
    }

    #[test]
    fn test_purge_respects_cutoff() {
        let (_dir, db, user_id) = setup();
        let note = db.insert_note(&user_id, &new_note("Old", "", &[])).unwrap();
        db.soft_delete_note(&user_id, &note.id).unwrap();

        let long_ago = Utc::now() - chrono::Duration::days(1);
        assert_eq!(db.purge_deleted_before(&long_ago).unwrap(), 0);
        assert_eq!(db.purge_deleted_before(&Utc::now()).unwrap(), 1);
    }

    #[test]
    fn test_tags_and_stats() {
        let (_dir, db, user_id) = setup();
        db.insert_note(&user_id, &new_note("a", "", &["work", "ideas"])).unwrap();
        db.insert_note(&user_id, &new_note("b", "", &["work"])).unwrap();
        let gone = db.insert_note(&user_id, &new_note("c", "", &["trash-only"])).unwrap();
        db.soft_delete_note(&user_id, &gone.id).unwrap();

        let tags = db.list_tags(&user_id).unwrap();
        assert_eq!(tags, vec![("work".to_string(), 2), ("ideas".to_string(), 1)]);

        let stats = db.note_stats(&user_id).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.trashed, 1);
        assert_eq!(stats.tags, 2);
    }

    #[test]
    fn test_batch_insert_and_export_order() {
        let (_dir, db, user_id) = setup();
        let batch = vec![new_note("first", "", &[]), new_note("second", "", &["x"])];
        assert_eq!(db.insert_notes(&user_id, &batch).unwrap(), 2);

        let exported = db.export_notes(&user_id).unwrap();
        let titles: Vec<_> = exported.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn test_deleting_user_cascades_to_notes() {
        let (_dir, db, user_id) = setup();
        db.insert_note(&user_id, &new_note("mine", "", &[])).unwrap();
        db.delete_user(&user_id).unwrap();
        assert_eq!(db.export_notes(&user_id).unwrap().len(), 0);
    }
}
