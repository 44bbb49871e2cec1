//! Recycle-bin retention and the background purge worker

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::db::{Database, DbResult};

/// Days a trashed note is kept before it is purged
pub const RETENTION_DAYS: i64 = 30;

/// Whole days left before a note deleted at `deleted_at` is purged, floored at zero
pub fn days_remaining(deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (RETENTION_DAYS - (now - deleted_at).num_days()).max(0)
}

/// Trashed notes deleted at or before this instant are expired
pub fn cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

/// Rows removed by one purge pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub notes: usize,
    pub sessions: usize,
    pub tokens: usize,
}

/// Delete expired trash, lapsed sessions and stale one-time tokens
pub fn purge_expired(db: &Database, now: DateTime<Utc>) -> DbResult<PurgeReport> {
    Ok(PurgeReport {
        notes: db.purge_deleted_before(&cutoff(now))?,
        sessions: db.purge_expired_sessions()?,
        tokens: db.purge_expired_one_time_tokens()?,
    })
}

/// Run [`purge_expired`] immediately and then every `interval` until `cancel` fires.
/// Intervals shorter than one second are raised to one second.
pub fn spawn_purge_worker(
    db: Arc<Database>,
    interval: std::time::Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(std::time::Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("[TRASH] Purge worker stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let db = Arc::clone(&db);
                    match tokio::task::spawn_blocking(move || purge_expired(&db, Utc::now())).await {
                        Ok(Ok(report)) if report == PurgeReport::default() => {}
                        Ok(Ok(report)) => log::info!(
                            "[TRASH] Purged {} expired note(s), {} session(s), {} token(s)",
                            report.notes, report.sessions, report.tokens
                        ),
                        Ok(Err(e)) => log::error!("[TRASH] Purge failed: {}", e),
                        Err(e) => log::error!("[TRASH] Purge task panicked: {}", e),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewNote;
    use tempfile::tempdir;

    #[test]
    fn test_days_remaining() {
        let now = Utc::now();
        assert_eq!(days_remaining(now, now), 30);
        assert_eq!(days_remaining(now - Duration::hours(36), now), 29);
        assert_eq!(days_remaining(now - Duration::days(30), now), 0);
        assert_eq!(days_remaining(now - Duration::days(45), now), 0);
    }

    #[test]
    fn test_purge_expired_keeps_recent_trash() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        let user = db.create_user("Ada", "ada@example.com", "hash").unwrap();
        let note = db
            .insert_note(
                &user.id,
                &NewNote {
                    title: "bin".to_string(),
                    content: String::new(),
                    tags: vec![],
                    is_archived: false,
                },
            )
            .unwrap();
        db.soft_delete_note(&user.id, &note.id).unwrap();

        let report = purge_expired(&db, Utc::now()).unwrap();
        assert_eq!(report.notes, 0);

        let report = purge_expired(&db, Utc::now() + Duration::days(RETENTION_DAYS + 1)).unwrap();
        assert_eq!(report.notes, 1);
        assert!(db.get_note(&user.id, &note.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancel() {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap());
        let cancel = CancellationToken::new();

        let handle = spawn_purge_worker(db, std::time::Duration::from_secs(3600), cancel.clone());
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_worker_survives_zero_interval() {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap());
        let cancel = CancellationToken::new();

        let handle = spawn_purge_worker(db, std::time::Duration::ZERO, cancel.clone());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "worker should still be running");

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("worker should stop")
            .expect("worker should not panic");
    }
}
