use super::{Database, DbError, LikeState};
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

fn count_likes(conn: &Connection, image_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE image_id = ?1",
        params![image_id],
        |row| row.get(0),
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Insert a like row. A row already present for (image, ip) counts as liked.
pub(super) fn insert_like(conn: &Connection, image_id: i64, ip_address: &str) -> Result<bool, DbError> {
    match conn.execute(
        "INSERT INTO likes (image_id, ip_address, created_at) VALUES (?1, ?2, ?3)",
        params![image_id, ip_address, Utc::now()],
    ) {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => {
            debug!(image_id, ip_address, "Duplicate like treated as already liked");
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Delete the like for (image, ip) if present, otherwise insert it.
    ///
    /// Returns `None` when the image does not exist. An insert rejected by the
    /// unique constraint counts as already liked.
    pub fn toggle_like(&self, image_id: i64, ip_address: &str) -> Result<Option<LikeState>, DbError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM images WHERE id = ?1",
                params![image_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let removed = tx.execute(
            "DELETE FROM likes WHERE image_id = ?1 AND ip_address = ?2",
            params![image_id, ip_address],
        )?;

        let liked = removed == 0 && insert_like(&tx, image_id, ip_address)?;

        let like_count = count_likes(&tx, image_id)?;
        tx.commit()?;

        Ok(Some(LikeState { liked, like_count }))
    }

    pub fn has_liked(&self, image_id: i64, ip_address: &str) -> Result<bool, DbError> {
        let conn = self.connection()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM likes WHERE image_id = ?1 AND ip_address = ?2",
                params![image_id, ip_address],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
