use super::{Database, DbError, TagWithCount};
use rusqlite::{Connection, params};

const MAX_TAG_LENGTH: usize = 50;

/// Split a comma separated tag field into clean, unique names.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',') {
        let name: String = name.trim().chars().take(MAX_TAG_LENGTH).collect();
        let name = name.trim().to_string();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub(super) fn get_or_create(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO tags (name) VALUES (?1)",
        params![name],
    )?;
    conn.query_row(
        "SELECT id FROM tags WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

impl Database {
    /// All tags sorted by name, with the number of images carrying each.
    pub fn list_tags(&self) -> Result<Vec<TagWithCount>, DbError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, COUNT(it.image_id) FROM tags t \
             LEFT JOIN image_tags it ON it.tag_id = t.id \
             GROUP BY t.id, t.name ORDER BY t.name",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(TagWithCount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    image_count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Delete a tag and detach it from every image. Returns false if missing.
    pub fn delete_tag(&self, id: i64) -> Result<bool, DbError> {
        let conn = self.connection()?;
        let deleted = conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
