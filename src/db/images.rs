use super::{Database, DbError, ImageRecord, NewImage, SortKey, Tag, Totals, tags};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::HashMap;

const IMAGE_COLUMNS: &str = "i.id, i.filename, i.thumbnail, i.title, i.description, i.upload_date, i.views, \
     (SELECT COUNT(*) FROM likes l WHERE l.image_id = i.id) AS like_count";

fn row_to_image(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        thumbnail: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        upload_date: row.get(5)?,
        views: row.get(6)?,
        like_count: row.get(7)?,
        tags: Vec::new(),
    })
}

pub(super) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Load tags for a batch of images with one query.
fn attach_tags(conn: &Connection, images: &mut [ImageRecord]) -> rusqlite::Result<()> {
    if images.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "SELECT it.image_id, t.id, t.name FROM image_tags it \
         JOIN tags t ON t.id = it.tag_id \
         WHERE it.image_id IN ({}) ORDER BY t.name",
        placeholders(images.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(images.iter().map(|i| i.id)), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Tag {
                id: row.get(1)?,
                name: row.get(2)?,
            },
        ))
    })?;

    let mut by_image: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        let (image_id, tag) = row?;
        by_image.entry(image_id).or_default().push(tag);
    }

    for image in images.iter_mut() {
        image.tags = by_image.remove(&image.id).unwrap_or_default();
    }

    Ok(())
}

fn fetch_one(conn: &Connection, id: i64) -> rusqlite::Result<Option<ImageRecord>> {
    let image = conn
        .query_row(
            &format!("SELECT {IMAGE_COLUMNS} FROM images i WHERE i.id = ?1"),
            params![id],
            row_to_image,
        )
        .optional()?;

    match image {
        Some(image) => {
            let mut images = [image];
            attach_tags(conn, &mut images)?;
            let [image] = images;
            Ok(Some(image))
        }
        None => Ok(None),
    }
}

fn replace_tags(conn: &Connection, image_id: i64, tag_ids: &[i64]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM image_tags WHERE image_id = ?1",
        params![image_id],
    )?;
    for tag_id in tag_ids {
        conn.execute(
            "INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?1, ?2)",
            params![image_id, tag_id],
        )?;
    }
    Ok(())
}

impl Database {
    /// Insert a batch of images sharing the same tags in one transaction.
    pub fn insert_images(
        &self,
        images: &[NewImage],
        tag_names: &[String],
    ) -> Result<Vec<i64>, DbError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let tag_ids = tag_names
            .iter()
            .map(|name| tags::get_or_create(&tx, name))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let now = Utc::now();
        let mut ids = Vec::with_capacity(images.len());
        for image in images {
            tx.execute(
                "INSERT INTO images (filename, thumbnail, title, description, upload_date, views) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![
                    image.filename,
                    image.thumbnail,
                    image.title,
                    image.description,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();
            replace_tags(&tx, id, &tag_ids)?;
            ids.push(id);
        }

        tx.commit()?;
        Ok(ids)
    }

    pub fn get_image(&self, id: i64) -> Result<Option<ImageRecord>, DbError> {
        let conn = self.connection()?;
        Ok(fetch_one(&conn, id)?)
    }

    /// Increment the view counter and return the refreshed image.
    pub fn record_view(&self, id: i64) -> Result<Option<ImageRecord>, DbError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE images SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Ok(None);
        }

        let image = fetch_one(&tx, id)?;
        tx.commit()?;
        Ok(image)
    }

    /// Replace title, description and the full tag set. Returns false if the
    /// image does not exist.
    pub fn update_image(
        &self,
        id: i64,
        title: Option<String>,
        description: Option<String>,
        tag_names: &[String],
    ) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE images SET title = ?1, description = ?2 WHERE id = ?3",
            params![title, description, id],
        )?;
        if updated == 0 {
            return Ok(false);
        }

        let tag_ids = tag_names
            .iter()
            .map(|name| tags::get_or_create(&tx, name))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        replace_tags(&tx, id, &tag_ids)?;

        tx.commit()?;
        Ok(true)
    }

    /// Delete images by id, returning the rows that existed so the caller can
    /// remove their files. Likes and tag links cascade.
    pub fn delete_images(&self, ids: &[i64]) -> Result<Vec<ImageRecord>, DbError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let mut deleted = Vec::new();
        for &id in ids {
            if let Some(image) = fetch_one(&tx, id)? {
                tx.execute("DELETE FROM images WHERE id = ?1", params![id])?;
                deleted.push(image);
            }
        }

        tx.commit()?;
        Ok(deleted)
    }

    pub fn delete_image(&self, id: i64) -> Result<Option<ImageRecord>, DbError> {
        Ok(self.delete_images(&[id])?.pop())
    }

    /// Every image id in ascending order.
    pub fn all_image_ids(&self) -> Result<Vec<i64>, DbError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT id FROM images ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Fetch images keeping the order of `ids`. Unknown ids are skipped.
    pub fn images_by_ids(&self, ids: &[i64]) -> Result<Vec<ImageRecord>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.connection()?;
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM images i WHERE i.id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut images = stmt
            .query_map(params_from_iter(ids.iter()), row_to_image)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        attach_tags(&conn, &mut images)?;

        let mut by_id: HashMap<i64, ImageRecord> =
            images.into_iter().map(|image| (image.id, image)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// One page of images, optionally restricted to any of `tag_ids`.
    /// Returns the page and the total number of matching images.
    pub fn filter_images(
        &self,
        tag_ids: &[i64],
        sort: SortKey,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ImageRecord>, usize), DbError> {
        let conn = self.connection()?;

        let where_sql = if tag_ids.is_empty() {
            String::new()
        } else {
            format!(
                "WHERE i.id IN (SELECT image_id FROM image_tags WHERE tag_id IN ({}))",
                placeholders(tag_ids.len())
            )
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM images i {where_sql}"),
            params_from_iter(tag_ids.iter()),
            |row| row.get(0),
        )?;
        let total = usize::try_from(total).unwrap_or(0);

        // Past the last match, or beyond what SQLite can address: empty page.
        let offset = match i64::try_from(offset) {
            Ok(skip) if offset < total => skip,
            _ => return Ok((Vec::new(), total)),
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM images i {where_sql} ORDER BY {} LIMIT ? OFFSET ?",
            sort.order_clause()
        );
        let mut query_params: Vec<i64> = tag_ids.to_vec();
        query_params.push(limit);
        query_params.push(offset);

        let mut stmt = conn.prepare(&sql)?;
        let mut images = stmt
            .query_map(params_from_iter(query_params.iter()), row_to_image)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        attach_tags(&conn, &mut images)?;

        Ok((images, total))
    }

    pub fn recent_images(&self, limit: usize) -> Result<Vec<ImageRecord>, DbError> {
        Ok(self.filter_images(&[], SortKey::Date, limit, 0)?.0)
    }

    pub fn totals(&self) -> Result<Totals, DbError> {
        let conn = self.connection()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
        };

        Ok(Totals {
            images: count("images")?,
            tags: count("tags")?,
            likes: count("likes")?,
        })
    }
}
