use super::{
    Announcement, DEFAULT_ANNOUNCEMENT, DEFAULT_SITE_TITLE, DEFAULT_WELCOME_MESSAGE, Database,
    DbError, SiteSettings,
};
use crate::media::HotlinkPolicy;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

fn select_announcement(conn: &Connection) -> rusqlite::Result<Option<Announcement>> {
    conn.query_row(
        "SELECT id, content, updated_at FROM announcement ORDER BY id LIMIT 1",
        [],
        |row| {
            Ok(Announcement {
                id: row.get(0)?,
                content: row.get(1)?,
                updated_at: row.get(2)?,
            })
        },
    )
    .optional()
}

fn select_site_settings(conn: &Connection) -> rusqlite::Result<Option<SiteSettings>> {
    conn.query_row(
        "SELECT id, site_title, welcome_message, updated_at FROM site_settings ORDER BY id LIMIT 1",
        [],
        |row| {
            Ok(SiteSettings {
                id: row.get(0)?,
                site_title: row.get(1)?,
                welcome_message: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )
    .optional()
}

impl Database {
    /// The announcement row, created with default content on first access.
    pub fn announcement(&self) -> Result<Announcement, DbError> {
        let conn = self.connection()?;
        if let Some(announcement) = select_announcement(&conn)? {
            return Ok(announcement);
        }

        conn.execute(
            "INSERT INTO announcement (content, updated_at) VALUES (?1, ?2)",
            params![DEFAULT_ANNOUNCEMENT, Utc::now()],
        )?;
        Ok(select_announcement(&conn)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?)
    }

    pub fn update_announcement(&self, content: &str) -> Result<(), DbError> {
        let current = self.announcement()?;
        let conn = self.connection()?;
        conn.execute(
            "UPDATE announcement SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![content, Utc::now(), current.id],
        )?;
        Ok(())
    }

    /// The site settings row, created with defaults on first access.
    pub fn site_settings(&self) -> Result<SiteSettings, DbError> {
        let conn = self.connection()?;
        if let Some(settings) = select_site_settings(&conn)? {
            return Ok(settings);
        }

        conn.execute(
            "INSERT INTO site_settings (site_title, welcome_message, updated_at) VALUES (?1, ?2, ?3)",
            params![DEFAULT_SITE_TITLE, DEFAULT_WELCOME_MESSAGE, Utc::now()],
        )?;
        Ok(select_site_settings(&conn)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?)
    }

    pub fn update_site_settings(
        &self,
        site_title: &str,
        welcome_message: &str,
    ) -> Result<SiteSettings, DbError> {
        let current = self.site_settings()?;
        {
            let conn = self.connection()?;
            conn.execute(
                "UPDATE site_settings SET site_title = ?1, welcome_message = ?2, updated_at = ?3 WHERE id = ?4",
                params![site_title, welcome_message, Utc::now(), current.id],
            )?;
        }
        self.site_settings()
    }

    pub fn admin_password_hash(&self) -> Result<Option<String>, DbError> {
        let conn = self.connection()?;
        let hash = conn
            .query_row(
                "SELECT password_hash FROM admin_credential WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    pub fn set_admin_password_hash(&self, password_hash: &str) -> Result<(), DbError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO admin_credential (id, password_hash, updated_at) VALUES (1, ?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET password_hash = excluded.password_hash, updated_at = excluded.updated_at",
            params![password_hash, Utc::now()],
        )?;
        Ok(())
    }

    pub fn hotlink_policy(&self) -> Result<Option<HotlinkPolicy>, DbError> {
        let conn = self.connection()?;
        let policy = conn
            .query_row(
                "SELECT enabled, allowed_domains FROM hotlink_policy WHERE id = 1",
                [],
                |row| {
                    let enabled: bool = row.get(0)?;
                    let domains: String = row.get(1)?;
                    Ok(HotlinkPolicy::new(enabled, domains.lines()))
                },
            )
            .optional()?;
        Ok(policy)
    }

    pub fn save_hotlink_policy(&self, policy: &HotlinkPolicy) -> Result<(), DbError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO hotlink_policy (id, enabled, allowed_domains, updated_at) VALUES (1, ?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET enabled = excluded.enabled, \
             allowed_domains = excluded.allowed_domains, updated_at = excluded.updated_at",
            params![
                policy.enabled,
                policy.allowed_domains.join("\n"),
                Utc::now()
            ],
        )?;
        Ok(())
    }
}
