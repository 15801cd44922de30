use rusqlite::Connection;

/// Create every table and index if missing. Safe to run on each start.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            filename    TEXT NOT NULL,
            thumbnail   TEXT NOT NULL,
            title       TEXT,
            description TEXT,
            upload_date TEXT NOT NULL,
            views       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tags (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS image_tags (
            image_id INTEGER NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            tag_id   INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (image_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS likes (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            image_id   INTEGER NOT NULL REFERENCES images(id) ON DELETE CASCADE,
            ip_address TEXT NOT NULL,
            created_at TEXT NOT NULL,
            CONSTRAINT unique_like UNIQUE (image_id, ip_address)
        );

        CREATE TABLE IF NOT EXISTS announcement (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            content    TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS site_settings (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            site_title      TEXT NOT NULL,
            welcome_message TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS admin_credential (
            id            INTEGER PRIMARY KEY CHECK (id = 1),
            password_hash TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS hotlink_policy (
            id              INTEGER PRIMARY KEY CHECK (id = 1),
            enabled         INTEGER NOT NULL,
            allowed_domains TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_images_upload_date ON images(upload_date DESC);
        CREATE INDEX IF NOT EXISTS idx_images_views ON images(views DESC);
        CREATE INDEX IF NOT EXISTS idx_image_tags_tag ON image_tags(tag_id);
        CREATE INDEX IF NOT EXISTS idx_likes_image ON likes(image_id);
        "#,
    )
}
