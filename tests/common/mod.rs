#![allow(dead_code)]

use axum::http::{HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use wallshare::{
    Config, create_app,
    db::{Database, NewImage},
};

pub const ADMIN_PASSWORD: &str = "admin";

static SEEDED: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub server: TestServer,
    pub config: Config,
    _temp_dir: TempDir,
}

pub fn test_config(temp_dir: &TempDir) -> Config {
    let root = temp_dir.path();
    let mut config = Config::default();

    config.app.session_secret = "integration-test-secret".to_string();
    config.app.password_hash_cost = 4;
    config.templates.directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
    config.static_files.directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static");
    config.database.path = root.join("data").join("test.db");
    config.storage.upload_directory = root.join("uploads");
    config.storage.thumbnail_directory = root.join("thumbnails");

    std::fs::create_dir_all(&config.storage.upload_directory).unwrap();
    std::fs::create_dir_all(&config.storage.thumbnail_directory).unwrap();
    config
}

pub async fn spawn_with(temp_dir: TempDir, config: Config) -> TestApp {
    let app = create_app(config.clone()).await.unwrap();
    TestApp {
        server: TestServer::new(app).unwrap(),
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    spawn_with(temp_dir, config).await
}

impl TestApp {
    pub fn database(&self) -> Database {
        Database::open(&self.config.database.path).unwrap()
    }

    /// Insert `count` image rows, with files on disk, sharing `tags`.
    pub fn seed_images(&self, count: usize, tags: &[&str]) -> Vec<i64> {
        let images: Vec<NewImage> = (0..count)
            .map(|i| {
                let n = SEEDED.fetch_add(1, Ordering::Relaxed);
                let filename = format!("seed_{}.jpg", n);
                let thumbnail = format!("thumb_{}", filename);
                std::fs::write(self.config.storage.upload_directory.join(&filename), b"jpeg").unwrap();
                std::fs::write(self.config.storage.thumbnail_directory.join(&thumbnail), b"jpeg").unwrap();
                NewImage {
                    filename,
                    thumbnail,
                    title: Some(format!("Seed {i}")),
                    description: None,
                }
            })
            .collect();
        let tags: Vec<String> = tags.iter().map(|tag| tag.to_string()).collect();
        self.database().insert_images(&images, &tags).unwrap()
    }

    /// Log in and return the `Cookie` header value carrying the session.
    pub async fn login(&self) -> HeaderValue {
        let response = self
            .server
            .post("/admin/login")
            .form(&[("password", ADMIN_PASSWORD)])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/admin/");
        cookie_header(&response, "session")
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([90u8, 140, 200]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// A `Cookie` request header replaying one cookie set by `response`.
pub fn cookie_header(response: &TestResponse, name: &str) -> HeaderValue {
    let cookie = response.cookie(name);
    HeaderValue::from_str(&format!("{}={}", cookie.name(), cookie.value())).unwrap()
}
