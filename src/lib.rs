use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod admin;
pub mod client_ip;
pub mod db;
pub mod gallery;
pub mod login;
pub mod media;
pub mod session;
pub mod startup_checks;
pub mod static_files;
pub mod templating;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub gallery: GalleryConfig,
    pub hotlink: HotlinkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Honor `X-Forwarded-For` / `X-Real-IP` when resolving client addresses.
    pub trust_forwarded_headers: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub session_secret: String,
    /// Only used to seed the credential on first start.
    pub admin_password: String,
    pub session_ttl_hours: u64,
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_directory: PathBuf,
    pub thumbnail_directory: PathBuf,
    pub allowed_extensions: Vec<String>,
    /// Per file, in bytes.
    pub max_file_size: usize,
    /// Whole upload request body, in bytes.
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub images_per_page: usize,
    pub admin_images_per_page: usize,
    pub feed_initial_count: usize,
    pub feed_batch_size: usize,
    pub thumbnail: ImageSizeConfig,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ImageSizeConfig {
    pub width: u32,
    pub height: u32,
}

/// Seed for the hotlink policy. Once saved from the admin page the database
/// copy wins.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HotlinkConfig {
    pub enabled: bool,
    pub allowed_domains: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            trust_forwarded_headers: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Wallshare".to_string(),
            session_secret: "change-me-in-production".to_string(),
            admin_password: "admin".to_string(),
            session_ttl_hours: 24 * 7,
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("templates"),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("static"),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/wallshare.db"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_directory: PathBuf::from("data/uploads"),
            thumbnail_directory: PathBuf::from("data/thumbnails"),
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_size: 16 * 1024 * 1024,
            max_request_size: 256 * 1024 * 1024,
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            images_per_page: 12,
            admin_images_per_page: 20,
            feed_initial_count: 24,
            feed_batch_size: 12,
            thumbnail: ImageSizeConfig {
                width: 400,
                height: 400,
            },
            jpeg_quality: 85,
        }
    }
}

impl Default for HotlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_domains: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::{Database, DbError};
use crate::login::LoginError;
use crate::media::{HotlinkPolicy, SharedHotlinkPolicy};

#[derive(Clone)]
pub struct AppState {
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub gallery: gallery::SharedGallery,
    pub hotlink: SharedHotlinkPolicy,
    pub config: Config,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to open database: {0}")]
    Database(#[from] DbError),

    #[error("Failed to seed admin credential: {0}")]
    Credential(#[from] LoginError),
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    let has_version = query
        .as_deref()
        .is_some_and(|query| query.split('&').any(|pair| pair.starts_with("v=")));
    app_state
        .static_handler
        .serve(&path, has_version, &headers)
        .await
}

/// The stored hotlink policy, or the configured one saved as the first
/// stored copy.
fn load_hotlink_policy(db: &Database, config: &HotlinkConfig) -> Result<HotlinkPolicy, DbError> {
    if let Some(policy) = db.hotlink_policy()? {
        return Ok(policy);
    }

    let policy = HotlinkPolicy::new(config.enabled, &config.allowed_domains);
    db.save_hotlink_policy(&policy)?;
    info!("Seeded hotlink policy from configuration");
    Ok(policy)
}

pub async fn create_app(config: Config) -> Result<Router, InitError> {
    let db = Database::open(&config.database.path)?;
    login::seed_admin_password(
        &db,
        &config.app.admin_password,
        config.app.password_hash_cost,
    )?;
    let hotlink = load_hotlink_policy(&db, &config.hotlink)?;
    info!(
        enabled = hotlink.enabled,
        domains = hotlink.allowed_domains.len(),
        "Hotlink protection loaded"
    );

    let template_engine = Arc::new(templating::TemplateEngine::new(
        config.templates.directory.clone(),
    ));

    let static_handler =
        static_files::StaticFileHandler::new(config.static_files.directory.clone());

    let gallery = Arc::new(gallery::Gallery::new(
        db,
        config.gallery.clone(),
        config.storage.clone(),
    ));

    let upload_limit = config.storage.max_request_size;

    let app_state = AppState {
        template_engine,
        static_handler,
        gallery,
        hotlink: Arc::new(RwLock::new(hotlink)),
        config,
    };

    let router = Router::new()
        .route("/", get(gallery::index_handler))
        .route("/gallery", get(gallery::gallery_page_handler))
        .route("/api/gallery/load-more", get(gallery::load_more_handler))
        .route("/filter", get(gallery::filter_handler))
        .route("/image/{id}", get(gallery::image_detail_handler))
        .route("/api/like/{id}", post(gallery::like_handler))
        .route("/uploads/{filename}", get(media::upload_handler))
        .route("/thumbnails/{filename}", get(media::thumbnail_handler))
        .route("/static/{*path}", get(static_file_handler))
        .route(
            "/admin/login",
            get(login::login_page).post(login::login_submit),
        )
        .route("/admin/logout", get(login::logout))
        .route(
            "/admin/change-password",
            get(login::change_password_page).post(login::change_password_submit),
        )
        .route("/admin", get(admin::dashboard))
        .route("/admin/", get(admin::dashboard))
        .route("/admin/images", get(admin::images_page))
        .route(
            "/admin/upload",
            get(admin::upload_page)
                .post(admin::upload_submit)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/admin/image/{id}/edit",
            get(admin::edit_image_page).post(admin::edit_image_submit),
        )
        .route("/admin/image/{id}/delete", post(admin::delete_image))
        .route("/admin/images/batch-delete", post(admin::batch_delete))
        .route("/admin/tags", get(admin::tags_page))
        .route("/admin/tag/{id}/delete", post(admin::delete_tag))
        .route(
            "/admin/announcement",
            get(admin::announcement_page).post(admin::announcement_submit),
        )
        .route(
            "/admin/hotlink",
            get(admin::hotlink_page).post(admin::hotlink_submit),
        )
        .route(
            "/admin/site-settings",
            get(admin::site_settings_page).post(admin::site_settings_submit),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let method = request.method();
                    let uri = request.uri();
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");
                    let referer = headers
                        .get("referer")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %method,
                        path = %uri.path(),
                        query = ?uri.query(),
                        user_agent = %user_agent,
                        referer = %referer,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %status,
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state);

    Ok(router)
}
