// Gallery module - image feed, filtering, likes and upload storage
mod error;
mod feed;
mod filter;
mod handlers;
pub mod image_processing;
mod types;
mod upload;

// Re-export public items
pub use error::GalleryError;
pub use feed::{new_seed, seeded_order};
pub use filter::{FilterQuery, FilteredImages};
pub use handlers::{
    filter_handler, gallery_page_handler, image_detail_handler, index_handler, like_handler,
    load_more_handler,
};
pub use types::*;
pub use upload::{UploadReport, UploadedFile, is_allowed_file, sanitize_filename};

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::{Database, SiteSettings};
use crate::{GalleryConfig, StorageConfig};

pub type SharedGallery = Arc<Gallery>;

pub struct Gallery {
    pub(crate) db: Database,
    pub(crate) config: GalleryConfig,
    pub(crate) storage: StorageConfig,
    site_settings: RwLock<Option<SiteSettings>>,
}

impl Gallery {
    pub fn new(db: Database, config: GalleryConfig, storage: StorageConfig) -> Self {
        Self {
            db,
            config,
            storage,
            site_settings: RwLock::new(None),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    /// Site settings, served from memory after the first load.
    pub async fn site_settings(&self) -> Result<SiteSettings, GalleryError> {
        if let Some(settings) = self.site_settings.read().await.as_ref() {
            return Ok(settings.clone());
        }

        let mut cached = self.site_settings.write().await;
        if let Some(settings) = cached.as_ref() {
            return Ok(settings.clone());
        }

        debug!("Loading site settings into cache");
        let settings = self.db.site_settings()?;
        *cached = Some(settings.clone());
        Ok(settings)
    }

    pub async fn update_site_settings(
        &self,
        site_title: &str,
        welcome_message: &str,
    ) -> Result<SiteSettings, GalleryError> {
        let mut cached = self.site_settings.write().await;
        let settings = self.db.update_site_settings(site_title, welcome_message)?;
        *cached = Some(settings.clone());
        Ok(settings)
    }
}

#[cfg(test)]
pub(crate) fn test_gallery(root: &std::path::Path) -> Gallery {
    let storage = StorageConfig {
        upload_directory: root.join("uploads"),
        thumbnail_directory: root.join("thumbnails"),
        ..StorageConfig::default()
    };
    std::fs::create_dir_all(&storage.upload_directory).unwrap();
    std::fs::create_dir_all(&storage.thumbnail_directory).unwrap();

    Gallery::new(
        Database::open_in_memory().unwrap(),
        GalleryConfig::default(),
        storage,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn site_settings_cache_follows_updates() {
        let temp_dir = TempDir::new().unwrap();
        let gallery = test_gallery(temp_dir.path());

        let initial = gallery.site_settings().await.unwrap();
        assert_eq!(initial.site_title, crate::db::DEFAULT_SITE_TITLE);

        gallery
            .update_site_settings("Night Skies", "Stars only")
            .await
            .unwrap();

        let cached = gallery.site_settings().await.unwrap();
        assert_eq!(cached.site_title, "Night Skies");
        assert_eq!(cached.welcome_message, "Stars only");
    }
}
