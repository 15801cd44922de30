use crate::Config;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create {0:?}: {1}")]
    DirectoryCreationFailed(PathBuf, #[source] std::io::Error),

    #[error("Static files directory does not exist: {0:?}")]
    StaticDirectoryMissing(PathBuf),

    #[error("Templates directory does not exist: {0:?}")]
    TemplatesDirectoryMissing(PathBuf),
}

impl StartupCheckError {
    /// Missing storage directories stop the server; missing assets only
    /// degrade rendering.
    pub fn is_critical(&self) -> bool {
        matches!(self, StartupCheckError::DirectoryCreationFailed(..))
    }
}

async fn ensure_directory(label: &str, dir: &Path) -> Result<(), StartupCheckError> {
    if dir.exists() {
        info!("{} directory exists: {:?}", label, dir);
        return Ok(());
    }

    info!("{} directory does not exist, creating: {:?}", label, dir);
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => {
            info!("{} directory created successfully", label);
            Ok(())
        }
        Err(e) => {
            error!("Failed to create {} directory {:?}: {}", label, dir, e);
            Err(StartupCheckError::DirectoryCreationFailed(
                dir.to_path_buf(),
                e,
            ))
        }
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let mut writable = vec![
        ("Upload", config.storage.upload_directory.clone()),
        ("Thumbnail", config.storage.thumbnail_directory.clone()),
    ];
    if let Some(parent) = config.database.path.parent()
        && !parent.as_os_str().is_empty()
    {
        writable.push(("Database", parent.to_path_buf()));
    }

    for (label, dir) in &writable {
        if let Err(e) = ensure_directory(label, dir).await {
            errors.push(e);
        }
    }

    let static_dir = &config.static_files.directory;
    if !static_dir.exists() {
        warn!("Static files directory does not exist: {:?}", static_dir);
        errors.push(StartupCheckError::StaticDirectoryMissing(static_dir.clone()));
    } else {
        info!("Static files directory exists: {:?}", static_dir);
    }

    let templates_dir = &config.templates.directory;
    if !templates_dir.exists() {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        warn!("This may cause issues with page rendering");
        errors.push(StartupCheckError::TemplatesDirectoryMissing(
            templates_dir.clone(),
        ));
    } else {
        info!("Templates directory exists: {:?}", templates_dir);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_storage_directories() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.upload_directory = temp_dir.path().join("uploads");
        config.storage.thumbnail_directory = temp_dir.path().join("uploads/thumbnails");
        config.database.path = temp_dir.path().join("data/gallery.db");
        config.static_files.directory = temp_dir.path().to_path_buf();
        config.templates.directory = temp_dir.path().to_path_buf();

        perform_startup_checks(&config).await.unwrap();

        assert!(config.storage.upload_directory.is_dir());
        assert!(config.storage.thumbnail_directory.is_dir());
        assert!(temp_dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn missing_assets_are_not_critical() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.upload_directory = temp_dir.path().join("uploads");
        config.storage.thumbnail_directory = temp_dir.path().join("thumbs");
        config.database.path = temp_dir.path().join("gallery.db");
        config.static_files.directory = temp_dir.path().join("nope-static");
        config.templates.directory = temp_dir.path().join("nope-templates");

        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| !e.is_critical()));
    }
}
