use chrono::Local;
use rand::Rng;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::{Gallery, GalleryError, image_processing};
use crate::db::{ImageRecord, NewImage};

/// A file received from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Reduce a client filename to ASCII letters, digits, `.`, `_` and `-`.
/// Directory parts are dropped and whitespace becomes `_`. A name with no
/// ASCII stem keeps its extension, so `壁纸.png` becomes `.png`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_whitespace() {
            cleaned.push('_');
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            cleaned.push(c);
        }
    }

    cleaned
        .trim_start_matches('_')
        .trim_end_matches(['.', '_'])
        .to_string()
}

fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_lowercase())
}

pub fn is_allowed_file(filename: &str, allowed_extensions: &[String]) -> bool {
    extension_of(filename)
        .is_some_and(|ext| allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)))
}

/// `{stem}_{YYYYmmddHHMMSS}_{1000..9999}.{ext}`, with `image` as the stem
/// when nothing usable is left of the client's.
fn stored_filename(sanitized: &str) -> String {
    let (stem, ext) = sanitized.rsplit_once('.').unwrap_or((sanitized, ""));
    let stem = match stem.trim_matches(['.', '_']) {
        "" => "image",
        stem => stem,
    };
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let suffix: u32 = rand::rng().random_range(1000..=9999);

    if ext.is_empty() {
        format!("{}_{}_{}", stem, timestamp, suffix)
    } else {
        format!("{}_{}_{}.{}", stem, timestamp, suffix, ext.to_lowercase())
    }
}

fn thumbnail_filename(stored: &str) -> String {
    let stem = stored.rsplit_once('.').map_or(stored, |(stem, _)| stem);
    format!("thumb_{}.jpg", stem)
}

async fn remove_file_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove {:?}: {}", path, e);
    }
}

impl Gallery {
    /// Store one file and its thumbnail. On failure nothing stays on disk.
    async fn store_file(&self, file: UploadedFile) -> Result<NewImage, GalleryError> {
        if !is_allowed_file(&file.original_name, &self.storage.allowed_extensions) {
            return Err(GalleryError::DisallowedExtension(file.original_name));
        }
        let sanitized = sanitize_filename(&file.original_name);
        if file.data.len() > self.storage.max_file_size {
            return Err(GalleryError::FileTooLarge {
                size: file.data.len(),
                limit: self.storage.max_file_size,
            });
        }

        let filename = stored_filename(&sanitized);
        let thumbnail = thumbnail_filename(&filename);
        let original_path = self.storage.upload_directory.join(&filename);
        let thumbnail_path = self.storage.thumbnail_directory.join(&thumbnail);

        tokio::fs::write(&original_path, &file.data).await?;

        let size = image_processing::ThumbnailSize::new(
            self.config.thumbnail.width,
            self.config.thumbnail.height,
        );
        let quality = self.config.jpeg_quality;
        let (source, destination) = (original_path.clone(), thumbnail_path.clone());
        let result = tokio::task::spawn_blocking(move || {
            image_processing::create_thumbnail(&source, &destination, size, quality)
        })
        .await
        .map_err(GalleryError::from)
        .and_then(|result| result);

        match result {
            Ok((width, height)) => {
                debug!("Created thumbnail {} ({}x{})", thumbnail, width, height);
                Ok(NewImage {
                    filename,
                    thumbnail,
                    title: Some(String::new()),
                    description: None,
                })
            }
            Err(e) => {
                remove_file_logged(&original_path).await;
                if tokio::fs::try_exists(&thumbnail_path).await.unwrap_or(false) {
                    remove_file_logged(&thumbnail_path).await;
                }
                Err(e)
            }
        }
    }

    /// Store a batch of uploads sharing one description and tag set.
    ///
    /// Every file is tried; failures are counted, logged and skipped. All
    /// successful files are inserted in a single transaction at the end.
    pub async fn store_uploads(
        &self,
        files: Vec<UploadedFile>,
        description: &str,
        tag_names: &[String],
    ) -> Result<UploadReport, GalleryError> {
        let mut report = UploadReport::default();
        let mut stored = Vec::new();

        for file in files {
            let name = file.original_name.clone();
            match self.store_file(file).await {
                Ok(mut image) => {
                    image.description = Some(description.to_string());
                    stored.push(image);
                }
                Err(e) => {
                    warn!("Upload of {:?} failed: {}", name, e);
                    report.failed += 1;
                }
            }
        }

        if stored.is_empty() {
            return Ok(report);
        }

        if let Err(e) = self.db.insert_images(&stored, tag_names) {
            error!("Failed to record {} uploads: {}", stored.len(), e);
            for image in &stored {
                self.remove_image_files(image.filename.as_str(), image.thumbnail.as_str())
                    .await;
            }
            return Err(e.into());
        }

        report.uploaded = stored.len();
        info!(
            "Stored {} uploads ({} failed)",
            report.uploaded, report.failed
        );
        Ok(report)
    }

    async fn remove_image_files(&self, filename: &str, thumbnail: &str) {
        remove_file_logged(&self.storage.upload_directory.join(filename)).await;
        remove_file_logged(&self.storage.thumbnail_directory.join(thumbnail)).await;
    }

    /// Delete images and their files. Missing ids are ignored; file removal
    /// failures are logged and do not undo the deletion.
    pub async fn delete_images(&self, ids: &[i64]) -> Result<Vec<ImageRecord>, GalleryError> {
        let deleted = self.db.delete_images(ids)?;
        for image in &deleted {
            self.remove_image_files(&image.filename, &image.thumbnail).await;
        }
        if !deleted.is_empty() {
            info!("Deleted {} images", deleted.len());
        }
        Ok(deleted)
    }
}
