use axum::{
    Form,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use tracing::{debug, info};

use super::{IMAGES_PATH, UPLOAD_PATH, forms::EditImageForm, parse_image_ids, redirect};
use crate::{
    AppState,
    db::parse_tag_list,
    gallery::{GalleryError, ImageCard, PageQuery, UploadedFile, cards},
    login::AdminSession,
    session::Flash,
    templating::Page,
};

const RECENT_UPLOADS: usize = 5;

fn parse_id(raw: &str) -> Result<i64, GalleryError> {
    raw.parse().map_err(|_| GalleryError::NotFound)
}

pub async fn dashboard(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let db = app_state.gallery.database();
    let totals = db.totals()?;
    let recent = db.recent_images(RECENT_UPLOADS)?;

    let globals = liquid::object!({
        "totals": totals,
        "recent_images": cards(&recent),
    });
    Ok(Page::new("admin/dashboard.html.liquid", "Dashboard", globals)
        .render(&app_state, &headers)
        .await)
}

pub async fn images_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let result = app_state.gallery.admin_page(query.page()).await?;

    let globals = liquid::object!({
        "images": cards(&result.images),
        "pagination": result.pagination,
    });
    Ok(Page::new("admin/images.html.liquid", "Manage Images", globals)
        .render(&app_state, &headers)
        .await)
}

pub async fn upload_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let storage = &app_state.config.storage;
    let globals = liquid::object!({
        "allowed_extensions": storage.allowed_extensions.join(", "),
        "max_file_size_mb": storage.max_file_size / (1024 * 1024),
    });
    Page::new("admin/upload.html.liquid", "Upload Images", globals)
        .render(&app_state, &headers)
        .await
}

/// Multipart upload: any number of `files` parts plus a shared
/// `description` and comma separated `tags`.
pub async fn upload_submit(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, GalleryError> {
    let mut files = Vec::new();
    let mut description = String::new();
    let mut tags = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                // Browsers send one empty part when no file was picked
                if original_name.is_empty() && data.is_empty() {
                    continue;
                }
                files.push(UploadedFile {
                    original_name,
                    data: data.to_vec(),
                });
            }
            "description" => description = field.text().await?.trim().to_string(),
            "tags" => tags = field.text().await?,
            other => debug!("Ignoring upload form field {:?}", other),
        }
    }

    if files.is_empty() {
        return Ok(redirect(
            &app_state,
            UPLOAD_PATH,
            &[Flash::danger("No files selected")],
        ));
    }

    let report = app_state
        .gallery
        .store_uploads(files, &description, &parse_tag_list(&tags))
        .await?;

    let mut flashes = Vec::new();
    if report.uploaded > 0 {
        flashes.push(Flash::success(format!(
            "Uploaded {} images",
            report.uploaded
        )));
    }
    if report.failed > 0 {
        flashes.push(Flash::danger(format!(
            "{} images failed to upload",
            report.failed
        )));
    }
    Ok(redirect(&app_state, IMAGES_PATH, &flashes))
}

pub async fn edit_image_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let id = parse_id(&id)?;
    let image = app_state
        .gallery
        .database()
        .get_image(id)?
        .ok_or(GalleryError::NotFound)?;

    let globals = liquid::object!({ "image": ImageCard::from(&image) });
    Ok(Page::new("admin/edit_image.html.liquid", "Edit Image", globals)
        .render(&app_state, &headers)
        .await)
}

pub async fn edit_image_submit(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<EditImageForm>,
) -> Result<Response, GalleryError> {
    let id = parse_id(&id)?;
    let updated = app_state.gallery.database().update_image(
        id,
        Some(form.title.trim().to_string()),
        Some(form.description.trim().to_string()),
        &form.tag_names(),
    )?;
    if !updated {
        return Err(GalleryError::NotFound);
    }

    info!(image_id = id, "Image updated");
    Ok(redirect(
        &app_state,
        IMAGES_PATH,
        &[Flash::success("Image updated")],
    ))
}

pub async fn delete_image(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, GalleryError> {
    let id = parse_id(&id)?;
    let deleted = app_state.gallery.delete_images(&[id]).await?;
    if deleted.is_empty() {
        return Err(GalleryError::NotFound);
    }

    Ok(redirect(
        &app_state,
        IMAGES_PATH,
        &[Flash::success("Image deleted")],
    ))
}

/// Form body with repeated `image_ids` keys, which `Form` cannot collect.
pub async fn batch_delete(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<Response, GalleryError> {
    let ids = parse_image_ids(&body);
    if ids.is_empty() {
        return Ok(redirect(
            &app_state,
            IMAGES_PATH,
            &[Flash::danger("Select at least one image to delete")],
        ));
    }

    let deleted = app_state.gallery.delete_images(&ids).await?;
    Ok(redirect(
        &app_state,
        IMAGES_PATH,
        &[Flash::success(format!("Deleted {} images", deleted.len()))],
    ))
}
