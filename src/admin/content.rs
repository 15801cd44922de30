use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use tracing::info;

use super::{
    ANNOUNCEMENT_PATH, HOTLINK_PATH, SITE_SETTINGS_PATH, TAGS_PATH,
    forms::{AnnouncementForm, HotlinkForm, SiteSettingsForm},
    redirect,
};
use crate::{
    AppState,
    gallery::GalleryError,
    login::AdminSession,
    session::Flash,
    templating::{Page, render_markdown},
};

pub async fn tags_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let tags = app_state.gallery.database().list_tags()?;
    Ok(
        Page::new("admin/tags.html.liquid", "Manage Tags", liquid::object!({ "tags": tags }))
            .render(&app_state, &headers)
            .await,
    )
}

/// Images keep existing; only their link to the tag goes.
pub async fn delete_tag(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, GalleryError> {
    let id: i64 = id.parse().map_err(|_| GalleryError::NotFound)?;
    if !app_state.gallery.database().delete_tag(id)? {
        return Err(GalleryError::NotFound);
    }

    info!(tag_id = id, "Tag deleted");
    Ok(redirect(&app_state, TAGS_PATH, &[Flash::success("Tag deleted")]))
}

pub async fn announcement_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let announcement = app_state.gallery.database().announcement()?;
    let globals = liquid::object!({
        "preview_html": render_markdown(&announcement.content),
        "announcement": announcement,
    });
    Ok(
        Page::new("admin/announcement.html.liquid", "Announcement", globals)
            .render(&app_state, &headers)
            .await,
    )
}

pub async fn announcement_submit(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Form(form): Form<AnnouncementForm>,
) -> Result<Response, GalleryError> {
    app_state
        .gallery
        .database()
        .update_announcement(form.content.trim())?;

    info!("Announcement updated");
    Ok(redirect(
        &app_state,
        ANNOUNCEMENT_PATH,
        &[Flash::success("Announcement updated")],
    ))
}

pub async fn hotlink_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let policy = app_state.hotlink.read().await.clone();
    let globals = liquid::object!({
        "domains_text": policy.domains_text(),
        "hotlink": policy,
    });
    Page::new("admin/hotlink.html.liquid", "Hotlink Protection", globals)
        .render(&app_state, &headers)
        .await
}

/// Persist the policy and swap it in for the media routes immediately.
pub async fn hotlink_submit(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Form(form): Form<HotlinkForm>,
) -> Result<Response, GalleryError> {
    let policy = form.into_policy();
    app_state.gallery.database().save_hotlink_policy(&policy)?;

    info!(
        enabled = policy.enabled,
        domains = policy.allowed_domains.len(),
        "Hotlink policy updated"
    );
    *app_state.hotlink.write().await = policy;

    Ok(redirect(
        &app_state,
        HOTLINK_PATH,
        &[Flash::success("Hotlink protection settings saved")],
    ))
}

pub async fn site_settings_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    // Page::render already exposes `site_settings`
    Page::new(
        "admin/site_settings.html.liquid",
        "Site Settings",
        liquid::object!({}),
    )
    .render(&app_state, &headers)
    .await
}

pub async fn site_settings_submit(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Form(form): Form<SiteSettingsForm>,
) -> Result<Response, GalleryError> {
    let (site_title, welcome_message) = form.resolved();
    app_state
        .gallery
        .update_site_settings(&site_title, &welcome_message)
        .await?;

    info!(site_title = %site_title, "Site settings updated");
    Ok(redirect(
        &app_state,
        SITE_SETTINGS_PATH,
        &[Flash::success("Site settings updated")],
    ))
}
