// Admin module - dashboard, image management and site configuration
mod content;
mod forms;
mod images;

pub use content::{
    announcement_page, announcement_submit, delete_tag, hotlink_page, hotlink_submit,
    site_settings_page, site_settings_submit, tags_page,
};
pub use forms::{AnnouncementForm, EditImageForm, HotlinkForm, SiteSettingsForm, parse_image_ids};
pub use images::{
    batch_delete, dashboard, delete_image, edit_image_page, edit_image_submit, images_page,
    upload_page, upload_submit,
};

use axum::response::Response;

use crate::{
    AppState,
    session::{Flash, flash_redirect},
};

pub const IMAGES_PATH: &str = "/admin/images";
pub const UPLOAD_PATH: &str = "/admin/upload";
pub const TAGS_PATH: &str = "/admin/tags";
pub const ANNOUNCEMENT_PATH: &str = "/admin/announcement";
pub const HOTLINK_PATH: &str = "/admin/hotlink";
pub const SITE_SETTINGS_PATH: &str = "/admin/site-settings";

fn redirect(app_state: &AppState, to: &str, flashes: &[Flash]) -> Response {
    flash_redirect(&app_state.config.app.session_secret, to, flashes)
}
