use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagWithCount {
    pub id: i64,
    pub name: String,
    pub image_count: i64,
}

/// An image row joined with its like count and tags.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub id: i64,
    pub filename: String,
    pub thumbnail: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub upload_date: DateTime<Utc>,
    pub views: i64,
    pub like_count: i64,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub thumbnail: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Totals {
    pub images: i64,
    pub tags: i64,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Announcement {
    pub id: i64,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_ANNOUNCEMENT: &str = "# Welcome to the Wallpaper Gallery\n\nThis is the announcement area and it supports Markdown.\n\nEdit it from the admin dashboard.";

#[derive(Debug, Clone, Serialize)]
pub struct SiteSettings {
    pub id: i64,
    pub site_title: String,
    pub welcome_message: String,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_SITE_TITLE: &str = "Wallpaper Gallery";
pub const DEFAULT_WELCOME_MESSAGE: &str = "Welcome to the Wallpaper Gallery";

/// Ordering for the filter view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Views,
    Likes,
}

impl SortKey {
    /// Unknown keys fall back to upload date.
    pub fn parse(value: &str) -> Self {
        match value {
            "views" => SortKey::Views,
            "likes" => SortKey::Likes,
            _ => SortKey::Date,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Views => "views",
            SortKey::Likes => "likes",
        }
    }

    pub(crate) fn order_clause(&self) -> &'static str {
        match self {
            SortKey::Date => "i.upload_date DESC, i.id DESC",
            SortKey::Views => "i.views DESC, i.id DESC",
            SortKey::Likes => "like_count DESC, i.id DESC",
        }
    }
}
