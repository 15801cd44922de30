use serde::{Deserialize, Serialize};

use crate::db::ImageRecord;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagName {
    pub name: String,
}

/// One entry of the infinite-scroll feed, as returned by the load-more API.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub id: i64,
    pub thumbnail: String,
    pub title: String,
    pub views: i64,
    pub like_count: i64,
    pub tags: Vec<TagName>,
    pub url: String,
}

impl From<&ImageRecord> for FeedEntry {
    fn from(image: &ImageRecord) -> Self {
        Self {
            id: image.id,
            thumbnail: thumbnail_url(&image.thumbnail),
            title: image.title.clone().unwrap_or_default(),
            views: image.views,
            like_count: image.like_count,
            tags: image
                .tags
                .iter()
                .map(|tag| TagName {
                    name: tag.name.clone(),
                })
                .collect(),
            url: detail_url(image.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub images: Vec<FeedEntry>,
    pub has_more: bool,
}

/// An image prepared for templates.
#[derive(Debug, Clone, Serialize)]
pub struct ImageCard {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub detail_url: String,
    pub upload_date: String,
    pub views: i64,
    pub like_count: i64,
    pub tags: Vec<crate::db::Tag>,
    pub tag_list: String,
}

impl From<&ImageRecord> for ImageCard {
    fn from(image: &ImageRecord) -> Self {
        Self {
            id: image.id,
            title: image.title.clone().unwrap_or_default(),
            description: image.description.clone().unwrap_or_default(),
            filename: image.filename.clone(),
            image_url: upload_url(&image.filename),
            thumbnail_url: thumbnail_url(&image.thumbnail),
            detail_url: detail_url(image.id),
            upload_date: image.upload_date.format("%Y-%m-%d %H:%M").to_string(),
            views: image.views,
            like_count: image.like_count,
            tags: image.tags.clone(),
            tag_list: image
                .tags
                .iter()
                .map(|tag| tag.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

pub fn cards(images: &[ImageRecord]) -> Vec<ImageCard> {
    images.iter().map(ImageCard::from).collect()
}

pub fn upload_url(filename: &str) -> String {
    format!("/uploads/{}", urlencoding::encode(filename))
}

pub fn thumbnail_url(filename: &str) -> String {
    format!("/thumbnails/{}", urlencoding::encode(filename))
}

pub fn detail_url(id: i64) -> String {
    format!("/image/{}", id)
}

/// Page arithmetic shared by the filter view and the admin image list.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_num: Option<usize>,
    pub next_num: Option<usize>,
}

impl Pagination {
    /// `page` is 1-based; zero is treated as the first page.
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let pages = total.div_ceil(per_page);
        let has_prev = page > 1;
        let has_next = page < pages;

        Self {
            page,
            per_page,
            total,
            pages,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
        }
    }

    /// Rows to skip for this page, `None` when it does not fit in `usize`.
    pub fn offset(&self) -> Option<usize> {
        (self.page - 1).checked_mul(self.per_page)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Values below one, and garbage, fall back to the first page.
    pub fn page(&self) -> usize {
        parse_page(self.page.as_deref())
    }
}

pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|page| page.trim().parse::<usize>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoadMoreQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl LoadMoreQuery {
    pub fn offset(&self) -> usize {
        self.offset
            .as_deref()
            .and_then(|offset| offset.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Missing or zero limits use `default`; larger ones are capped at `max`.
    pub fn limit(&self, default: usize, max: usize) -> usize {
        self.limit
            .as_deref()
            .and_then(|limit| limit.trim().parse::<usize>().ok())
            .filter(|limit| *limit >= 1)
            .unwrap_or(default)
            .min(max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
    pub like_count: i64,
}
