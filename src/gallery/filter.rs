use super::{Gallery, GalleryError, Pagination, parse_page};
use crate::db::{ImageRecord, SortKey};

/// Parsed `/filter` query: repeated `tags`, a sort key and a page number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub tag_ids: Vec<i64>,
    pub sort: SortKey,
    pub page: usize,
}

impl FilterQuery {
    /// Parse a raw query string. Tag ids that are not integers are skipped.
    pub fn parse(query: Option<&str>) -> Self {
        let mut tag_ids = Vec::new();
        let mut sort = SortKey::Date;
        let mut page = None;

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "tags" => {
                    if let Ok(id) = value.trim().parse::<i64>()
                        && !tag_ids.contains(&id)
                    {
                        tag_ids.push(id);
                    }
                }
                "sort" => sort = SortKey::parse(value.trim()),
                "page" => page = Some(value.into_owned()),
                _ => {}
            }
        }

        Self {
            tag_ids,
            sort,
            page: parse_page(page.as_deref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilteredImages {
    pub images: Vec<ImageRecord>,
    pub pagination: Pagination,
}

impl Gallery {
    /// Images tagged with any of the requested tags, sorted and paginated.
    pub async fn filter(&self, query: &FilterQuery) -> Result<FilteredImages, GalleryError> {
        self.paginate(query.tag_ids.clone(), query.sort, query.page, self.config.images_per_page)
            .await
    }

    /// Newest first, for the admin image list.
    pub async fn admin_page(&self, page: usize) -> Result<FilteredImages, GalleryError> {
        self.paginate(Vec::new(), SortKey::Date, page, self.config.admin_images_per_page)
            .await
    }

    async fn paginate(
        &self,
        tag_ids: Vec<i64>,
        sort: SortKey,
        page: usize,
        per_page: usize,
    ) -> Result<FilteredImages, GalleryError> {
        let per_page = per_page.max(1);
        let pagination = Pagination::new(page, per_page, 0);
        // A page too large to address has no rows.
        let offset = pagination.offset().unwrap_or(usize::MAX);

        let db = self.db.clone();
        let (images, total) = tokio::task::spawn_blocking(move || {
            db.filter_images(&tag_ids, sort, per_page, offset)
        })
        .await??;

        Ok(FilteredImages {
            images,
            pagination: Pagination::new(pagination.page, per_page, total),
        })
    }
}
