use super::{
    FeedEntry, FeedPage, FilterQuery, GalleryError, LikeResponse, LoadMoreQuery, cards, new_seed,
};
use crate::{
    AppState,
    client_ip::ClientIp,
    session::Session,
    templating::{Page, render_markdown},
};
use axum::{
    Json,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

const MAX_LOAD_MORE: usize = 100;

/// The visitor's feed seed, plus a cookie to persist it if one was just
/// assigned.
fn feed_seed(app_state: &AppState, session: Session) -> (u64, Option<String>) {
    let mut session = session.0;
    if let Some(seed) = session.gallery_seed {
        return (seed, None);
    }

    let seed = new_seed();
    session.gallery_seed = Some(seed);
    debug!("Assigned gallery seed {}", seed);

    let app = &app_state.config.app;
    match session.to_cookie(&app.session_secret, app.session_ttl_hours) {
        Ok(cookie) => (seed, Some(cookie)),
        Err(e) => {
            error!("Failed to persist gallery seed: {}", e);
            (seed, None)
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, GalleryError> {
    raw.parse().map_err(|_| GalleryError::NotFound)
}

pub async fn index_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let announcement = app_state.gallery.database().announcement()?;
    let announcement_html = render_markdown(&announcement.content);

    let globals = liquid::object!({
        "announcement": announcement,
        "announcement_html": announcement_html,
    });
    Ok(Page::new("index.html.liquid", "Home", globals)
        .render(&app_state, &headers)
        .await)
}

pub async fn gallery_page_handler(
    State(app_state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let (seed, cookie) = feed_seed(&app_state, session);
    let config = app_state.gallery.config();

    let (images, has_more) = app_state
        .gallery
        .load_more(seed, 0, config.feed_initial_count)
        .await?;

    let globals = liquid::object!({
        "images": cards(&images),
        "has_more": has_more,
        "next_offset": images.len(),
        "batch_size": config.feed_batch_size,
    });

    let mut page = Page::new("gallery.html.liquid", "Gallery", globals);
    if let Some(cookie) = cookie {
        page = page.with_cookie(cookie);
    }
    Ok(page.render(&app_state, &headers).await)
}

pub async fn load_more_handler(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<LoadMoreQuery>,
) -> Result<Response, GalleryError> {
    let (seed, cookie) = feed_seed(&app_state, session);
    let offset = query.offset();
    let limit = query.limit(app_state.gallery.config().feed_batch_size, MAX_LOAD_MORE);

    let (images, has_more) = app_state.gallery.load_more(seed, offset, limit).await?;
    let page = FeedPage {
        images: images.iter().map(FeedEntry::from).collect(),
        has_more,
    };

    let cookies = AppendHeaders(cookie.map(|cookie| (SET_COOKIE, cookie)));
    Ok((cookies, Json(page)).into_response())
}

#[derive(Debug, Serialize)]
struct TagOption {
    id: i64,
    name: String,
    image_count: i64,
    selected: bool,
}

/// Query string that reproduces the current tag and sort selection, for
/// building pagination links.
fn filter_base_query(query: &FilterQuery) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for id in &query.tag_ids {
        serializer.append_pair("tags", &id.to_string());
    }
    serializer.append_pair("sort", query.sort.as_str());
    serializer.finish()
}

pub async fn filter_handler(
    State(app_state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let query = FilterQuery::parse(raw_query.as_deref());
    let result = app_state.gallery.filter(&query).await?;

    let all_tags: Vec<TagOption> = app_state
        .gallery
        .database()
        .list_tags()?
        .into_iter()
        .map(|tag| TagOption {
            selected: query.tag_ids.contains(&tag.id),
            id: tag.id,
            name: tag.name,
            image_count: tag.image_count,
        })
        .collect();

    let globals = liquid::object!({
        "images": cards(&result.images),
        "pagination": result.pagination,
        "all_tags": all_tags,
        "selected_tags": query.tag_ids,
        "sort_by": query.sort.as_str(),
        "base_query": filter_base_query(&query),
    });
    Ok(Page::new("filter.html.liquid", "Filter", globals)
        .render(&app_state, &headers)
        .await)
}

pub async fn image_detail_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    ClientIp(client_ip): ClientIp,
    headers: HeaderMap,
) -> Result<Response, GalleryError> {
    let id = parse_id(&id)?;
    let db = app_state.gallery.database();

    let image = db.record_view(id)?.ok_or(GalleryError::NotFound)?;
    let has_liked = db.has_liked(id, &client_ip)?;

    let title = match image.title.as_deref() {
        Some(title) if !title.trim().is_empty() => title.to_string(),
        _ => "Image Details".to_string(),
    };

    let globals = liquid::object!({
        "image": super::ImageCard::from(&image),
        "has_liked": has_liked,
    });
    Ok(Page::new("image_detail.html.liquid", title, globals)
        .render(&app_state, &headers)
        .await)
}

pub async fn like_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    ClientIp(client_ip): ClientIp,
) -> Result<Json<LikeResponse>, GalleryError> {
    let id = parse_id(&id)?;
    let state = app_state
        .gallery
        .database()
        .toggle_like(id, &client_ip)?
        .ok_or(GalleryError::NotFound)?;

    debug!(
        image_id = id,
        client_ip = %client_ip,
        liked = state.liked,
        "Like toggled"
    );

    Ok(Json(LikeResponse {
        success: true,
        liked: state.liked,
        like_count: state.like_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SortKey;

    #[test]
    fn base_query_keeps_tags_and_sort() {
        let query = FilterQuery {
            tag_ids: vec![2, 5],
            sort: SortKey::Views,
            page: 3,
        };
        assert_eq!(filter_base_query(&query), "tags=2&tags=5&sort=views");
    }
}
