//! Serving of uploaded originals and thumbnails behind the hotlink check.

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::{
    path::{Component, Path},
    sync::Arc,
    time::UNIX_EPOCH,
};
use tokio::{fs::File, sync::RwLock};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::AppState;

pub type SharedHotlinkPolicy = Arc<RwLock<HotlinkPolicy>>;

/// Referer allow-list applied to every media request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotlinkPolicy {
    pub enabled: bool,
    pub allowed_domains: Vec<String>,
}

impl HotlinkPolicy {
    /// Entries are trimmed and lowercased; blank lines are dropped.
    pub fn new<I, S>(enabled: bool, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_domains: Vec<String> = Vec::new();
        for domain in domains {
            let domain = domain.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !domain.is_empty() && !allowed_domains.contains(&domain) {
                allowed_domains.push(domain);
            }
        }

        Self {
            enabled,
            allowed_domains,
        }
    }

    /// Requests without a referer, or with an empty one, are always allowed. A
    /// referer that is not a URL with a host is refused.
    pub fn allows(&self, referer: Option<&str>) -> bool {
        if !self.enabled {
            return true;
        }
        let referer = match referer.map(str::trim) {
            None | Some("") => return true,
            Some(referer) => referer,
        };

        let host = match url::Url::parse(referer) {
            Ok(url) => match url.host_str() {
                Some(host) => host.to_lowercase(),
                None => return false,
            },
            Err(_) => return false,
        };

        self.allowed_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
    }

    pub fn domains_text(&self) -> String {
        self.allowed_domains.join("\n")
    }
}

#[derive(Debug, Clone, Copy)]
enum MediaKind {
    Original,
    Thumbnail,
}

pub async fn upload_handler(
    State(app_state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    serve_media(&app_state, MediaKind::Original, &filename, &headers).await
}

pub async fn thumbnail_handler(
    State(app_state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    serve_media(&app_state, MediaKind::Thumbnail, &filename, &headers).await
}

async fn serve_media(
    app_state: &AppState,
    kind: MediaKind,
    filename: &str,
    headers: &HeaderMap,
) -> Response {
    // A non UTF-8 referer cannot be parsed and is treated like garbage.
    let referer = headers
        .get(header::REFERER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()));
    let referer = referer.as_deref();

    let allowed = app_state.hotlink.read().await.allows(referer);
    if !allowed {
        warn!(
            filename,
            referer = referer.unwrap_or("-"),
            "Blocked hotlinked media request"
        );
        return StatusCode::FORBIDDEN.into_response();
    }

    if !is_plain_filename(filename) {
        debug!("Rejected media path: {:?}", filename);
        return StatusCode::NOT_FOUND.into_response();
    }

    let storage = &app_state.config.storage;
    let directory = match kind {
        MediaKind::Original => &storage.upload_directory,
        MediaKind::Thumbnail => &storage.thumbnail_directory,
    };

    serve_file(&directory.join(filename)).await
}

/// A single relative path component, no `..`, separators or roots.
pub fn is_plain_filename(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

async fn serve_file(path: &Path) -> Response {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("Media file not found: {:?}: {}", path, e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let metadata = match file.metadata().await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to read metadata for {:?}: {}", path, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    let mut headers = vec![
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_LENGTH, metadata.len().to_string()),
        (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
    ];
    if let Ok(modified) = metadata.modified()
        && modified.duration_since(UNIX_EPOCH).is_ok()
    {
        headers.push((header::LAST_MODIFIED, httpdate::fmt_http_date(modified)));
    }

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = body.into_response();
    for (name, value) in headers {
        match value.parse::<HeaderValue>() {
            Ok(value) => {
                response.headers_mut().insert(name, value);
            }
            Err(_) => warn!("Skipping invalid {} header for {:?}", name, path),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(domains: &[&str]) -> HotlinkPolicy {
        HotlinkPolicy::new(true, domains.iter())
    }

    #[test]
    fn subdomains_of_allowed_domain_pass() {
        let policy = policy(&["example.com"]);
        assert!(policy.allows(Some("https://example.com/gallery")));
        assert!(policy.allows(Some("https://sub.example.com/x")));
        assert!(policy.allows(Some("http://EXAMPLE.com:8080/")));
    }

    #[test]
    fn other_hosts_are_refused() {
        let policy = policy(&["example.com"]);
        assert!(!policy.allows(Some("https://evil.com")));
        assert!(!policy.allows(Some("https://notexample.com/")));
        assert!(!policy.allows(Some("https://example.com.evil.com/")));
    }

    #[test]
    fn missing_referer_is_allowed_and_garbage_refused() {
        let policy = policy(&["example.com"]);
        assert!(policy.allows(None));
        assert!(!policy.allows(Some("not a url")));
        assert!(!policy.allows(Some("/relative/path")));
    }

    #[test]
    fn empty_referer_counts_as_missing() {
        let policy = policy(&["example.com"]);
        assert!(policy.allows(Some("")));
        assert!(policy.allows(Some("   ")));
        assert!(!policy.allows(Some("https://evil.com/")));
    }

    #[test]
    fn disabled_policy_allows_everything() {
        let policy = HotlinkPolicy::new(false, ["example.com"]);
        assert!(policy.allows(Some("https://evil.com")));
    }

    #[test]
    fn domain_entries_are_normalized() {
        let policy = HotlinkPolicy::new(true, "  Example.com \n\n.cdn.net\nexample.com".lines());
        assert_eq!(policy.allowed_domains, vec!["example.com", "cdn.net"]);
        assert_eq!(policy.domains_text(), "example.com\ncdn.net");
    }

    #[test]
    fn plain_filenames_only() {
        assert!(is_plain_filename("photo_20240101_1234.jpg"));
        assert!(!is_plain_filename("../secret.db"));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("/etc/passwd"));
        assert!(!is_plain_filename("nested/photo.jpg"));
        assert!(!is_plain_filename(""));
    }
}
