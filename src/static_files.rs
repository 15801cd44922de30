use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{
    path::{Component, Path, PathBuf},
    time::UNIX_EPOCH,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct StaticFileHandler {
    pub static_dir: PathBuf,
}

/// Only plain relative paths are served; `..`, roots and prefixes are not.
fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn cache_control(content_type: &str, has_version: bool) -> &'static str {
    if has_version {
        "public, max-age=31536000, immutable"
    } else if content_type.starts_with("image/") {
        "public, max-age=31536000"
    } else if content_type.starts_with("text/css")
        || content_type.starts_with("application/javascript")
        || content_type.starts_with("text/javascript")
    {
        "public, max-age=300, must-revalidate"
    } else {
        "public, max-age=3600"
    }
}

impl StaticFileHandler {
    pub fn new(static_dir: PathBuf) -> Self {
        Self { static_dir }
    }

    /// Serve one asset. A `?v=` cache buster on the request makes the
    /// response immutable; a matching `If-None-Match` yields 304.
    pub async fn serve(&self, path: &str, has_version: bool, request_headers: &HeaderMap) -> Response {
        let relative = path.trim_start_matches('/');
        if !is_safe_relative(relative) {
            warn!("Rejected static path: {:?}", path);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
        let file_path = self.static_dir.join(relative);

        debug!("Attempting to serve static file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();

        let mut headers = HeaderMap::new();
        insert_header(&mut headers, header::CONTENT_TYPE, &content_type);
        insert_header(
            &mut headers,
            header::CACHE_CONTROL,
            cache_control(&content_type, has_version),
        );

        let mut etag = None;
        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            insert_header(
                &mut headers,
                header::LAST_MODIFIED,
                &httpdate::fmt_http_date(modified),
            );

            // ETag from modification time and file size
            let tag = format!("\"{}-{}\"", duration.as_secs(), metadata.len());
            insert_header(&mut headers, header::ETAG, &tag);
            etag = Some(tag);
        }

        if let Some(etag) = etag
            && request_headers
                .get(header::IF_NONE_MATCH)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.split(',').any(|candidate| candidate.trim() == etag))
        {
            return (StatusCode::NOT_MODIFIED, headers).into_response();
        }

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };
        insert_header(&mut headers, header::CONTENT_LENGTH, &metadata.len().to_string());

        let body = Body::from_stream(ReaderStream::new(file));
        (StatusCode::OK, headers, body).into_response()
    }
}

fn insert_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => error!("Invalid {} header value {:?}: {}", name, value, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tempfile::TempDir;

    fn handler_with_css() -> (TempDir, StaticFileHandler) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("style.css"), "body { margin: 0; }").unwrap();
        let handler = StaticFileHandler::new(temp_dir.path().to_path_buf());
        (temp_dir, handler)
    }

    #[test]
    fn only_plain_relative_paths() {
        assert!(is_safe_relative("style.css"));
        assert!(is_safe_relative("css/site.css"));
        assert!(!is_safe_relative("../secret.txt"));
        assert!(!is_safe_relative("css/../../secret.txt"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative(""));
    }

    #[tokio::test]
    async fn serves_css_with_cache_headers() {
        let (_temp_dir, handler) = handler_with_css();
        let response = handler.serve("style.css", false, &HeaderMap::new()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=300, must-revalidate"
        );
        assert!(response.headers().contains_key(header::ETAG));
        assert!(response.headers().contains_key(header::LAST_MODIFIED));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"body { margin: 0; }");
    }

    #[tokio::test]
    async fn versioned_requests_are_immutable() {
        let (_temp_dir, handler) = handler_with_css();
        let response = handler.serve("style.css", true, &HeaderMap::new()).await;
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let (_temp_dir, handler) = handler_with_css();
        let first = handler.serve("style.css", false, &HeaderMap::new()).await;
        let etag = first.headers()[header::ETAG].clone();

        let mut request_headers = HeaderMap::new();
        request_headers.insert(header::IF_NONE_MATCH, etag);
        let second = handler.serve("style.css", false, &request_headers).await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn missing_and_traversal_are_not_found() {
        let (_temp_dir, handler) = handler_with_css();
        for path in ["missing.css", "../style.css", ""] {
            let response = handler.serve(path, false, &HeaderMap::new()).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }
}
