mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use serde_json::Value;

use common::{cookie_header, spawn};

fn forwarded_for(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

fn feed_ids(page: &Value) -> Vec<i64> {
    page["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_home_renders_announcement_markdown() {
    let app = spawn().await;

    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let html = response.text();
    assert!(html.contains("<h1>Welcome to the Wallpaper Gallery</h1>"));
    assert!(html.contains("<title>Home - Wallpaper Gallery</title>"));
}

#[tokio::test]
async fn test_gallery_page_shows_first_batch_and_assigns_seed() {
    let app = spawn().await;
    app.seed_images(30, &[]);

    let response = app.server.get("/gallery").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(!response.cookie("session").value().is_empty());

    let html = response.text();
    assert_eq!(html.matches("class=\"card\"").count(), 24);
    assert!(html.contains("data-next-offset=\"24\""));
    assert!(html.contains("data-has-more=\"true\""));
}

#[tokio::test]
async fn test_load_more_final_partial_batch() {
    let app = spawn().await;
    app.seed_images(30, &[]);

    let first = app.server.get("/gallery").await;
    let cookie = cookie_header(&first, "session");

    let response = app
        .server
        .get("/api/gallery/load-more?offset=24&limit=12")
        .add_header(header::COOKIE, cookie)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let page: Value = response.json();
    assert_eq!(page["images"].as_array().unwrap().len(), 6);
    assert_eq!(page["has_more"], false);
}

#[tokio::test]
async fn test_load_more_full_batch_with_more_left() {
    let app = spawn().await;
    app.seed_images(50, &[]);

    let page: Value = app
        .server
        .get("/api/gallery/load-more?offset=24&limit=12")
        .await
        .json();
    assert_eq!(page["images"].as_array().unwrap().len(), 12);
    assert_eq!(page["has_more"], true);

    let entry = &page["images"][0];
    assert!(entry["thumbnail"].as_str().unwrap().starts_with("/thumbnails/thumb_seed_"));
    assert!(entry["url"].as_str().unwrap().starts_with("/image/"));
}

#[tokio::test]
async fn test_session_keeps_a_stable_order() {
    let app = spawn().await;
    app.seed_images(40, &[]);

    let first = app.server.get("/api/gallery/load-more?offset=0&limit=12").await;
    let cookie = cookie_header(&first, "session");
    let first_ids = feed_ids(&first.json());

    let again: Value = app
        .server
        .get("/api/gallery/load-more?offset=0&limit=12")
        .add_header(header::COOKIE, cookie.clone())
        .await
        .json();
    assert_eq!(feed_ids(&again), first_ids);

    let mut seen = first_ids;
    let mut offset = 12;
    loop {
        let page: Value = app
            .server
            .get(&format!("/api/gallery/load-more?offset={offset}&limit=12"))
            .add_header(header::COOKIE, cookie.clone())
            .await
            .json();
        seen.extend(feed_ids(&page));
        offset += 12;
        if page["has_more"] == false {
            break;
        }
    }

    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 40);
}

#[tokio::test]
async fn test_like_toggles_per_client() {
    let app = spawn().await;
    let id = app.seed_images(1, &[])[0];
    let (name, first_ip) = forwarded_for("203.0.113.5");
    let (_, second_ip) = forwarded_for("198.51.100.7");

    let liked: Value = app
        .server
        .post(&format!("/api/like/{id}"))
        .add_header(name.clone(), first_ip.clone())
        .await
        .json();
    assert_eq!(liked["success"], true);
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["like_count"], 1);

    let other: Value = app
        .server
        .post(&format!("/api/like/{id}"))
        .add_header(name.clone(), second_ip)
        .await
        .json();
    assert_eq!(other["liked"], true);
    assert_eq!(other["like_count"], 2);

    let unliked: Value = app
        .server
        .post(&format!("/api/like/{id}"))
        .add_header(name, first_ip)
        .await
        .json();
    assert_eq!(unliked["liked"], false);
    assert_eq!(unliked["like_count"], 1);
}

#[tokio::test]
async fn test_like_missing_image_is_not_found() {
    let app = spawn().await;
    let response = app.server.post("/api/like/9999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detail_counts_views() {
    let app = spawn().await;
    let id = app.seed_images(1, &["night"])[0];

    let response = app.server.get(&format!("/image/{id}")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Seed 0"));
    assert!(html.contains("night"));

    app.server.get(&format!("/image/{id}")).await;
    let image = app.database().get_image(id).unwrap().unwrap();
    assert_eq!(image.views, 2);

    for missing in ["/image/9999", "/image/not-a-number"] {
        let response = app.server.get(missing).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{missing}");
    }
}

#[tokio::test]
async fn test_filter_by_tag() {
    let app = spawn().await;
    app.seed_images(2, &["sky"]);
    app.seed_images(3, &["sea"]);

    let tags = app.database().list_tags().unwrap();
    let sky = tags.iter().find(|tag| tag.name == "sky").unwrap();
    let sea = tags.iter().find(|tag| tag.name == "sea").unwrap();

    let html = app
        .server
        .get(&format!("/filter?tags={}", sky.id))
        .await
        .text();
    assert!(html.contains("2 images"));

    let html = app
        .server
        .get(&format!("/filter?tags={}&tags={}&sort=likes", sky.id, sea.id))
        .await
        .text();
    assert!(html.contains("5 images"));
    assert!(html.contains("value=\"likes\" selected"));
}

#[tokio::test]
async fn test_filter_by_unused_tag_is_empty() {
    let app = spawn().await;
    let id = app.seed_images(1, &["lonely"])[0];
    let db = app.database();
    db.update_image(id, None, None, &[]).unwrap();
    let lonely = db.list_tags().unwrap().remove(0);
    assert_eq!(lonely.image_count, 0);

    let response = app.server.get(&format!("/filter?tags={}", lonely.id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("0 images"));
    assert!(!html.contains("class=\"card\""));
}

#[tokio::test]
async fn test_filter_huge_page_is_empty() {
    let app = spawn().await;
    app.seed_images(13, &[]);

    for page in ["1000000000000000000", "9223372036854775807"] {
        let response = app.server.get(&format!("/filter?page={page}")).await;
        assert_eq!(response.status_code(), StatusCode::OK, "{page}");
        let html = response.text();
        assert!(html.contains("13 images"), "{page}");
        assert!(!html.contains("class=\"card\""), "{page}");
    }
}

#[tokio::test]
async fn test_hotlink_protection_on_media() {
    let app = spawn().await;
    app.seed_images(1, &[]);
    let image = app.database().recent_images(1).unwrap().remove(0);
    let upload = format!("/uploads/{}", image.filename);
    let thumbnail = format!("/thumbnails/{}", image.thumbnail);

    let direct = app.server.get(&upload).await;
    assert_eq!(direct.status_code(), StatusCode::OK);
    assert_eq!(direct.header("content-type"), "image/jpeg");

    let local = app
        .server
        .get(&upload)
        .add_header(header::REFERER, HeaderValue::from_static("http://localhost:3000/gallery"))
        .await;
    assert_eq!(local.status_code(), StatusCode::OK);

    let blank = app
        .server
        .get(&thumbnail)
        .add_header(header::REFERER, HeaderValue::from_static(""))
        .await;
    assert_eq!(blank.status_code(), StatusCode::OK);

    for path in [&upload, &thumbnail] {
        let response = app
            .server
            .get(path)
            .add_header(header::REFERER, HeaderValue::from_static("https://evil.com/page"))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{path}");
        assert!(response.as_bytes().is_empty());
    }
}

#[tokio::test]
async fn test_media_rejects_traversal_and_missing_files() {
    let app = spawn().await;

    for path in ["/uploads/..%2Fdata%2Ftest.db", "/thumbnails/missing.jpg"] {
        let response = app.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let app = spawn().await;

    let response = app.server.get("/static/style.css").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "text/css");

    let response = app.server.get("/static/gallery.js?v=1").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header("cache-control"),
        "public, max-age=31536000, immutable"
    );
}

#[tokio::test]
async fn test_feed_script_advances_by_batch_size() {
    let app = spawn().await;
    app.seed_images(30, &[]);

    let gallery = app.server.get("/gallery").await.text();
    assert!(gallery.contains("data-next-offset=\"24\""));
    assert!(gallery.contains("data-batch-size=\"12\""));

    let script = app.server.get("/static/gallery.js").await.text();
    assert!(script.contains("offset += limit;"));
    assert!(!script.contains("offset += page.images.length"));
}
