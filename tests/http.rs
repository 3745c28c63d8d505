use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use std::io::Read;
use std::path::{Path, PathBuf};
use stowage::prelude::*;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    storage: LocalFileStore,
    root: PathBuf,
    _temp: TempDir,
}

impl TestApp {
    fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    fn archive_root(&self) -> PathBuf {
        self.root.join("archives")
    }
}

fn setup() -> TestApp {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();

    let theme = root.join("themes/casper");
    std::fs::create_dir_all(theme.join("assets")).unwrap();
    std::fs::write(theme.join("package.json"), br#"{"name":"casper"}"#).unwrap();
    std::fs::write(theme.join("assets/screen.css"), b"body { color: red }").unwrap();

    let config = StorageConfig::new(root.join("themes"))
        .with_url_prefix("/content")
        .with_category("images", root.join("images"), "images")
        .with_category("documents", root.join("documents"), "files")
        .with_archive_tmp_dir(root.join("archives"));

    let storage = LocalFileStore::new(config);
    let app = StowageServer::new().build(storage.clone()).unwrap();

    TestApp {
        app,
        storage,
        root,
        _temp: temp,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[tokio::test]
async fn serves_stored_files_with_long_cache() {
    let test = setup();
    let dir = test.images().join("2024/05");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("photo.jpg"), b"jpeg bytes").unwrap();

    let (status, headers, body) = send(&test.app, get("/content/images/2024/05/photo.jpg")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"jpeg bytes");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        format!("public, max-age={ONE_YEAR_SECS}").as_str()
    );
}

#[tokio::test]
async fn missing_files_are_a_hard_404() {
    let test = setup();
    std::fs::create_dir_all(test.images()).unwrap();

    let (status, headers, _) = send(&test.app, get("/content/images/2024/05/nope.jpg")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get(header::CACHE_CONTROL).is_none());

    let (status, _, _) = send(&test.app, get("/content/images/../../etc/passwd")).await;
    assert_ne!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_then_serve_then_delete() {
    let test = setup();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/uploads/images?filename=photo.jpg")
        .body(Body::from("first"))
        .unwrap();
    let (status, _, body) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::CREATED);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let url = json["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/content/images/"));
    assert!(url.ends_with("/photo.jpg"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/uploads/images?filename=photo.jpg")
        .body(Body::from("second"))
        .unwrap();
    let (_, _, body) = send(&test.app, request).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let second = json["url"].as_str().unwrap().to_string();
    assert!(second.ends_with("/photo-1.jpg"));

    let (status, _, body) = send(&test.app, get(&url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"first");

    let relative = url.trim_start_matches("/content/images/");
    assert!(test.storage.exists(&test.images().join(relative)).await);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/uploads/images/{relative}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!test.storage.exists(&test.images().join(relative)).await);

    let (status, _, _) = send(&test.app, get(&url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_of_missing_file_succeeds() {
    let test = setup();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/uploads/images/2024/05/never.jpg")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn upload_to_unknown_category_is_rejected() {
    let test = setup();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/uploads/videos?filename=clip.mp4")
        .body(Body::from("data"))
        .unwrap();

    let (status, _, body) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("clip.mp4"));
}

#[tokio::test]
async fn theme_download_streams_zip_and_cleans_up() {
    let test = setup();

    let (status, headers, body) = send(&test.app, get("/themes/casper/download")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"casper.zip\""
    );
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        body.len().to_string().as_str()
    );

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(body)).unwrap();
    let mut css = String::new();
    archive
        .by_name("assets/screen.css")
        .unwrap()
        .read_to_string(&mut css)
        .unwrap();
    assert_eq!(css, "body { color: red }");

    assert!(dir_is_empty(&test.archive_root()));
}

#[tokio::test]
async fn failed_theme_download_cleans_up() {
    let test = setup();

    let (status, _, body) = send(&test.app, get("/themes/ghost/download")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    assert!(dir_is_empty(&test.archive_root()));
}

#[tokio::test]
async fn abandoned_theme_download_cleans_up() {
    let test = setup();

    let response = test
        .app
        .clone()
        .oneshot(get("/themes/casper/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!dir_is_empty(&test.archive_root()));

    drop(response);
    assert!(dir_is_empty(&test.archive_root()));
}

#[tokio::test]
async fn theme_router_from_serve_options() {
    let test = setup();
    let app = test.storage.serve(ServeOptions::theme("casper")).unwrap();

    let (status, headers, body) = send(&app, get("/anything")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert!(body.starts_with(b"PK"));
    assert!(dir_is_empty(&test.archive_root()));
}

#[tokio::test]
async fn theme_names_that_break_headers_are_404() {
    let test = setup();
    std::fs::create_dir_all(test.root.join("themes/a\"b")).unwrap();

    let (status, headers, body) = send(&test.app, get("/themes/a%22b/download")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
    assert!(body.is_empty());
    assert!(dir_is_empty(&test.archive_root()));
}

#[tokio::test]
async fn mounts_follow_the_backend_configuration() {
    let temp = TempDir::new().unwrap();
    let config = StorageConfig::new(temp.path().join("themes"))
        .with_url_prefix("/blog/")
        .with_category("images", temp.path().join("images"), "/pics/");
    let storage = LocalFileStore::new(config);
    let app = StowageServer::new().build(storage.clone()).unwrap();

    let upload = Request::builder()
        .method(Method::POST)
        .uri("/uploads/images?filename=photo.jpg")
        .body(Body::from("jpeg"))
        .unwrap();
    let (status, _, body) = send(&app, upload).await;
    assert_eq!(status, StatusCode::CREATED);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let url = json["url"].as_str().unwrap();
    assert!(url.starts_with("/blog/pics/"));

    let (status, _, body) = send(&app, get(url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"jpeg");
}

#[test]
fn build_rejects_categories_without_a_url_segment() {
    let temp = TempDir::new().unwrap();
    let config = StorageConfig::new(temp.path().join("themes"))
        .with_category("images", temp.path().join("images"), "/");

    let err = StowageServer::new()
        .build(LocalFileStore::new(config))
        .unwrap_err();

    assert!(matches!(err, StorageError::IncorrectUsage(_)));
}
