#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use rust_cdn_backend::config::CdnConfig;
use rust_cdn_backend::infrastructure::storage::setup_storage;
use rust_cdn_backend::services::mime::MimeRegistry;
use rust_cdn_backend::{AppState, create_app};
use std::io::Cursor;
use tempfile::TempDir;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// App backed by a fresh local store in a temporary directory.
pub async fn local_app(configure: impl FnOnce(&mut CdnConfig)) -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CdnConfig::with_storage_root(dir.path().join("objects"));
    configure(&mut config);

    let storage = setup_storage(&config).await.unwrap();
    let state = AppState::new(config, storage, MimeRegistry::standard());
    (create_app(state), dir)
}

/// Builds a multipart body with one file part per `(field, filename, content)`.
pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, content) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Host", "cdn.test")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Path part of a returned URL, e.g. `/files/<key>`.
pub fn url_path(url: &str) -> &str {
    let rest = url
        .strip_prefix("http://cdn.test")
        .unwrap_or_else(|| panic!("unexpected url {}", url));
    rest
}

pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 20) as u8, (y * 20) as u8, 128, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Names in the storage root that are visible objects (not dot-prefixed).
pub fn visible_objects(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path().join("objects"))
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect()
}
