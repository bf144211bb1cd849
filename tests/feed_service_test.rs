//! Router-level tests for the feed service
//!
//! Exercises upload, fetch and download through the HTTP surface.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use catalog_services::api;
use catalog_services::config::{FeedConfig, FetchConfig};
use catalog_services::feed::mapper::{ITEM_CONDITION, PLACEHOLDER_TITLE};
use catalog_services::services::{FeedService, SourceAcquirer, WorkingStorage};
use common::{body_bytes, body_json, get_request, is_empty_dir, multipart_request, Part};
use mockito::Server;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const CATALOG: &[u8] = r#"<?xml version="1.0" encoding="UTF-8"?>
<yml_catalog>
  <shop>
    <items>
      <item>
        <id>7</id>
        <name></name>
        <description></description>
        <url>http://x/7</url>
        <image></image>
        <priceRUAH>120 UAH</priceRUAH>
        <stock>5</stock>
      </item>
      <item>
        <id>8</id>
        <name>Lamp</name>
      </item>
    </items>
  </shop>
</yml_catalog>"#
    .as_bytes();

fn feed_config() -> FeedConfig {
    FeedConfig {
        namespace: "http://base.google.com/ns/1.0".to_string(),
        title: "Test Shop".to_string(),
        link: "https://shop.example".to_string(),
        description: "Everything we sell".to_string(),
        default_item_description: "Default description".to_string(),
    }
}

async fn setup() -> (Router, WorkingStorage, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage = WorkingStorage::new(
        temp_dir.path().join("uploads"),
        temp_dir.path().join("transformed"),
    );
    storage.bootstrap().await.expect("Failed to bootstrap storage");

    let acquirer = SourceAcquirer::new(&FetchConfig {
        timeout: Duration::from_secs(5),
        retries: 0,
    })
    .expect("Failed to create acquirer");
    let service = Arc::new(FeedService::new(feed_config(), storage.clone(), acquirer));

    (api::feed_router(service), storage, temp_dir)
}

fn fetch_request(url: Option<&str>) -> Request<Body> {
    let body = match url {
        Some(url) => format!("url={}", url),
        None => String::new(),
    };
    Request::builder()
        .method("POST")
        .uri("/fetch")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("Failed to build request")
}

#[tokio::test]
async fn test_upload_then_download() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload",
            &[Part::File {
                field: "file",
                filename: "catalog.xml",
                bytes: CATALOG,
            }],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["message"], "File transformed successfully!");
    assert_eq!(body["items"], 2);
    let download_url = body["download_url"].as_str().unwrap().to_string();
    assert!(download_url.starts_with("/download/converted-"));

    let response = app.oneshot(get_request(&download_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));

    let xml = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(xml.contains("<rss xmlns:g=\"http://base.google.com/ns/1.0\" version=\"2.0\">"));
    assert!(xml.contains("<title>Test Shop</title>"));
    assert!(xml.contains("<g:id>7</g:id>"));
    assert!(xml.contains(&format!("<g:title>{}</g:title>", PLACEHOLDER_TITLE)));
    assert!(xml.contains("<g:description>Default description</g:description>"));
    assert!(xml.contains("<g:link>http://x/7</g:link>"));
    assert!(xml.contains("<g:image_link>#</g:image_link>"));
    assert!(xml.contains("<g:price>120 UAH</g:price>"));
    assert!(xml.contains("<g:availability>5</g:availability>"));
    assert!(xml.contains(&format!("<g:condition>{}</g:condition>", ITEM_CONDITION)));
    assert!(xml.find("<g:id>7</g:id>").unwrap() < xml.find("<g:id>8</g:id>").unwrap());
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app
        .oneshot(multipart_request(
            "/upload",
            &[Part::Text {
                field: "note",
                value: "no file here",
            }],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"], "input_missing");
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app
        .oneshot(multipart_request(
            "/upload",
            &[Part::File {
                field: "file",
                filename: "",
                bytes: CATALOG,
            }],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "No selected file");
}

#[tokio::test]
async fn test_upload_malformed_xml() {
    let (app, storage, _temp_dir) = setup().await;

    let response = app
        .oneshot(multipart_request(
            "/upload",
            &[Part::File {
                field: "file",
                filename: "broken.xml",
                bytes: b"<catalog><item><id>1</id>",
            }],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["reason"], "parse_failed");
    assert!(is_empty_dir(storage.outbound_root()));
}

#[tokio::test]
async fn test_fetch_without_url() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app.oneshot(fetch_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No URL provided");
}

#[tokio::test]
async fn test_fetch_with_empty_body() {
    let (app, _storage, _temp_dir) = setup().await;

    let request = Request::builder()
        .method("POST")
        .uri("/fetch")
        .body(Body::empty())
        .expect("Failed to build request");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["reason"], "input_missing");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_forbidden_characters_never_reach_the_feed() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload",
            &[Part::File {
                field: "file",
                filename: "catalog.xml",
                bytes: b"<c><item><id>&#1;</id></item><item><id>2</id></item></c>",
            }],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"], 1);
    assert_eq!(body["skipped"][0]["position"], 1);

    let download_url = body["download_url"].as_str().unwrap().to_string();
    let xml = body_bytes(app.oneshot(get_request(&download_url)).await.unwrap()).await;
    assert!(!xml.contains(&0x01));
    assert!(String::from_utf8(xml).unwrap().contains("<g:id>2</g:id>"));
}

#[tokio::test]
async fn test_windows_1251_catalog() {
    let (app, _storage, _temp_dir) = setup().await;

    let mut catalog =
        b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><c><item><id>1</id><name>".to_vec();
    catalog.extend_from_slice(&[0xCB, 0xE0, 0xEC, 0xEF, 0xE0]);
    catalog.extend_from_slice(b"</name></item></c>");

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload",
            &[Part::File {
                field: "file",
                filename: "catalog.xml",
                bytes: &catalog,
            }],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"], 1);
    let download_url = body["download_url"].as_str().unwrap().to_string();
    let xml = String::from_utf8(body_bytes(app.oneshot(get_request(&download_url)).await.unwrap()).await)
        .unwrap();
    assert!(xml.contains("<g:title>Лампа</g:title>"));
}

#[tokio::test]
#[serial]
async fn test_fetch_success() {
    let (app, _storage, _temp_dir) = setup().await;
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/catalog.xml")
        .with_status(200)
        .with_header("content-type", "application/xml")
        .with_body(CATALOG)
        .create_async()
        .await;

    let url = format!("{}/catalog.xml", server.url());
    let response = app.oneshot(fetch_request(Some(&url))).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["items"], 2);
    assert_eq!(body["skipped"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[serial]
async fn test_fetch_not_found_writes_nothing() {
    let (app, storage, _temp_dir) = setup().await;
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/gone.xml")
        .with_status(404)
        .create_async()
        .await;

    let url = format!("{}/gone.xml", server.url());
    let response = app.oneshot(fetch_request(Some(&url))).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["reason"], "fetch_failed");
    assert!(body["error"].as_str().unwrap().contains("HTTP 404"));
    assert!(is_empty_dir(storage.outbound_root()));
}

#[tokio::test]
#[serial]
async fn test_fetch_malformed_xml() {
    let (app, storage, _temp_dir) = setup().await;
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/bad.xml")
        .with_status(200)
        .with_body("this is not xml")
        .create_async()
        .await;

    let url = format!("{}/bad.xml", server.url());
    let response = app.oneshot(fetch_request(Some(&url))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["reason"], "parse_failed");
    assert!(is_empty_dir(storage.outbound_root()));
}

#[tokio::test]
async fn test_download_missing_and_invalid() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app
        .clone()
        .oneshot(get_request("/download/converted.xml"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get_request("/download/..%2Fsecret.xml"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_without_items() {
    let (app, _storage, _temp_dir) = setup().await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload",
            &[Part::File {
                field: "file",
                filename: "empty.xml",
                bytes: b"<catalog><product><id>1</id></product></catalog>",
            }],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"], 0);

    let download_url = body["download_url"].as_str().unwrap().to_string();
    let xml = String::from_utf8(body_bytes(app.oneshot(get_request(&download_url)).await.unwrap()).await)
        .unwrap();
    assert!(xml.contains("<description>Everything we sell</description>"));
    assert!(!xml.contains("<item>"));
}

#[tokio::test]
async fn test_health_through_middleware_stack() {
    let (app, _storage, _temp_dir) = setup().await;
    let app = catalog_services::server::with_layers(app, 1024);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["service"], "feed");
}
