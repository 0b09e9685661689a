use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

mod batch;
mod candidate;
mod classify;
mod config;
mod dom;
mod download;
mod extract;
mod models;

use classify::{KeywordSet, LogoClassifier};
use config::Config;
use extract::PageExtractor;
use models::{DownloadAllRequest, DownloadImageRequest, ExtractRequest};

/// Upper bound on a client-requested `max_workers`, unless the configured
/// default is already higher.
const MAX_REQUEST_WORKERS: usize = 32;

#[derive(Clone)]
struct AppState {
    extractor: PageExtractor,
    client: reqwest::Client,
    max_workers: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let client = extract::build_client(config.fetch_timeout, config.insecure_ssl)?;
    let state = AppState {
        extractor: PageExtractor::new(client.clone(), LogoClassifier::new(KeywordSet::default())),
        client,
        max_workers: config.max_workers,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        max_workers = config.max_workers,
        timeout_secs = config.fetch_timeout.as_secs(),
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract_endpoint))
        .route("/download-image", post(download_image_endpoint))
        .route("/download-all", post(download_all_endpoint))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    error_response(rejection.status(), rejection.body_text())
}

fn effective_workers(requested: Option<usize>, configured: usize) -> usize {
    let ceiling = MAX_REQUEST_WORKERS.max(configured);
    requested.unwrap_or(configured).clamp(1, ceiling)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn extract_endpoint(
    State(state): State<AppState>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(rejection),
    };

    let urls = batch::normalize_urls(req.urls.into_vec());
    if urls.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No valid URLs provided");
    }

    let max_workers = effective_workers(req.max_workers, state.max_workers);
    let results = batch::extract_batch(&state.extractor, urls, max_workers).await;
    (StatusCode::OK, Json(results)).into_response()
}

async fn download_image_endpoint(
    State(state): State<AppState>,
    body: Result<Json<DownloadImageRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(rejection),
    };
    let Some(url) = req.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "No URL provided");
    };

    match download::fetch_image(&state.client, url).await {
        Ok(image) => {
            let brand = req.brand_name.as_deref().unwrap_or("logo");
            let index = req.index_label();
            let filename = download::attachment_filename(brand, index.as_deref(), &image.extension);
            let disposition = format!("attachment; filename=\"{}\"", filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, image.content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                image.bytes,
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "error downloading image");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to download image")
        }
    }
}

async fn download_all_endpoint(
    State(state): State<AppState>,
    body: Result<Json<DownloadAllRequest>, JsonRejection>,
) -> Response {
    let logos = match body {
        Ok(Json(logos)) => logos,
        Err(rejection) => return rejection_response(rejection),
    };
    if logos.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No logos provided");
    }

    match download::build_archive(&state.client, &logos, state.max_workers).await {
        Ok(bytes) => {
            let filename = format!("logos_{}.zip", chrono::Local::now().format("%Y%m%d_%H%M%S"));
            let disposition = format!("attachment; filename=\"{}\"", filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "error creating zip");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create zip file")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{HeaderMap, Request};
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_app() -> Router {
        let client = extract::build_client(Duration::from_secs(2), false).unwrap();
        app(AppState {
            extractor: PageExtractor::new(client.clone(), LogoClassifier::default()),
            client,
            max_workers: 5,
        })
    }

    async fn post_json(uri: &str, body: String) -> (StatusCode, HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn requested_workers_are_capped() {
        assert_eq!(effective_workers(None, 5), 5);
        assert_eq!(effective_workers(Some(2), 5), 2);
        assert_eq!(effective_workers(Some(0), 5), 1);
        assert_eq!(effective_workers(Some(10_000), 5), MAX_REQUEST_WORKERS);
        assert_eq!(effective_workers(Some(10_000), 64), 64);
    }

    #[tokio::test]
    async fn extract_rejects_blank_input() {
        let (status, _, body) =
            post_json("/extract", json!({"urls": ["", "   "]}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body), json!({"error": "No valid URLs provided"}));

        let (status, _, _) = post_json("/extract", "{}".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn extract_malformed_body_is_json_error() {
        let (status, _, body) = post_json("/extract", r#"{"urls": 5}"#.to_string()).await;
        assert!(status.is_client_error());
        assert!(json_body(&body)["error"].is_string());
    }

    #[tokio::test]
    async fn extract_returns_every_site_with_worker_override() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/one"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<img alt="Logo" src="/one.png">"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/two"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let base = server.uri();
        let payload = json!({
            "urls": format!("{base}/one\n{base}/two\n{base}/one\n"),
            "max_workers": 1,
        });
        let (status, _, body) = post_json("/extract", payload.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body.as_object().unwrap().len(), 2);
        assert_eq!(body[format!("{base}/one")], json!([format!("{base}/one.png")]));
        assert_eq!(body[format!("{base}/two")], json!([]));
    }

    #[tokio::test]
    async fn download_image_requires_url() {
        let (status, _, body) =
            post_json("/download-image", json!({"brand_name": "Acme"}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body), json!({"error": "No URL provided"}));
    }

    #[tokio::test]
    async fn download_image_fetch_failure_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let payload = json!({"url": format!("{}/missing.png", server.uri())});
        let (status, _, body) = post_json("/download-image", payload.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(&body), json!({"error": "Failed to download image"}));
    }

    #[tokio::test]
    async fn download_image_names_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/mark.svg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/svg+xml")
                    .set_body_bytes(b"<svg/>".to_vec()),
            )
            .mount(&server)
            .await;

        let payload = json!({
            "url": format!("{}/img/mark.svg", server.uri()),
            "brand_name": "Acme Co",
            "index": 2,
        });
        let (status, headers, body) = post_json("/download-image", payload.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Acme Co-2.svg\""
        );
        assert_eq!(body, b"<svg/>");
    }

    #[tokio::test]
    async fn download_all_rejects_empty_mapping() {
        let (status, _, body) = post_json("/download-all", "{}".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body), json!({"error": "No logos provided"}));
    }

    #[tokio::test]
    async fn download_all_streams_zip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;

        let payload = json!({"acme.test": [format!("{}/logo.png", server.uri())]});
        let (status, headers, body) = post_json("/download-all", payload.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"logos_"));
        assert!(disposition.ends_with(".zip\""));

        let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, vec!["acme_test/logo.png"]);
        assert_eq!(archive.len(), 1);
    }
}
