//! HTTP server for status, health and metrics endpoints
//!
//! - GET /status  - pending queue and finalized history (JSON)
//! - GET /health  - liveness
//! - GET /metrics - Prometheus metrics
//!
//! Responses carry CORS headers for one configured origin; pre-flight
//! requests on any path get an empty 204.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use eyre::{eyre, WrapErr};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tracing::{info, warn};

use crate::metrics;
use crate::store::Store;
use crate::types::{FinalizedItem, PendingItem};

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub cors_origin: HeaderValue,
}

/// Status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub pending: Vec<PendingItem>,
    pub finalized: Vec<FinalizedItem>,
}

/// Current queue and history, read fresh from disk
async fn status(State(state): State<AppState>) -> Response {
    let pending = state.store.load_pending().await;
    let finalized = state.store.load_finalized().await;

    match (pending, finalized) {
        (Ok(pending), Ok(finalized)) => Json(StatusResponse { pending, finalized }).into_response(),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to read relayer state");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Liveness probe (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Prometheus metrics endpoint
async fn prometheus_metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    match Response::builder()
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback(method: Method) -> StatusCode {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn add_cors_headers(State(state): State<AppState>, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, state.cors_origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status).options(preflight))
        .route("/health", get(liveness).options(preflight))
        .route("/metrics", get(prometheus_metrics).options(preflight))
        .fallback(fallback)
        .layer(middleware::map_response_with_state(
            state.clone(),
            add_cors_headers,
        ))
        .with_state(state)
}

/// Start the status server
pub async fn start_server(
    bind_address: &str,
    port: u16,
    store: Store,
    cors_origin: &str,
) -> eyre::Result<()> {
    let cors_origin = HeaderValue::from_str(cors_origin)
        .map_err(|e| eyre!("Invalid CORS origin {}: {}", cors_origin, e))?;
    let app = router(AppState { store, cors_origin });

    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .map_err(|e| eyre!("Invalid bind address {}:{}: {}", bind_address, port, e))?;
    info!("Status server listening on {}", addr);
    info!("  /status  - Pending and finalized items (JSON)");
    info!("  /metrics - Prometheus metrics");

    metrics::UP.set(1.0);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(dir: &tempfile::TempDir) -> (Router, Store) {
        let store = Store::new(dir.path(), 50);
        let state = AppState {
            store: store.clone(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
        };
        (router(state), store)
    }

    #[tokio::test]
    async fn test_status_lists_pending_and_finalized() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = app(&dir);
        let item = PendingItem::new("0x01", Action::Deposit, "3");
        store.save_pending(&[item.clone()]).await.unwrap();
        store
            .save_finalized(&[FinalizedItem::from_pending(
                &PendingItem::new("0x02", Action::Unknown, "0"),
                Some("0xff".to_string()),
            )])
            .await
            .unwrap();

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["pending"][0]["hash"], "0x01");
        assert_eq!(json["pending"][0]["action"], "Deposit");
        assert_eq!(json["finalized"][0]["sourceHash"], "0x02");
        assert_eq!(json["finalized"][0]["destinationHash"], "0xff");
    }

    #[tokio::test]
    async fn test_status_on_first_run_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&dir);

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["pending"], serde_json::json!([]));
        assert_eq!(json["finalized"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_preflight_any_path() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&dir);

        for uri in ["/status", "/anything/else"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::OPTIONS)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert!(response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(&dir);
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
