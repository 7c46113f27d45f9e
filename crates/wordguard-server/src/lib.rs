//! WordGuard Server - HTTP guard API.
//!
//! This crate exposes a [`SensitiveWordDetector`](wordguard_core::SensitiveWordDetector)
//! over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /api/check` - Scan one text
//! - `POST /api/check/batch` - Scan several texts
//! - `POST /api/safe` - Return whether a text may be forwarded to a model
//! - `GET /api/words` - List active terms
//! - `POST /api/words` - Add a term
//! - `DELETE /api/words/{word}` - Remove a term
//! - `GET /api/health` - Liveness probe
//!
//! ## Example
//!
//! ```no_run
//! use wordguard_server::{AppState, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::with_default_words().unwrap();
//!     let server = Server::with_state(ServerConfig::default(), state).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::routing::{delete, get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 48780;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 48780).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router over `state`.
pub fn build_router(state: AppState) -> Router {
    // Browser clients call the guard directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/check", post(handlers::check_text))
        .route("/api/check/batch", post(handlers::check_batch))
        .route("/api/safe", post(handlers::check_safe))
        .route("/api/words", get(handlers::list_words).post(handlers::add_word))
        .route("/api/words/{word}", delete(handlers::remove_word))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server over the given application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let router = build_router(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting WordGuard API server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Allow rebinding while old sockets sit in TIME_WAIT
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wordguard_core::{DetectorConfig, SensitiveWordDetector, Term};

    fn create_test_app() -> Router {
        build_router(AppState::with_default_words().unwrap())
    }

    fn app_with(config: DetectorConfig, words: &[&str]) -> Router {
        let detector =
            SensitiveWordDetector::with_terms(config, words.iter().map(|w| Term::new(*w)))
                .unwrap();
        build_router(AppState::new(Arc::new(detector)))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Extractor rejections come back as plain text
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    // === Check ===

    #[tokio::test]
    async fn test_check_safe_text() {
        let (status, json) = send(
            create_test_app(),
            "POST",
            "/api/check",
            Some(json!({"text": "今天天气很好"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_safe"], true);
        assert_eq!(json["risk_level"], "safe");
        assert!(json["latency_us"].is_number());
    }

    #[tokio::test]
    async fn test_check_flagged_text() {
        let (status, json) = send(
            create_test_app(),
            "POST",
            "/api/check",
            Some(json!({"text": "这是一个测试文本"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_safe"], false);
        let terms = json["matched_terms"].as_array().unwrap();
        assert!(terms.iter().any(|t| t == "测试"));
    }

    #[tokio::test]
    async fn test_check_input_too_large() {
        let app = app_with(DetectorConfig::default().with_max_input_chars(3), &["ab"]);
        let (status, json) = send(app, "POST", "/api/check", Some(json!({"text": "abcdef"}))).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["code"], "input_too_large");
    }

    #[tokio::test]
    async fn test_check_rejects_malformed_body() {
        let (status, _) = send(
            create_test_app(),
            "POST",
            "/api/check",
            Some(json!({"prompt": "wrong field"})),
        )
        .await;

        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_check_batch_keeps_order() {
        let (status, json) = send(
            create_test_app(),
            "POST",
            "/api/check/batch",
            Some(json!({"texts": ["今天天气很好", "这是一个测试文本"]})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["is_safe"], true);
        assert_eq!(results[1]["is_safe"], false);
    }

    #[tokio::test]
    async fn test_check_batch_limit() {
        let state = AppState::with_default_words().unwrap().with_max_batch_size(1);
        let (status, json) = send(
            build_router(state),
            "POST",
            "/api/check/batch",
            Some(json!({"texts": ["a", "b"]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_safe_endpoint() {
        let app = create_test_app();
        let (_, json) = send(
            app.clone(),
            "POST",
            "/api/safe",
            Some(json!({"text": "今天天气很好"})),
        )
        .await;
        assert_eq!(json["safe"], true);

        let (_, json) = send(app, "POST", "/api/safe", Some(json!({"text": "这是一个测试文本"}))).await;
        assert_eq!(json["safe"], false);
    }

    #[tokio::test]
    async fn test_unloaded_detector_is_unavailable() {
        let detector =
            SensitiveWordDetector::unloaded(DetectorConfig::default().with_require_loaded(true))
                .unwrap();
        let app = build_router(AppState::new(Arc::new(detector)));

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/check",
            Some(json!({"text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["code"], "empty_detector");

        let (_, json) = send(app, "POST", "/api/safe", Some(json!({"text": "hello"}))).await;
        assert_eq!(json["safe"], false);
    }

    // === Words ===

    #[tokio::test]
    async fn test_word_lifecycle() {
        let app = app_with(DetectorConfig::default(), &["alpha"]);

        let (status, json) = send(app.clone(), "POST", "/api/words", Some(json!({"word": "新敏感词"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["added"], true);
        assert_eq!(json["count"], 2);

        let (_, json) = send(
            app.clone(),
            "POST",
            "/api/check",
            Some(json!({"text": "含有新敏感词的句子"})),
        )
        .await;
        assert_eq!(json["is_safe"], false);

        let (_, json) = send(app.clone(), "GET", "/api/words", None).await;
        assert_eq!(json["count"], 2);
        assert_eq!(json["words"], json!(["alpha", "新敏感词"]));

        let (status, json) = send(
            app.clone(),
            "DELETE",
            "/api/words/%E6%96%B0%E6%95%8F%E6%84%9F%E8%AF%8D",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed"], true);
        assert_eq!(json["count"], 1);

        let (_, json) = send(
            app,
            "POST",
            "/api/check",
            Some(json!({"text": "含有新敏感词的句子"})),
        )
        .await;
        assert_eq!(json["is_safe"], true);
    }

    #[tokio::test]
    async fn test_add_duplicate_and_remove_missing() {
        let app = app_with(DetectorConfig::default(), &["alpha"]);

        let (_, json) = send(app.clone(), "POST", "/api/words", Some(json!({"word": "ALPHA"}))).await;
        assert_eq!(json["added"], false);
        assert_eq!(json["count"], 1);

        let (status, json) = send(app, "DELETE", "/api/words/missing", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed"], false);
    }

    #[tokio::test]
    async fn test_add_blank_word_is_noop() {
        let app = app_with(DetectorConfig::default(), &["赌博"]);
        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/words",
            Some(json!({"word": "   "})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["added"], false);
        assert_eq!(json["count"], 1);

        let (_, json) = send(app, "GET", "/api/words", None).await;
        assert_eq!(json["words"], json!(["赌博"]));
    }

    #[tokio::test]
    async fn test_add_word_rebuild_failure() {
        let app = app_with(DetectorConfig::default().with_max_terms(1), &["alpha"]);

        let (status, json) = send(app.clone(), "POST", "/api/words", Some(json!({"word": "beta"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "rebuild_failed");

        let (_, json) = send(app, "GET", "/api/words", None).await;
        assert_eq!(json["words"], json!(["alpha"]));
    }

    // === Health ===

    #[tokio::test]
    async fn test_health() {
        let (status, json) = send(create_test_app(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["words"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_server_addr_from_config() {
        let state = AppState::with_default_words().unwrap();
        let server = Server::with_state(ServerConfig::default().with_port(9999), state).unwrap();
        assert_eq!(server.addr().port(), 9999);
        assert!(server.addr().ip().is_loopback());
    }

    #[test]
    fn test_invalid_host_rejected() {
        let state = AppState::with_default_words().unwrap();
        let result = Server::with_state(ServerConfig::default().with_host("not a host"), state);
        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }
}
