//! SketchCast proxy server
//!
//! Forwards browser requests to the streaming provider so the page never hits
//! cross-origin restrictions and never holds the API key.
//!
//! ## Routes
//!
//! - `GET /api/stream?streamId=<id>`: stream status, passed through as JSON
//! - `POST /api/streams/<id>/prompts`: prompt update, `{ "params": ... }`
//! - `GET /health`
//!
//! Failures answer `{ "error": ... }` with the upstream status, or 500 when
//! the upstream could not be reached. Both calls go through the core
//! [`StreamApi`] on a blocking thread.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use sketchcast_core::api::{ApiConfig, ApiError, PromptParams, StatusEndpoint, StreamApi};
use sketchcast_core::transport::{BoxFuture, UreqTransport};
use std::{net::SocketAddr, rc::Rc, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const DEFAULT_ADDR: &str = "0.0.0.0:3030";
const DEFAULT_STATUS_UPSTREAM: &str = "https://daydream.live/api/streams";
const DEFAULT_PROMPT_BASE: &str = "https://api.daydream.live/beta";

/// Server configuration, read from `SKETCHCAST_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
struct ServerConfig {
    addr: SocketAddr,
    api: ApiConfig,
}

impl ServerConfig {
    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let addr = lookup("SKETCHCAST_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .map_err(|e| format!("Invalid SKETCHCAST_ADDR {:?}: {}", addr, e))?;
        let api = ApiConfig {
            status: StatusEndpoint::Direct {
                base: lookup("SKETCHCAST_STATUS_UPSTREAM")
                    .unwrap_or_else(|| DEFAULT_STATUS_UPSTREAM.to_string()),
            },
            prompt_base: lookup("SKETCHCAST_PROMPT_BASE")
                .unwrap_or_else(|| DEFAULT_PROMPT_BASE.to_string()),
            api_key: lookup("SKETCHCAST_API_KEY").filter(|key| !key.is_empty()),
            ..ApiConfig::default()
        };
        Ok(Self { addr, api })
    }
}

/// Shared application state
struct AppState {
    api: ApiConfig,
    transport: UreqTransport,
}

impl AppState {
    fn new(api: ApiConfig) -> Self {
        Self {
            api,
            transport: UreqTransport::new(),
        }
    }

    /// Run one provider call on a blocking thread.
    ///
    /// The API client is single-threaded, so it is built on the worker thread
    /// and its future driven there.
    async fn call<T, F>(&self, call: F) -> Result<T, ProxyError>
    where
        T: Send + 'static,
        F: FnOnce(&StreamApi<UreqTransport>) -> BoxFuture<'static, Result<T, ApiError>> + Send + 'static,
    {
        let transport = self.transport.clone();
        let config = self.api.clone();
        let runtime = tokio::runtime::Handle::current();
        let result = tokio::task::spawn_blocking(move || {
            let api = StreamApi::new(Rc::new(transport), config);
            runtime.block_on(call(&api))
        })
        .await
        .map_err(|e| ProxyError::internal(e.to_string()))?;
        result.map_err(|e| {
            let err = ProxyError::from(e);
            warn!("Upstream call failed: {} {}", err.status, err.body);
            err
        })
    }
}

/// A failed proxy call, rendered as `{ "error": ... }`.
#[derive(Debug, Clone, PartialEq)]
struct ProxyError {
    status: StatusCode,
    body: Value,
}

impl ProxyError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: Value::String(message.to_string()),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Value::String(message.into()),
        }
    }
}

impl From<ApiError> for ProxyError {
    /// Upstream statuses pass through; anything else is a 500.
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, body } => Self {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body: sketchcast_core::api::response_json(body),
            },
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.body }))).into_response()
    }
}

fn valid_stream_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchcast_server=info,tower_http=info".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if config.api.api_key.is_none() {
        warn!("SKETCHCAST_API_KEY not set; prompt updates will be unauthenticated");
    }

    let addr = config.addr;
    let state = Arc::new(AppState::new(config.api));
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("SketchCast proxy listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/stream", get(stream_status))
        .route("/api/streams/{stream_id}/prompts", post(update_prompt))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "SketchCast proxy - GET /api/stream?streamId=<id>"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    #[serde(rename = "streamId")]
    stream_id: Option<String>,
}

async fn stream_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> Result<Json<Value>, ProxyError> {
    let stream_id = valid_stream_id(query.stream_id.as_deref())
        .ok_or_else(|| ProxyError::bad_request("Missing or invalid streamId"))?
        .to_string();
    let status = state.call(move |api| api.get_status(&stream_id)).await?;
    Ok(Json(status.raw().clone()))
}

#[derive(Debug, Deserialize)]
struct PromptRequest {
    params: PromptParams,
}

async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<Value>, ProxyError> {
    let stream_id = valid_stream_id(Some(&stream_id))
        .ok_or_else(|| ProxyError::bad_request("Missing or invalid streamId"))?
        .to_string();
    info!("Prompt update for stream {}", stream_id);
    let reply = state
        .call(move |api| api.update_prompt(&stream_id, &request.params))
        .await?;
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(config_from(&[]).unwrap().api))
    }

    /// Answer one request with `status` and `body`, returning its base URL and
    /// a handle yielding the raw request text.
    fn one_shot_upstream(status: &str, body: &str) -> (String, std::thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let reply = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let handle = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(reply.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (base, handle)
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3030".parse().unwrap());
        assert_eq!(
            config.api.status,
            StatusEndpoint::Direct {
                base: DEFAULT_STATUS_UPSTREAM.to_string()
            }
        );
        assert_eq!(config.api.prompt_base, DEFAULT_PROMPT_BASE);
        assert!(config.api.api_key.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(&[
            ("SKETCHCAST_ADDR", "127.0.0.1:8080"),
            ("SKETCHCAST_STATUS_UPSTREAM", "http://status.local/streams/"),
            ("SKETCHCAST_PROMPT_BASE", "http://prompts.local"),
            ("SKETCHCAST_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(
            config.api.status.url_for("abc"),
            "http://status.local/streams/abc/status"
        );
        assert_eq!(config.api.prompt_base, "http://prompts.local");
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_config_empty_key_ignored() {
        let config = config_from(&[("SKETCHCAST_API_KEY", "")]).unwrap();
        assert!(config.api.api_key.is_none());
    }

    #[test]
    fn test_config_invalid_addr() {
        let err = config_from(&[("SKETCHCAST_ADDR", "not an address")]).unwrap_err();
        assert!(err.contains("SKETCHCAST_ADDR"));
    }

    #[test]
    fn test_upstream_urls() {
        let api = StreamApi::new(Rc::new(UreqTransport::new()), config_from(&[]).unwrap().api);
        assert_eq!(
            api.status_url("str_123"),
            "https://daydream.live/api/streams/str_123/status"
        );
        assert_eq!(
            api.prompt_url("a b"),
            "https://api.daydream.live/beta/streams/a%20b/prompts"
        );
    }

    #[test]
    fn test_valid_stream_id() {
        assert_eq!(valid_stream_id(Some(" str_1 ")), Some("str_1"));
        assert_eq!(valid_stream_id(Some("   ")), None);
        assert_eq!(valid_stream_id(None), None);
    }

    #[test]
    fn test_api_error_mapping() {
        let err = ProxyError::from(ApiError::Status {
            status: 404,
            body: r#"{"message":"no such stream"}"#.to_string(),
        });
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body, json!({ "message": "no such stream" }));

        let err = ProxyError::from(ApiError::Status {
            status: 42,
            body: String::new(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err = ProxyError::from(ApiError::Parse("bad json".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.body.as_str().unwrap().contains("bad json"));
    }

    #[test]
    fn test_error_response_shape() {
        let response = ProxyError::bad_request("Missing or invalid streamId").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_requires_stream_id() {
        let result = stream_status(
            State(test_state()),
            Query(StreamQuery { stream_id: None }),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body, json!("Missing or invalid streamId"));
    }

    #[tokio::test]
    async fn test_prompt_rejects_blank_stream_id() {
        let result = update_prompt(
            State(test_state()),
            Path("  ".to_string()),
            Json(PromptRequest {
                params: PromptParams::prompt("x"),
            }),
        )
        .await;
        assert_eq!(result.unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_status_goes_through_stream_api() {
        let (base, upstream) = one_shot_upstream("200 OK", r#"{"success":true,"data":{"id":"s1"}}"#);
        let state = Arc::new(AppState::new(
            config_from(&[("SKETCHCAST_STATUS_UPSTREAM", base.as_str())])
                .unwrap()
                .api,
        ));
        let Json(body) = stream_status(
            State(state),
            Query(StreamQuery {
                stream_id: Some("s1".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["data"]["id"], "s1");
        let request = upstream.join().unwrap();
        assert!(request.starts_with("GET /s1/status "));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prompt_forwards_key_and_status() {
        let (base, upstream) = one_shot_upstream("422 Unprocessable Entity", r#"{"message":"bad prompt"}"#);
        let state = Arc::new(AppState::new(
            config_from(&[
                ("SKETCHCAST_PROMPT_BASE", base.as_str()),
                ("SKETCHCAST_API_KEY", "secret"),
            ])
            .unwrap()
            .api,
        ));
        let err = update_prompt(
            State(state),
            Path("s1".to_string()),
            Json(PromptRequest {
                params: PromptParams::prompt("a cat"),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body, json!({ "message": "bad prompt" }));

        let request = upstream.join().unwrap();
        assert!(request.starts_with("POST /streams/s1/prompts "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains("a cat"));
    }
}
