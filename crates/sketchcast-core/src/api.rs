//! Client for the streaming provider's HTTP API: stream creation, status queries,
//! prompt updates, playback URLs.

use crate::session::Workspace;
use crate::status::{StatusSource, StreamStatus};
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse API response: {0}")]
    Parse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Where stream status is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEndpoint {
    /// Same-origin proxy: `{base}?streamId={id}`.
    Proxy { base: String },
    /// Provider endpoint: `{base}/{id}/status`.
    Direct { base: String },
}

impl StatusEndpoint {
    pub fn url_for(&self, stream_id: &str) -> String {
        match self {
            StatusEndpoint::Proxy { base } => {
                format!("{}?streamId={}", base, encode_component(stream_id))
            }
            StatusEndpoint::Direct { base } => format!(
                "{}/{}/status",
                base.trim_end_matches('/'),
                encode_component(stream_id)
            ),
        }
    }
}

impl Default for StatusEndpoint {
    fn default() -> Self {
        StatusEndpoint::Proxy {
            base: "/api/stream".to_string(),
        }
    }
}

/// Endpoints and credentials of the streaming provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub api_base: String,
    pub prompt_base: String,
    pub status: StatusEndpoint,
    pub player_base: String,
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.daydream.live/v1".to_string(),
            prompt_base: "https://api.daydream.live/beta".to_string(),
            status: StatusEndpoint::default(),
            player_base: "https://lvpr.tv/".to_string(),
            api_key: None,
            poll_interval_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Per-net settings of a control net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlNet {
    pub model_id: String,
    pub conditioning_scale: f64,
    pub preprocessor: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_guidance_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_guidance_end: Option<f64>,
}

fn enabled_default() -> bool {
    true
}

/// Generation parameters sent to a running stream. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controlnets: Vec<ControlNet>,
}

impl PromptParams {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct PromptBody<'a> {
    params: &'a PromptParams,
}

/// A stream the provider created for a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedStream {
    pub id: String,
    #[serde(default)]
    pub whip_url: String,
    #[serde(default)]
    pub output_playback_id: String,
}

impl CreatedStream {
    /// Point `workspace` at this stream.
    pub fn apply_to(&self, workspace: &mut Workspace) {
        workspace.stream_id = Some(self.id.clone());
        workspace.whip_url = Some(self.whip_url.clone());
        workspace.output_playback_id = Some(self.output_playback_id.clone());
    }
}

/// JSON when the body parses, the raw text otherwise; empty is null.
pub fn response_json(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Status {
            status: response.status,
            body: response.body,
        });
    }
    Ok(response)
}

pub struct StreamApi<H> {
    http: Rc<H>,
    config: ApiConfig,
}

impl<H: HttpTransport + 'static> StreamApi<H> {
    pub fn new(http: Rc<H>, config: ApiConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn streams_url(&self) -> String {
        format!("{}/streams", self.config.api_base.trim_end_matches('/'))
    }

    pub fn status_url(&self, stream_id: &str) -> String {
        self.config.status.url_for(stream_id)
    }

    pub fn prompt_url(&self, stream_id: &str) -> String {
        format!(
            "{}/streams/{}/prompts",
            self.config.prompt_base.trim_end_matches('/'),
            encode_component(stream_id)
        )
    }

    pub fn get_status(&self, stream_id: &str) -> BoxFuture<'static, Result<StreamStatus, ApiError>> {
        let http = self.http.clone();
        let mut request = HttpRequest::get(self.status_url(stream_id));
        if matches!(self.config.status, StatusEndpoint::Direct { .. }) {
            if let Some(key) = &self.config.api_key {
                request = request.with_bearer(key);
            }
        }
        Box::pin(async move {
            let response = check_status(http.send(request).await?)?;
            StreamStatus::from_json(&response.body).map_err(|e| ApiError::Parse(e.to_string()))
        })
    }

    /// Create a stream running `pipeline_id`.
    pub fn create_stream(&self, pipeline_id: &str) -> BoxFuture<'static, Result<CreatedStream, ApiError>> {
        let http = self.http.clone();
        let mut request = HttpRequest::post(
            self.streams_url(),
            "application/json",
            serde_json::json!({ "pipeline_id": pipeline_id }).to_string(),
        );
        if let Some(key) = &self.config.api_key {
            request = request.with_bearer(key);
        }
        Box::pin(async move {
            let response = check_status(http.send(request).await?)?;
            let created: CreatedStream =
                serde_json::from_str(&response.body).map_err(|e| ApiError::Parse(e.to_string()))?;
            log::info!("Created stream {}", created.id);
            Ok(created)
        })
    }

    /// POST `{"params": ...}` to the stream's prompt endpoint. Resolves to the provider's reply.
    pub fn update_prompt(
        &self,
        stream_id: &str,
        params: &PromptParams,
    ) -> BoxFuture<'static, Result<Value, ApiError>> {
        let http = self.http.clone();
        let url = self.prompt_url(stream_id);
        let key = self.config.api_key.clone();
        let body = serde_json::to_string(&PromptBody { params });
        Box::pin(async move {
            let body = body.map_err(|e| ApiError::Parse(e.to_string()))?;
            let mut request = HttpRequest::post(url, "application/json", body);
            if let Some(key) = &key {
                request = request.with_bearer(key);
            }
            let response = check_status(http.send(request).await?)?;
            Ok(response_json(response.body))
        })
    }

    /// Fire-and-forget prompt update: failures are logged only.
    pub fn send_prompt(&self, stream_id: &str, params: &PromptParams) -> BoxFuture<'static, ()> {
        let stream_id = stream_id.to_string();
        let update = self.update_prompt(&stream_id, params);
        Box::pin(async move {
            match update.await {
                Ok(_) => log::info!("Updated prompt of stream {}", stream_id),
                Err(e) => log::error!("Prompt update for stream {} failed: {}", stream_id, e),
            }
        })
    }

    pub fn playback_url(&self, playback_id: &str) -> Result<String, ApiError> {
        playback_url(&self.config.player_base, playback_id)
    }
}

impl<H: HttpTransport + 'static> StatusSource for StreamApi<H> {
    type Error = ApiError;

    fn fetch_status(&self, stream_id: &str) -> BoxFuture<'static, Result<StreamStatus, ApiError>> {
        self.get_status(stream_id)
    }
}

/// Player embed URL: `{player_base}?v={playback_id}`.
pub fn playback_url(player_base: &str, playback_id: &str) -> Result<String, ApiError> {
    if playback_id.is_empty() {
        return Err(ApiError::InvalidUrl("empty playback id".to_string()));
    }
    let mut url = Url::parse(player_base).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut().clear().append_pair("v", playback_id);
    Ok(url.into())
}

/// Percent-encode one URL path or query component.
pub fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, Method};
    use std::cell::RefCell;
    use std::future::Future;

    fn block_on<F: Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);
        loop {
            if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }

    struct RecordingTransport {
        requests: RefCell<Vec<HttpRequest>>,
        reply: RefCell<Result<HttpResponse, TransportError>>,
    }

    impl RecordingTransport {
        fn replying(reply: Result<HttpResponse, TransportError>) -> Rc<Self> {
            Rc::new(Self {
                requests: RefCell::new(Vec::new()),
                reply: RefCell::new(reply),
            })
        }
    }

    impl HttpTransport for RecordingTransport {
        fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
            self.requests.borrow_mut().push(request);
            let reply = self.reply.borrow().clone();
            Box::pin(async move { reply })
        }
    }

    #[test]
    fn test_status_urls() {
        let proxy = StatusEndpoint::default();
        assert_eq!(proxy.url_for("str 1/x"), "/api/stream?streamId=str%201%2Fx");
        let direct = StatusEndpoint::Direct {
            base: "https://daydream.live/api/streams/".into(),
        };
        assert_eq!(direct.url_for("abc"), "https://daydream.live/api/streams/abc/status");
    }

    #[test]
    fn test_playback_url() {
        assert_eq!(
            playback_url("https://lvpr.tv/", "pb 1&x").unwrap(),
            "https://lvpr.tv/?v=pb+1%26x"
        );
        assert!(playback_url("https://lvpr.tv/", "").is_err());
        assert!(playback_url("not a url", "id").is_err());
    }

    #[test]
    fn test_update_prompt_request_shape() {
        let http = RecordingTransport::replying(Ok(HttpResponse::new(200, "OK", "{}")));
        let api = StreamApi::new(
            http.clone(),
            ApiConfig {
                api_key: Some("secret".into()),
                ..ApiConfig::default()
            },
        );
        block_on(api.update_prompt("str_9", &PromptParams::prompt("a watercolor fox"))).unwrap();

        let requests = http.requests.borrow();
        let req = &requests[0];
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "https://api.daydream.live/beta/streams/str_9/prompts");
        assert!(req.headers.contains(&("Authorization".into(), "Bearer secret".into())));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "params": { "prompt": "a watercolor fox" } }));
    }

    #[test]
    fn test_full_params_serialization() {
        let params = PromptParams {
            model_id: Some("streamdiffusion".into()),
            prompt: Some("city at night".into()),
            guidance_scale: Some(1.2),
            num_inference_steps: Some(50),
            width: Some(512),
            height: Some(512),
            controlnets: vec![ControlNet {
                model_id: "thibaud/controlnet-sd21-openpose-diffusers".into(),
                conditioning_scale: 0.5,
                preprocessor: "pose_tensorrt".into(),
                enabled: true,
                control_guidance_start: Some(0.0),
                control_guidance_end: Some(1.0),
            }],
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["controlnets"][0]["preprocessor"], "pose_tensorrt");
        assert_eq!(value["num_inference_steps"], 50);
        let back: PromptParams = serde_json::from_value(value).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_prompt_failure_is_logged_not_returned() {
        let http = RecordingTransport::replying(Ok(HttpResponse::new(401, "Unauthorized", "bad key")));
        let api = StreamApi::new(http.clone(), ApiConfig::default());
        let err = block_on(api.update_prompt("s", &PromptParams::prompt("x"))).unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        block_on(api.send_prompt("s", &PromptParams::prompt("x")));
        assert_eq!(http.requests.borrow().len(), 2);
    }

    #[test]
    fn test_get_status() {
        let http = RecordingTransport::replying(Ok(HttpResponse::new(
            200,
            "OK",
            r#"{"data":{"stream_id":"s1","gateway_status":{"error_message":""}}}"#,
        )));
        let api = StreamApi::new(http.clone(), ApiConfig::default());
        let status = block_on(api.fetch_status("s1")).unwrap();
        assert_eq!(status.stream_id(), Some("s1"));
        assert_eq!(http.requests.borrow()[0].url, "/api/stream?streamId=s1");

        *http.reply.borrow_mut() = Err(TransportError::Network("offline".into()));
        assert!(matches!(
            block_on(api.get_status("s1")),
            Err(ApiError::Transport(_))
        ));
        *http.reply.borrow_mut() = Ok(HttpResponse::new(200, "OK", "<html>"));
        assert!(matches!(block_on(api.get_status("s1")), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_create_stream_uses_api_base() {
        let http = RecordingTransport::replying(Ok(HttpResponse::new(
            201,
            "Created",
            r#"{"id":"str_1","whip_url":"https://ingest/whip/str_1","output_playback_id":"pb_1","extra":true}"#,
        )));
        let api = StreamApi::new(
            http.clone(),
            ApiConfig {
                api_base: "https://api.example/v1/".into(),
                api_key: Some("secret".into()),
                ..ApiConfig::default()
            },
        );
        let created = block_on(api.create_stream("pip_1")).unwrap();
        assert_eq!(created.id, "str_1");

        let requests = http.requests.borrow();
        assert_eq!(requests[0].url, "https://api.example/v1/streams");
        assert!(requests[0].headers.contains(&("Authorization".into(), "Bearer secret".into())));
        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "pipeline_id": "pip_1" }));

        let mut workspace = Workspace::default();
        created.apply_to(&mut workspace);
        assert_eq!(workspace.stream_id(), Some("str_1"));
        assert_eq!(workspace.whip_url(), Some("https://ingest/whip/str_1"));
        assert_eq!(workspace.playback_id(), Some("pb_1"));
    }

    #[test]
    fn test_create_stream_errors() {
        let http = RecordingTransport::replying(Ok(HttpResponse::new(403, "Forbidden", "no")));
        let api = StreamApi::new(http.clone(), ApiConfig::default());
        assert!(matches!(
            block_on(api.create_stream("pip")),
            Err(ApiError::Status { status: 403, .. })
        ));
        *http.reply.borrow_mut() = Ok(HttpResponse::new(200, "OK", "{}"));
        assert!(matches!(block_on(api.create_stream("pip")), Err(ApiError::Parse(_))));
        assert_eq!(http.requests.borrow()[0].url, "https://api.daydream.live/v1/streams");
    }

    #[test]
    fn test_response_json() {
        assert_eq!(response_json(r#"{"ok":1}"#.into()), serde_json::json!({ "ok": 1 }));
        assert_eq!(response_json("plain".into()), Value::String("plain".into()));
        assert_eq!(response_json(" ".into()), Value::Null);
    }
}
