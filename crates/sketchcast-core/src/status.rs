//! Stream status: forward-compatible payload parsing, the liveness rule and the polling monitor.

use crate::refresh::PeriodicRefresh;
use crate::transport::BoxFuture;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Display;
use std::rc::Rc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Last reported status of a stream.
///
/// The raw JSON document is kept as received so a detail view can show fields
/// this crate does not model. The consumed fields are read from `data` when the
/// payload is wrapped in one, otherwise from the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStatus {
    raw: Value,
    data: StatusData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct StatusData {
    stream_id: Option<String>,
    gateway_status: Option<GatewayStatus>,
    ingest_metrics: Option<IngestMetrics>,
    input_status: Option<InputStatus>,
    orchestrator_info: Option<OrchestratorInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct GatewayStatus {
    error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct IngestMetrics {
    stats: Option<IngestStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct IngestStats {
    conn_quality: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct InputStatus {
    fps: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct OrchestratorInfo {
    address: Option<String>,
}

impl StreamStatus {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(raw))
    }

    /// Never fails: fields of unexpected type read as absent.
    pub fn from_value(raw: Value) -> Self {
        let inner = match raw.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => raw.clone(),
        };
        let data = serde_json::from_value(inner.clone())
            .unwrap_or_else(|_| Self::lenient_data(&inner));
        Self { raw, data }
    }

    // Field-by-field fallback when one field has the wrong type.
    fn lenient_data(inner: &Value) -> StatusData {
        let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
        StatusData {
            stream_id: text(inner.get("stream_id")),
            gateway_status: Some(GatewayStatus {
                error_message: text(inner.pointer("/gateway_status/error_message")),
            }),
            ingest_metrics: Some(IngestMetrics {
                stats: Some(IngestStats {
                    conn_quality: inner.pointer("/ingest_metrics/stats/conn_quality").cloned(),
                }),
            }),
            input_status: Some(InputStatus {
                fps: inner.pointer("/input_status/fps").cloned(),
            }),
            orchestrator_info: Some(OrchestratorInfo {
                address: text(inner.pointer("/orchestrator_info/address")),
            }),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Pretty-printed raw document for the detail view.
    pub fn raw_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.data.stream_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.data
            .gateway_status
            .as_ref()
            .and_then(|g| g.error_message.as_deref())
    }

    /// Connection quality as reported (string or number depending on the gateway).
    pub fn conn_quality(&self) -> Option<&Value> {
        self.data
            .ingest_metrics
            .as_ref()
            .and_then(|m| m.stats.as_ref())
            .and_then(|s| s.conn_quality.as_ref())
    }

    pub fn input_fps(&self) -> Option<f64> {
        match self.data.input_status.as_ref()?.fps.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn orchestrator_address(&self) -> Option<&str> {
        self.data
            .orchestrator_info
            .as_ref()
            .and_then(|o| o.address.as_deref())
    }
}

/// The one liveness rule: a status is known and its gateway reports no error.
pub fn is_live(status: Option<&StreamStatus>) -> bool {
    match status {
        Some(status) => status.error_message().is_none_or(str::is_empty),
        None => false,
    }
}

/// What the badge and the status panel display.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub live: bool,
    pub label: &'static str,
    pub error: Option<String>,
    pub conn_quality: Option<String>,
    pub fps: Option<f64>,
    pub orchestrator: Option<String>,
    pub raw: Option<String>,
}

impl StatusSummary {
    pub fn from_status(status: Option<&StreamStatus>) -> Self {
        let live = is_live(status);
        let label = match (status, live) {
            (None, _) => "Unknown",
            (Some(_), true) => "Live",
            (Some(_), false) => "Offline",
        };
        Self {
            live,
            label,
            error: status
                .and_then(StreamStatus::error_message)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            conn_quality: status.and_then(StreamStatus::conn_quality).map(|q| match q {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            fps: status.and_then(StreamStatus::input_fps),
            orchestrator: status
                .and_then(StreamStatus::orchestrator_address)
                .map(str::to_string),
            raw: status.map(StreamStatus::raw_pretty),
        }
    }
}

/// Fetches the status of one stream.
pub trait StatusSource {
    type Error: Display + 'static;

    fn fetch_status(&self, stream_id: &str) -> BoxFuture<'static, Result<StreamStatus, Self::Error>>;
}

/// Polls the status of the current workspace's stream.
///
/// Changing the subject restarts polling with an immediate fetch; clearing it
/// stops polling and forgets the last status.
pub struct StatusMonitor<S: StatusSource> {
    source: Rc<S>,
    interval: Duration,
    subject: Option<String>,
    refresh: Option<PeriodicRefresh<StreamStatus, S::Error>>,
}

impl<S: StatusSource + 'static> StatusMonitor<S> {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

    pub fn new(source: Rc<S>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            subject: None,
            refresh: None,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Set the stream to watch. Returns the immediate fetch when polling (re)starts.
    pub fn set_subject(
        &mut self,
        now: Instant,
        stream_id: Option<String>,
    ) -> Option<BoxFuture<'static, ()>> {
        let stream_id = stream_id.filter(|id| !id.is_empty());
        if stream_id == self.subject && self.refresh.is_some() {
            return None;
        }
        self.stop();
        self.subject = stream_id.clone();
        let id = stream_id?;
        log::debug!("Polling status of stream {} every {:?}", id, self.interval);
        let source = self.source.clone();
        let mut refresh = PeriodicRefresh::new(self.interval, move || source.fetch_status(&id));
        let first = refresh.start(now);
        self.refresh = Some(refresh);
        Some(first)
    }

    pub fn tick(&mut self, now: Instant) -> Option<BoxFuture<'static, ()>> {
        self.refresh.as_mut()?.tick(now)
    }

    pub fn status(&self) -> Option<StreamStatus> {
        self.refresh.as_ref().and_then(PeriodicRefresh::value)
    }

    pub fn is_live(&self) -> bool {
        match &self.refresh {
            Some(refresh) => refresh.with_value(is_live),
            None => false,
        }
    }

    pub fn summary(&self) -> StatusSummary {
        match &self.refresh {
            Some(refresh) => refresh.with_value(StatusSummary::from_status),
            None => StatusSummary::from_status(None),
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut refresh) = self.refresh.take() {
            refresh.stop();
        }
        self.subject = None;
    }
}
