//! Blocking `ureq` transport for native builds (tests, tools).

use super::{BoxFuture, HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// Runs requests synchronously inside the returned future, like the file storage
/// backend does its IO.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(std::time::Duration::from_secs(30))
                .build(),
        }
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = self.agent.request(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        let result = match (&request.method, request.body) {
            (Method::Get | Method::Delete, None) => req.call(),
            (_, Some(body)) => req.send_string(&body),
            (Method::Post, None) => req.send_string(""),
        };
        let response = match result {
            Ok(response) => response,
            // Non-2xx responses are still responses
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(e)) => return Err(TransportError::Network(e.to_string())),
        };

        let status = response.status();
        let status_text = response.status_text().to_string();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();
        let body = response
            .into_string()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            log::debug!("{} {}", request.method.as_str(), request.url);
            self.execute(request)
        })
    }
}
