//! `fetch`-based HTTP transport.

use sketchcast_core::transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport, TransportError};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

/// Describe a JS exception for logs and error values.
pub(crate) fn js_error(value: &wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &"message".into())
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Sends requests with the browser's `fetch`.
#[derive(Debug, Default)]
pub struct FetchTransport;

impl FetchTransport {
    pub fn new() -> Self {
        Self
    }
}

impl HttpTransport for FetchTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let window = web_sys::window()
                .ok_or_else(|| TransportError::Network("No window object".to_string()))?;

            let headers = Headers::new().map_err(|e| TransportError::Network(js_error(&e)))?;
            for (name, value) in &request.headers {
                headers
                    .set(name, value)
                    .map_err(|e| TransportError::Network(js_error(&e)))?;
            }
            let init = RequestInit::new();
            init.set_method(request.method.as_str());
            init.set_headers(&headers);
            if let Some(body) = &request.body {
                init.set_body(&wasm_bindgen::JsValue::from_str(body));
            }
            let js_request = Request::new_with_str_and_init(&request.url, &init)
                .map_err(|e| TransportError::InvalidUrl(js_error(&e)))?;

            let response: Response = JsFuture::from(window.fetch_with_request(&js_request))
                .await
                .map_err(|e| TransportError::Network(js_error(&e)))?
                .dyn_into()
                .map_err(|_| TransportError::Network("fetch did not return a Response".to_string()))?;

            let mut result = HttpResponse::new(response.status(), response.status_text(), "");
            for name in ["Location", "Content-Type"] {
                if let Ok(Some(value)) = response.headers().get(name) {
                    result = result.with_header(name, &value);
                }
            }
            let text = response.text().map_err(|e| TransportError::Body(js_error(&e)))?;
            result.body = JsFuture::from(text)
                .await
                .map_err(|e| TransportError::Body(js_error(&e)))?
                .as_string()
                .unwrap_or_default();
            Ok(result)
        })
    }
}

/// Fetch raw bytes and the reported content type.
pub async fn fetch_bytes(url: &str) -> Result<(String, Vec<u8>), TransportError> {
    let window =
        web_sys::window().ok_or_else(|| TransportError::Network("No window object".to_string()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| TransportError::Network(js_error(&e)))?
        .dyn_into()
        .map_err(|_| TransportError::Network("fetch did not return a Response".to_string()))?;
    if !response.ok() {
        return Err(TransportError::Network(format!(
            "{} {}",
            response.status(),
            response.status_text()
        )));
    }
    let mime = response
        .headers()
        .get("Content-Type")
        .ok()
        .flatten()
        .unwrap_or_default();
    let buffer = response
        .array_buffer()
        .map_err(|e| TransportError::Body(js_error(&e)))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| TransportError::Body(js_error(&e)))?;
    Ok((mime, js_sys::Uint8Array::new(&buffer).to_vec()))
}
