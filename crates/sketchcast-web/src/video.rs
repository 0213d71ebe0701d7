//! First-frame extraction for video backgrounds.

use crate::fetch::js_error;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sketchcast_core::background::{BackgroundError, BitmapSource};
use sketchcast_core::shapes::ImageFormat;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement, Url};

fn decode_error(value: JsValue) -> BackgroundError {
    BackgroundError::Decode(js_error(&value))
}

/// Decode the first frame of an in-memory video file.
pub async fn first_frame_of_bytes(mime: &str, bytes: &[u8]) -> Result<BitmapSource, BackgroundError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));
    let options = BlobPropertyBag::new();
    options.set_type(mime);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(decode_error)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(decode_error)?;
    let frame = first_frame(&url).await;
    let _ = Url::revoke_object_url(&url);
    frame
}

/// Load `src` into a detached video element and grab its first frame as PNG.
pub async fn first_frame(src: &str) -> Result<BitmapSource, BackgroundError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| BackgroundError::Decode("No document".to_string()))?;
    let video: HtmlVideoElement = document
        .create_element("video")
        .map_err(decode_error)?
        .dyn_into()
        .map_err(|_| BackgroundError::Decode("not a video element".to_string()))?;
    video.set_muted(true);
    video.set_preload("auto");
    video.set_cross_origin(Some("anonymous"));

    let loaded = js_sys::Promise::new(&mut |resolve, reject| {
        let on_loaded = Closure::once_into_js(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let on_error = Closure::once_into_js(move || {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("video failed to load"));
        });
        video.set_onloadeddata(Some(on_loaded.unchecked_ref()));
        video.set_onerror(Some(on_error.unchecked_ref()));
    });
    video.set_src(src);
    JsFuture::from(loaded).await.map_err(decode_error)?;

    let (width, height) = (video.video_width(), video.video_height());
    if width == 0 || height == 0 {
        return Err(BackgroundError::Empty);
    }
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(decode_error)?
        .dyn_into()
        .map_err(|_| BackgroundError::Decode("not a canvas element".to_string()))?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(decode_error)?
        .ok_or(BackgroundError::UnsupportedFormat)?
        .dyn_into()
        .map_err(|_| BackgroundError::UnsupportedFormat)?;
    ctx.draw_image_with_html_video_element(&video, 0.0, 0.0)
        .map_err(decode_error)?;

    let data_url = canvas.to_data_url_with_type("image/png").map_err(decode_error)?;
    let encoded = data_url
        .split_once(',')
        .map(|(_, data)| data)
        .ok_or_else(|| BackgroundError::Decode("malformed data URL".to_string()))?;
    let png = STANDARD
        .decode(encoded)
        .map_err(|e| BackgroundError::Decode(e.to_string()))?;
    log::debug!("Captured {}x{} video frame", width, height);
    Ok(BitmapSource::from_frame(ImageFormat::Png, png, width, height))
}
