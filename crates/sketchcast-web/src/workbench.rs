//! `Workbench`: the object the page's toolbar, panels and canvas element talk to.

use crate::canvas2d::Canvas2dRenderer;
use crate::fetch::{FetchTransport, fetch_bytes};
use crate::frame_loop::FrameLoop;
use crate::media::WebMediaBackend;
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use crate::storage::LocalStorageCredentialStore;
use crate::timer::IntervalTimer;
use crate::video;
use kurbo::{Point, Rect};
use serde::Deserialize;
use sketchcast_core::api::{ApiConfig, PromptParams, StreamApi};
use sketchcast_core::background::{BackgroundError, BitmapSource};
use sketchcast_core::context_menu::{MenuAction, MenuLayout, PointerTarget};
use sketchcast_core::session::{AppSession, UserIdentity, Workspace};
use sketchcast_core::shapes::{ImageFormat, InitialGeometry, SerializableColor};
use sketchcast_core::status::StatusMonitor;
use sketchcast_core::stream::{StreamConfig, WhipSession};
use sketchcast_core::tools::ToolKind;
use sketchcast_core::upload::{MediaKind, RemoteSource, classify_remote_url, validate_upload};
use sketchcast_core::{Canvas, CanvasConfig};
use sketchcast_render::{RenderContext, Renderer};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::HtmlCanvasElement;
use web_time::Instant;

/// Status heartbeat; the monitor decides when a poll is due.
const STATUS_TICK_MS: i32 = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkbenchConfig {
    canvas: CanvasConfig,
    stream: StreamConfig,
    api: ApiConfig,
}

struct Surface {
    canvas: Canvas,
    renderer: Canvas2dRenderer,
    scale_factor: f64,
}

impl Surface {
    fn redraw(&mut self) {
        if !self.canvas.take_render_request() {
            return;
        }
        let ctx = RenderContext::new(&self.canvas).with_scale_factor(self.scale_factor);
        if let Err(e) = self.renderer.build_scene(&ctx) {
            log::error!("Render failed: {}", e);
        }
    }
}

type Session = WhipSession<WebMediaBackend, Rc<FetchTransport>>;
type Monitor = StatusMonitor<StreamApi<FetchTransport>>;

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct Workbench {
    surface: Rc<RefCell<Surface>>,
    session: Rc<Session>,
    api: Rc<StreamApi<FetchTransport>>,
    monitor: Rc<RefCell<Monitor>>,
    frame_loop: Rc<FrameLoop>,
    workspace: Option<Workspace>,
    _status_timer: Option<IntervalTimer>,
}

#[wasm_bindgen]
impl Workbench {
    /// `config` is optional JSON with `canvas`, `stream` and `api` sections.
    #[wasm_bindgen(constructor)]
    pub fn new(
        surface: HtmlCanvasElement,
        overlay: Option<HtmlCanvasElement>,
        config: Option<String>,
    ) -> Result<Workbench, JsValue> {
        let config: WorkbenchConfig = match config.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(to_js)?,
            None => WorkbenchConfig::default(),
        };

        let renderer = Canvas2dRenderer::new(surface, overlay).map_err(to_js)?;
        let backend = WebMediaBackend::new(renderer.surface().clone());
        let surface = Rc::new(RefCell::new(Surface {
            canvas: Canvas::new(config.canvas),
            renderer,
            scale_factor: web_sys::window().map_or(1.0, |w| w.device_pixel_ratio()),
        }));
        let weak = Rc::downgrade(&surface);
        surface
            .borrow_mut()
            .renderer
            .set_on_image_loaded(Rc::new(move || {
                if let Some(surface) = weak.upgrade() {
                    let mut surface = surface.borrow_mut();
                    surface.canvas.scene_mut().request_render();
                    surface.redraw();
                }
            }));
        surface.borrow_mut().redraw();

        let http = Rc::new(FetchTransport::new());
        let poll_interval = config.api.poll_interval();
        let api = Rc::new(StreamApi::new(http.clone(), config.api));
        let monitor = Rc::new(RefCell::new(StatusMonitor::new(api.clone(), poll_interval)));
        let ticking = monitor.clone();
        let status_timer = IntervalTimer::start(STATUS_TICK_MS, move || {
            let due = ticking.borrow_mut().tick(Instant::now());
            if let Some(poll) = due {
                spawn_local(poll);
            }
        });
        if status_timer.is_none() {
            log::warn!("Status polling timer unavailable");
        }

        log::info!("Workbench ready");
        Ok(Workbench {
            surface,
            session: Rc::new(WhipSession::new(backend, http, config.stream)),
            api,
            monitor,
            frame_loop: Rc::new(FrameLoop::new()),
            workspace: None,
            _status_timer: status_timer,
        })
    }

    // --- Workspace, status, prompt ---

    /// Open a workspace record (JSON). Restarts status polling for its stream.
    #[wasm_bindgen(js_name = setWorkspace)]
    pub fn set_workspace(&mut self, json: Option<String>) -> Result<(), JsValue> {
        let workspace: Option<Workspace> = match json {
            Some(json) => Some(serde_json::from_str(&json).map_err(to_js)?),
            None => None,
        };
        let stream_id = workspace
            .as_ref()
            .and_then(Workspace::stream_id)
            .map(str::to_string);
        let first = self.monitor.borrow_mut().set_subject(Instant::now(), stream_id);
        if let Some(poll) = first {
            spawn_local(poll);
        }
        self.workspace = workspace;
        Ok(())
    }

    /// Create a provider stream for `pipeline_id`. Resolves to the open workspace,
    /// pointed at the new stream, as JSON ready for `setWorkspace`.
    #[wasm_bindgen(js_name = createStream)]
    pub fn create_stream(&self, pipeline_id: &str) -> js_sys::Promise {
        let create = self.api.create_stream(pipeline_id);
        let mut workspace = self.workspace.clone().unwrap_or_default();
        future_to_promise(async move {
            let created = create.await.map_err(to_js)?;
            created.apply_to(&mut workspace);
            let json = serde_json::to_string(&workspace).map_err(to_js)?;
            Ok(JsValue::from_str(&json))
        })
    }

    #[wasm_bindgen(js_name = isLive)]
    pub fn is_live(&self) -> bool {
        self.monitor.borrow().is_live()
    }

    /// Status summary for the badge and the console panel, as JSON.
    #[wasm_bindgen(js_name = statusJson)]
    pub fn status_json(&self) -> String {
        let summary = self.monitor.borrow().summary();
        serde_json::json!({
            "live": summary.live,
            "label": summary.label,
            "error": summary.error,
            "connQuality": summary.conn_quality,
            "fps": summary.fps,
            "orchestrator": summary.orchestrator,
            "raw": summary.raw,
        })
        .to_string()
    }

    /// Send a new prompt to the workspace's stream. Failures are only logged.
    #[wasm_bindgen(js_name = updatePrompt)]
    pub fn update_prompt(&self, prompt: String) {
        self.send_params(PromptParams::prompt(prompt));
    }

    /// Send a full parameter object (JSON) to the workspace's stream.
    #[wasm_bindgen(js_name = updateParams)]
    pub fn update_params(&self, json: &str) -> Result<(), JsValue> {
        let params: PromptParams = serde_json::from_str(json).map_err(to_js)?;
        self.send_params(params);
        Ok(())
    }

    #[wasm_bindgen(js_name = playbackUrl)]
    pub fn playback_url(&self) -> Option<String> {
        let id = self.workspace.as_ref()?.playback_id()?;
        self.api
            .playback_url(id)
            .map_err(|e| log::warn!("No playback URL: {}", e))
            .ok()
    }

    // --- Streaming ---

    #[wasm_bindgen(js_name = streamState)]
    pub fn stream_state(&self) -> String {
        format!("{:?}", self.session.state()).to_lowercase()
    }

    /// Start publishing the surface. Rejects with a user-facing message.
    #[wasm_bindgen(js_name = startStream)]
    pub fn start_stream(&self) -> js_sys::Promise {
        let session = self.session.clone();
        let surface = self.surface.clone();
        let frame_loop = self.frame_loop.clone();
        let whip_url = self
            .workspace
            .as_ref()
            .and_then(Workspace::whip_url)
            .map(str::to_string);
        let has_content = surface.borrow().canvas.has_content();
        future_to_promise(async move {
            session
                .start(whip_url.as_deref(), has_content)
                .await
                .map_err(to_js)?;
            surface.borrow_mut().canvas.set_continuous_render(true);
            let painting = surface.clone();
            frame_loop.start(move || painting.borrow_mut().redraw());
            Ok(JsValue::TRUE)
        })
    }

    #[wasm_bindgen(js_name = stopStream)]
    pub fn stop_stream(&self) -> js_sys::Promise {
        self.frame_loop.stop();
        self.surface.borrow_mut().canvas.set_continuous_render(false);
        let session = self.session.clone();
        future_to_promise(async move {
            session.stop().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    // --- Scene intents ---

    #[wasm_bindgen(js_name = addShape)]
    pub fn add_shape(&self, kind: &str) -> Option<String> {
        self.with_canvas(|c| c.add_shape(kind, &InitialGeometry::default()))
            .map(|id| id.to_string())
    }

    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&self, text: Option<String>) -> String {
        self.with_canvas(|c| c.add_text(text.as_deref())).to_string()
    }

    /// Commit the overlay editor's text and leave edit mode.
    #[wasm_bindgen(js_name = commitText)]
    pub fn commit_text(&self, content: &str) {
        self.with_canvas(|c| {
            if let Some(id) = c.scene().editing() {
                c.set_text(id, content);
            }
            c.end_text_edit();
        });
    }

    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&self) -> bool {
        self.with_canvas(Canvas::delete_selected)
    }

    #[wasm_bindgen(js_name = duplicateSelected)]
    pub fn duplicate_selected(&self) -> bool {
        self.with_canvas(Canvas::duplicate_selected).is_some()
    }

    #[wasm_bindgen(js_name = setSelectedColor)]
    pub fn set_selected_color(&self, hex: &str) -> bool {
        match SerializableColor::from_hex(hex) {
            Some(color) => self.with_canvas(|c| c.set_selected_color(color)),
            None => false,
        }
    }

    #[wasm_bindgen(js_name = addComment)]
    pub fn add_comment(&self) -> bool {
        self.with_canvas(Canvas::add_comment).is_some()
    }

    /// Run a context-menu action: `delete`, `duplicate`, `comment` or a `#rrggbb` color.
    #[wasm_bindgen(js_name = menuAction)]
    pub fn menu_action(&self, action: &str) -> bool {
        let action = match action {
            "delete" => MenuAction::Delete,
            "duplicate" => MenuAction::Duplicate,
            "comment" => MenuAction::AddComment,
            hex => match SerializableColor::from_hex(hex) {
                Some(color) => MenuAction::SetColor(color),
                None => return false,
            },
        };
        self.with_canvas(|c| c.apply_menu_action(action))
    }

    #[wasm_bindgen(js_name = moveSelected)]
    pub fn move_selected(&self, dx: f64, dy: f64) -> bool {
        self.with_canvas(|c| c.move_selected(dx, dy))
    }

    #[wasm_bindgen(js_name = scaleSelected)]
    pub fn scale_selected(&self, factor: f64) -> bool {
        self.with_canvas(|c| c.scale_selected(factor))
    }

    #[wasm_bindgen(js_name = rotateSelected)]
    pub fn rotate_selected(&self, degrees: f64) -> bool {
        self.with_canvas(|c| c.rotate_selected(degrees.to_radians()))
    }

    pub fn clear(&self) {
        self.with_canvas(Canvas::clear);
    }

    // --- Tools and history ---

    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&self, name: &str) -> bool {
        match ToolKind::from_name(name) {
            Some(tool) => {
                self.with_canvas(|c| c.set_tool(tool));
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(js_name = setBrushColor)]
    pub fn set_brush_color(&self, hex: &str) -> bool {
        match SerializableColor::from_hex(hex) {
            Some(color) => {
                self.with_canvas(|c| c.set_brush_color(color));
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(js_name = setBrushWidth)]
    pub fn set_brush_width(&self, width: f64) {
        self.with_canvas(|c| c.set_brush_width(width));
    }

    pub fn undo(&self) -> bool {
        self.with_canvas(Canvas::undo)
    }

    pub fn redo(&self) -> bool {
        self.with_canvas(Canvas::redo)
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.surface.borrow().canvas.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.surface.borrow().canvas.can_redo()
    }

    // --- Pointer and keyboard ---

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f64, y: f64) {
        self.with_canvas(|c| c.pointer_down(Point::new(x, y)));
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64) {
        self.with_canvas(|c| c.pointer_move(Point::new(x, y)));
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self, x: f64, y: f64) {
        self.with_canvas(|c| c.pointer_up(Point::new(x, y)));
    }

    #[wasm_bindgen(js_name = contextClick)]
    pub fn context_click(&self, x: f64, y: f64) -> bool {
        self.with_canvas(|c| c.context_click(Point::new(x, y)))
    }

    /// Returns true if a text object entered edit mode.
    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&self, x: f64, y: f64) -> bool {
        self.with_canvas(|c| c.double_click(Point::new(x, y)))
    }

    /// Document-level pointer press: `canvas`, `menu`, or anything else for outside.
    #[wasm_bindgen(js_name = documentPointerDown)]
    pub fn document_pointer_down(&self, target: &str) {
        let target = match target {
            "canvas" => PointerTarget::Canvas,
            "menu" => PointerTarget::Menu,
            _ => PointerTarget::Outside,
        };
        self.with_canvas(|c| c.document_pointer_down(target));
    }

    /// Handle a key press. Returns true if the page should prevent the default action.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&self, key: &str, ctrl: bool, shift: bool) -> bool {
        let Some(action) = ShortcutRegistry::lookup(key, ctrl, shift) else {
            return false;
        };
        let editing = self.surface.borrow().canvas.scene().editing().is_some();
        if editing && action != ShortcutAction::Escape {
            // Keys belong to the text editor
            return false;
        }
        match action {
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::DeleteSelection => self.delete_selected(),
            ShortcutAction::Duplicate => self.duplicate_selected(),
            ShortcutAction::Escape => {
                self.with_canvas(Canvas::escape);
                true
            }
        }
    }

    // --- Menu and layout ---

    #[wasm_bindgen(js_name = menuVisible)]
    pub fn menu_visible(&self) -> bool {
        self.surface.borrow().canvas.menu().is_visible()
    }

    /// `[x, y]` in page coordinates, or undefined when hidden.
    #[wasm_bindgen(js_name = menuPosition)]
    pub fn menu_position(&self) -> Option<Vec<f64>> {
        let p = self.surface.borrow().canvas.menu().position()?;
        Some(vec![p.x, p.y])
    }

    /// Page rectangles of the canvas element and its container.
    #[wasm_bindgen(js_name = setLayout)]
    #[allow(clippy::too_many_arguments)]
    pub fn set_layout(
        &self,
        canvas_left: f64,
        canvas_top: f64,
        canvas_width: f64,
        canvas_height: f64,
        container_left: f64,
        container_top: f64,
        container_width: f64,
        container_height: f64,
    ) {
        let canvas = Rect::new(
            canvas_left,
            canvas_top,
            canvas_left + canvas_width,
            canvas_top + canvas_height,
        );
        let container = Rect::new(
            container_left,
            container_top,
            container_left + container_width,
            container_top + container_height,
        );
        self.surface
            .borrow_mut()
            .canvas
            .set_menu_layout(MenuLayout::new(canvas, container));
    }

    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&self, width: f64, height: f64) {
        self.surface.borrow_mut().canvas.set_viewport(width, height);
    }

    /// Current surface size `[width, height]`.
    #[wasm_bindgen(js_name = surfaceSize)]
    pub fn surface_size(&self) -> Vec<f64> {
        let size = self.surface.borrow().canvas.scene().surface_size();
        vec![size.width, size.height]
    }

    // --- Media ---

    /// Load a picked or dropped file as the background. Resolves to `[width, height]`.
    #[wasm_bindgen(js_name = loadBackgroundFile)]
    pub fn load_background_file(&self, mime: String, bytes: Vec<u8>) -> js_sys::Promise {
        let surface = self.surface.clone();
        future_to_promise(async move {
            let source = decode_upload(&mime, bytes).await.map_err(to_js)?;
            Ok(install_background(&surface, &source))
        })
    }

    /// Load a pasted URL as the background. Resolves to `[width, height]`.
    #[wasm_bindgen(js_name = loadBackgroundUrl)]
    pub fn load_background_url(&self, url: String) -> js_sys::Promise {
        let surface = self.surface.clone();
        future_to_promise(async move {
            let source = match classify_remote_url(&url).map_err(to_js)? {
                RemoteSource::Direct {
                    url,
                    kind: MediaKind::Video,
                } => video::first_frame(url.as_str()).await.map_err(to_js)?,
                RemoteSource::Direct { url, .. } | RemoteSource::FetchFirst { url } => {
                    let (mime, bytes) = fetch_bytes(url.as_str()).await.map_err(to_js)?;
                    let mime = if mime.is_empty() {
                        ImageFormat::from_magic_bytes(&bytes)
                            .map(|f| f.mime_type().to_string())
                            .unwrap_or_default()
                    } else {
                        mime
                    };
                    decode_upload(&mime, bytes).await.map_err(to_js)?
                }
            };
            Ok(install_background(&surface, &source))
        })
    }

    /// Insert an image file as a movable object.
    #[wasm_bindgen(js_name = addImageFile)]
    pub fn add_image_file(&self, mime: &str, bytes: Vec<u8>) -> Result<String, JsValue> {
        if validate_upload(mime, bytes.len() as u64).map_err(to_js)? != MediaKind::Image {
            return Err(to_js(BackgroundError::UnsupportedFormat));
        }
        let source = BitmapSource::decode(bytes).map_err(to_js)?;
        Ok(self.with_canvas(|c| c.add_image(&source)).to_string())
    }
}

impl Workbench {
    fn with_canvas<R>(&self, f: impl FnOnce(&mut Canvas) -> R) -> R {
        let mut surface = self.surface.borrow_mut();
        let result = f(&mut surface.canvas);
        surface.canvas.scene_mut().request_render();
        surface.redraw();
        result
    }

    fn send_params(&self, params: PromptParams) {
        match self.workspace.as_ref().and_then(Workspace::stream_id) {
            Some(id) => spawn_local(self.api.send_prompt(id, &params)),
            None => log::warn!("No stream for this workspace; prompt not sent"),
        }
    }
}

async fn decode_upload(mime: &str, bytes: Vec<u8>) -> Result<BitmapSource, BackgroundError> {
    match validate_upload(mime, bytes.len() as u64)? {
        MediaKind::Image => BitmapSource::decode(bytes),
        MediaKind::Video => video::first_frame_of_bytes(mime, &bytes).await,
    }
}

fn install_background(surface: &RefCell<Surface>, source: &BitmapSource) -> JsValue {
    let mut surface = surface.borrow_mut();
    let size = surface.canvas.load_background(source);
    surface.canvas.scene_mut().request_render();
    surface.redraw();
    let result = js_sys::Array::new();
    result.push(&size.width.into());
    result.push(&size.height.into());
    result.into()
}

/// The signed-in user and open workspace, persisted in localStorage.
#[wasm_bindgen]
pub struct WebSession {
    inner: Rc<RefCell<AppSession<LocalStorageCredentialStore>>>,
}

impl Default for WebSession {
    fn default() -> Self {
        Self::new()
    }
}

// localStorage futures resolve without yielding, so no other borrow can interleave.
#[allow(clippy::await_holding_refcell_ref)]
#[wasm_bindgen]
impl WebSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WebSession {
        WebSession {
            inner: Rc::new(RefCell::new(AppSession::new(Rc::new(
                LocalStorageCredentialStore::new(),
            )))),
        }
    }

    /// Restore the user from storage. Resolves to the user JSON or null.
    pub fn initialize(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let mut session = inner.borrow_mut();
            let user = session.initialize().await.map_err(to_js)?;
            Ok(user
                .and_then(|u| serde_json::to_string(u).ok())
                .map_or(JsValue::NULL, |json| JsValue::from_str(&json)))
        })
    }

    #[wasm_bindgen(js_name = signIn)]
    pub fn sign_in(&self, user_json: String) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            let user: UserIdentity = serde_json::from_str(&user_json).map_err(to_js)?;
            inner.borrow_mut().sign_in(user).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = signOut)]
    pub fn sign_out(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner.borrow_mut().sign_out().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = isSignedIn)]
    pub fn is_signed_in(&self) -> bool {
        self.inner.borrow().is_signed_in()
    }

    /// Open a workspace record; returns it normalized as JSON for `Workbench.setWorkspace`.
    #[wasm_bindgen(js_name = openWorkspace)]
    pub fn open_workspace(&self, json: &str) -> Result<String, JsValue> {
        let workspace: Workspace = serde_json::from_str(json).map_err(to_js)?;
        let mut session = self.inner.borrow_mut();
        let workspace = session.open_workspace(workspace).map_err(to_js)?;
        serde_json::to_string(workspace).map_err(to_js)
    }
}
