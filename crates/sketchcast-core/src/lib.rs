//! SketchCast Core Library
//!
//! Platform-agnostic scene graph, history, tools and live-streaming session logic
//! for the SketchCast canvas.

pub mod api;
pub mod background;
pub mod canvas;
pub mod context_menu;
pub mod history;
pub mod refresh;
pub mod scene;
pub mod session;
pub mod shapes;
pub mod status;
pub mod stream;
pub mod tools;
pub mod transport;
pub mod upload;

pub use api::{ApiConfig, ApiError, CreatedStream, PromptParams, StreamApi};
pub use background::{BackgroundLayer, BackgroundPolicy, BitmapSource};
pub use canvas::{Canvas, CanvasConfig};
pub use context_menu::{ContextMenuController, MenuAction};
pub use history::{History, HistoryManager};
pub use refresh::PeriodicRefresh;
pub use scene::{SceneDocument, SceneEvent, SceneGraph, SceneObserver};
pub use session::{AppSession, CredentialStore, UserIdentity, Workspace};
pub use status::{StatusMonitor, StreamStatus, is_live};
pub use stream::{StreamConfig, StreamError, StreamState, WhipSession};
pub use tools::{DrawingModeController, ToolKind};
pub use transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use upload::{MAX_UPLOAD_BYTES, UploadError, validate_upload};
