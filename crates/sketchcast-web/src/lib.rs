//! SketchCast Web
//!
//! Browser shell for SketchCast: wires the core canvas, history and streaming
//! session to the DOM, the 2D context, WebRTC and `fetch`.

mod params;
mod shortcuts;

pub use params::{UrlParams, parse_params};
pub use shortcuts::{Shortcut, ShortcutAction, ShortcutRegistry};

#[cfg(target_arch = "wasm32")]
mod canvas2d;
#[cfg(target_arch = "wasm32")]
mod fetch;
#[cfg(target_arch = "wasm32")]
mod frame_loop;
#[cfg(target_arch = "wasm32")]
mod media;
#[cfg(target_arch = "wasm32")]
mod storage;
#[cfg(target_arch = "wasm32")]
mod timer;
#[cfg(target_arch = "wasm32")]
mod video;
#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
mod workbench;

#[cfg(target_arch = "wasm32")]
pub use web::run_wasm;
#[cfg(target_arch = "wasm32")]
pub use workbench::{WebSession, Workbench};
