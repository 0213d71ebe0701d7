//! SketchCast Render Library
//!
//! Renderer abstraction for SketchCast. Scenes are lowered to a backend-neutral
//! display list which platform renderers (the browser 2D context) replay.

mod display_list;
mod renderer;

pub use display_list::{DisplayList, DisplayListRenderer, DrawCommand, StrokeStyle, TextLayout};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
