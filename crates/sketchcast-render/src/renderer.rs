//! Renderer trait abstraction.

use kurbo::Size;
use peniko::Color;
use sketchcast_core::canvas::Canvas;
use sketchcast_core::shapes::ShapeId;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Surface clear color, visible where there is no background.
    pub background_color: Color,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Text being edited in an overlay editor; not drawn on the surface.
    pub editing_shape_id: Option<ShapeId>,
    /// Whether to emit overlay commands (selection outline, stroke preview).
    pub overlay: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a Canvas) -> Self {
        Self {
            canvas,
            scale_factor: 1.0,
            background_color: Color::WHITE,
            selection_color: Color::from_rgba8(99, 102, 241, 255), // Indigo
            editing_shape_id: canvas.scene().editing(),
            overlay: true,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Set the shape ID being edited (will be skipped in build_scene).
    pub fn with_editing_shape(mut self, shape_id: Option<ShapeId>) -> Self {
        self.editing_shape_id = shape_id;
        self
    }

    pub fn with_overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    /// Logical size of the drawing surface.
    pub fn surface_size(&self) -> Size {
        self.canvas.scene().surface_size()
    }

    /// Backing-store size in physical pixels.
    pub fn physical_size(&self) -> Size {
        let size = self.surface_size();
        Size::new(
            (size.width * self.scale_factor).round(),
            (size.height * self.scale_factor).round(),
        )
    }
}

/// Trait for rendering backends.
///
/// Not `Send`: the browser backend holds JS handles.
pub trait Renderer {
    /// Build the command buffer for a frame.
    ///
    /// This method is called once per frame and should prepare all drawing commands.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
