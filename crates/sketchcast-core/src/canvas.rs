//! Canvas: the user-intent surface over scene, history, tools and menu.

use crate::background::{BackgroundError, BackgroundLayer, BackgroundPolicy, BitmapSource, FitBounds};
use crate::context_menu::{ContextMenuController, MenuAction, MenuLayout, PointerTarget};
use crate::history::History;
use crate::scene::SceneGraph;
use crate::shapes::{
    Image, InitialGeometry, SerializableColor, Shape, ShapeId, ShapeKind, Text,
};
use crate::tools::{DrawingModeController, ModeChange, ToolKind};
use crate::upload::{MediaKind, validate_upload};
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Canvas behaviour knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Surface size before any background is loaded.
    pub surface_width: f64,
    pub surface_height: f64,
    /// Background fit as fractions of the viewport.
    pub fit_width_fraction: f64,
    pub fit_height_fraction: f64,
    /// Absolute cap on the fitted background size.
    pub fit_max_width: f64,
    pub fit_max_height: f64,
    /// Offset applied to duplicated objects.
    pub duplicate_offset: (f64, f64),
    pub default_text: String,
    pub comment_placeholder: String,
    /// Maximum undo depth; `None` keeps everything.
    pub history_limit: Option<usize>,
    pub background_policy: BackgroundPolicy,
    /// Pointer hit slop in surface pixels.
    pub hit_tolerance: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            surface_width: 800.0,
            surface_height: 600.0,
            fit_width_fraction: 0.9,
            fit_height_fraction: 0.7,
            fit_max_width: 700.0,
            fit_max_height: 500.0,
            duplicate_offset: (20.0, 20.0),
            default_text: "Double click to edit".to_string(),
            comment_placeholder: "Add comment...".to_string(),
            history_limit: None,
            background_policy: BackgroundPolicy::Overlay,
            hit_tolerance: 4.0,
        }
    }
}

/// An object drag in progress.
#[derive(Debug, Clone, Copy)]
struct DragState {
    id: ShapeId,
    last: Point,
    moved: bool,
}

/// The canvas engine. All user intents enter here.
pub struct Canvas {
    config: CanvasConfig,
    scene: SceneGraph,
    history: History,
    drawing: DrawingModeController,
    menu: ContextMenuController,
    viewport: Size,
    drag: Option<DragState>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        let mut scene = SceneGraph::new(config.surface_width, config.surface_height);
        let history = History::attach(&mut scene, config.history_limit);
        Self {
            viewport: Size::new(config.surface_width, config.surface_height),
            config,
            scene,
            history,
            drawing: DrawingModeController::new(),
            menu: ContextMenuController::default(),
            drag: None,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Direct scene access, e.g. to subscribe additional observers.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn drawing(&self) -> &DrawingModeController {
        &self.drawing
    }

    pub fn menu(&self) -> &ContextMenuController {
        &self.menu
    }

    pub fn set_menu_layout(&mut self, layout: MenuLayout) {
        self.menu.set_layout(layout);
    }

    /// Browser viewport size, used to fit backgrounds.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    pub fn fit_bounds(&self) -> FitBounds {
        FitBounds::from_viewport(
            self.viewport.width,
            self.viewport.height,
            self.config.fit_width_fraction,
            self.config.fit_height_fraction,
            (self.config.fit_max_width, self.config.fit_max_height),
        )
    }

    /// Whether a stream would have anything to show.
    pub fn has_content(&self) -> bool {
        self.scene.document().has_content()
    }

    fn select_and_show(&mut self, id: ShapeId, pointer: Option<Point>) {
        if self.scene.select(id) {
            if let Some(bounds) = self.scene.selected_bounds() {
                self.menu.show(id, bounds, pointer);
            }
        }
    }

    fn clear_selection(&mut self) {
        self.scene.clear_selection();
        self.menu.hide();
    }

    // --- Scene intents ---

    /// Insert a shape by toolbar name. Unknown names are ignored.
    pub fn add_shape(&mut self, kind: &str, geometry: &InitialGeometry) -> Option<ShapeId> {
        let Some(kind) = ShapeKind::from_name(kind) else {
            log::debug!("Ignoring unknown shape kind '{}'", kind);
            return None;
        };
        self.add_shape_kind(kind, geometry)
    }

    pub fn add_shape_kind(&mut self, kind: ShapeKind, geometry: &InitialGeometry) -> Option<ShapeId> {
        let shape = Shape::with_defaults(kind, geometry)?;
        let id = self.scene.insert(shape);
        self.select_and_show(id, None);
        Some(id)
    }

    /// Insert editable text centered on the surface and start editing it.
    pub fn add_text(&mut self, initial: Option<&str>) -> ShapeId {
        let content = initial.unwrap_or(&self.config.default_text).to_string();
        let mut text = Text::new(Point::ZERO, content);
        let size = text.box_rect().size();
        let surface = self.scene.surface_size();
        text.position = Point::new(
            (surface.width - size.width) / 2.0,
            (surface.height - size.height) / 2.0,
        );
        let id = self.scene.insert(Shape::Text(text));
        self.select_and_show(id, None);
        self.scene.enter_text_editing(id);
        id
    }

    /// Replace the content of a text object, e.g. when an edit session ends.
    pub fn set_text(&mut self, id: ShapeId, content: &str) -> bool {
        let unchanged = self
            .scene
            .get(id)
            .and_then(Shape::as_text)
            .is_none_or(|t| t.content == content);
        if unchanged {
            return false;
        }
        self.scene
            .modify(id, |shape| {
                if let Some(text) = shape.as_text_mut() {
                    text.set_content(content.to_string());
                }
            })
            .is_ok()
    }

    pub fn begin_text_edit(&mut self, id: ShapeId) -> bool {
        self.scene.enter_text_editing(id)
    }

    pub fn end_text_edit(&mut self) {
        self.scene.exit_text_editing();
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.scene.selection() else {
            return false;
        };
        self.menu.hide();
        self.scene.remove(id).is_some()
    }

    /// Clone the selection, offset so it doesn't cover the original, and select the clone.
    pub fn duplicate_selected(&mut self) -> Option<ShapeId> {
        let mut copy = self.scene.selected_shape()?.clone();
        copy.regenerate_id();
        let (dx, dy) = self.config.duplicate_offset;
        copy.transform(Affine::translate((dx, dy)));
        let id = self.scene.insert(copy);
        self.select_and_show(id, None);
        Some(id)
    }

    pub fn set_selected_color(&mut self, color: SerializableColor) -> bool {
        let Some(id) = self.scene.selection() else {
            return false;
        };
        self.scene.modify(id, |shape| shape.set_fill(color)).is_ok()
    }

    /// Add a comment bubble to the right of the selection.
    pub fn add_comment(&mut self) -> Option<ShapeId> {
        let bounds = self.scene.selected_bounds()?;
        let comment = Text::comment(
            Point::new(bounds.x1 + 10.0, bounds.y0),
            self.config.comment_placeholder.clone(),
        );
        let id = self.scene.insert(Shape::Text(comment));
        self.select_and_show(id, None);
        self.scene.enter_text_editing(id);
        Some(id)
    }

    pub fn apply_menu_action(&mut self, action: MenuAction) -> bool {
        match action {
            MenuAction::Delete => self.delete_selected(),
            MenuAction::Duplicate => self.duplicate_selected().is_some(),
            MenuAction::SetColor(color) => self.set_selected_color(color),
            MenuAction::AddComment => self.add_comment().is_some(),
        }
    }

    pub fn move_selected(&mut self, dx: f64, dy: f64) -> bool {
        self.transform_selected(Affine::translate((dx, dy)))
    }

    /// Scale the selection about its center.
    pub fn scale_selected(&mut self, factor: f64) -> bool {
        let Some(bounds) = self.scene.selected_bounds() else {
            return false;
        };
        if factor <= 0.0 {
            return false;
        }
        let c = bounds.center().to_vec2();
        self.transform_selected(Affine::translate(c) * Affine::scale(factor) * Affine::translate(-c))
    }

    pub fn rotate_selected(&mut self, radians: f64) -> bool {
        let Some(id) = self.scene.selection() else {
            return false;
        };
        let ok = self.scene.modify(id, |shape| shape.rotate_by(radians)).is_ok();
        self.follow_selection();
        ok
    }

    fn transform_selected(&mut self, affine: Affine) -> bool {
        let Some(id) = self.scene.selection() else {
            return false;
        };
        let ok = self.scene.transform(id, affine).is_ok();
        self.follow_selection();
        ok
    }

    fn follow_selection(&mut self) {
        if let (Some(id), Some(bounds)) = (self.scene.selection(), self.scene.selected_bounds()) {
            self.menu.follow(id, bounds);
        }
    }

    /// Validate, decode and install a still image as the background.
    /// Video files must be reduced to a frame by the caller and passed to [`Canvas::load_background`].
    pub fn load_background_file(&mut self, mime: &str, bytes: Vec<u8>) -> Result<Size, BackgroundError> {
        match validate_upload(mime, bytes.len() as u64)? {
            MediaKind::Image => {
                let source = BitmapSource::decode(bytes)?;
                Ok(self.load_background(&source))
            }
            MediaKind::Video => Err(BackgroundError::UnsupportedFormat),
        }
    }

    /// Install `source` as the background and resize the surface to its fitted size.
    pub fn load_background(&mut self, source: &BitmapSource) -> Size {
        let layer = BackgroundLayer::from_source(source, &self.fit_bounds());
        if self.config.background_policy == BackgroundPolicy::ClearObjects {
            self.menu.hide();
        }
        log::info!(
            "Background {}x{} displayed at {}x{}",
            layer.source_width,
            layer.source_height,
            layer.display_width,
            layer.display_height
        );
        self.scene.set_background(layer, self.config.background_policy);
        self.scene.surface_size()
    }

    /// Place an image object centered on the surface, at most half its size.
    pub fn add_image(&mut self, source: &BitmapSource) -> ShapeId {
        let surface = self.scene.surface_size();
        let mut image = Image::new(Point::ZERO, &source.bytes, source.width, source.height, source.format);
        if image.width > surface.width / 2.0 || image.height > surface.height / 2.0 {
            image = image.fit_within(surface.width / 2.0, surface.height / 2.0);
        }
        image.position = Point::new(
            (surface.width - image.width) / 2.0,
            (surface.height - image.height) / 2.0,
        );
        let id = self.scene.insert(Shape::Image(image));
        self.select_and_show(id, None);
        id
    }

    /// Remove every object and the background.
    pub fn clear(&mut self) {
        self.clear_selection();
        self.scene.clear();
    }

    // --- Tools ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.drag = None;
        if self.drawing.set_tool(tool) == ModeChange::EnteredDrawing {
            self.clear_selection();
        }
        self.scene.request_render();
    }

    pub fn set_brush_color(&mut self, color: SerializableColor) {
        self.drawing.set_brush_color(color);
    }

    pub fn set_brush_width(&mut self, width: f64) {
        self.drawing.set_brush_width(width);
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        self.settle_pending();
        let changed = self.history.undo(&mut self.scene);
        self.after_restore();
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.settle_pending();
        let changed = self.history.redo(&mut self.scene);
        self.after_restore();
        changed
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Commit a drag or stroke still in progress so history starts from the live scene.
    fn settle_pending(&mut self) {
        if let Some(drag) = self.drag.take() {
            if drag.moved {
                if let Err(e) = self.scene.commit_modified(drag.id) {
                    log::warn!("Drag ended on missing object: {}", e);
                }
            }
        }
        if let Some(stroke) = self.drawing.finish_stroke() {
            self.scene.insert_path(stroke);
        }
    }

    fn after_restore(&mut self) {
        match self.scene.selection() {
            None => self.menu.hide(),
            Some(_) => self.follow_selection(),
        }
        self.drag = None;
    }

    // --- Pointer input (surface coordinates) ---

    pub fn pointer_down(&mut self, point: Point) {
        if self.drawing.is_drawing() {
            self.drawing.begin_stroke(point);
            self.scene.request_render();
            return;
        }
        match self.scene.hit_test(point, self.config.hit_tolerance) {
            Some(id) => {
                if self.scene.editing().is_some_and(|e| e != id) {
                    self.scene.exit_text_editing();
                }
                self.select_and_show(id, None);
                self.drag = Some(DragState {
                    id,
                    last: point,
                    moved: false,
                });
            }
            None => self.clear_selection(),
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        if self.drawing.is_drawing() {
            if self.drawing.active_stroke().is_some() {
                self.drawing.extend_stroke(point);
                self.scene.request_render();
            }
            return;
        }
        let Some(drag) = &mut self.drag else {
            return;
        };
        let delta: Vec2 = point - drag.last;
        drag.last = point;
        drag.moved = true;
        let id = drag.id;
        if self
            .scene
            .modify_silently(id, |s| s.transform(Affine::translate(delta)))
            .is_err()
        {
            self.drag = None;
        }
        self.follow_selection();
    }

    pub fn pointer_up(&mut self, point: Point) {
        if self.drawing.is_drawing() {
            self.drawing.extend_stroke(point);
            if let Some(stroke) = self.drawing.finish_stroke() {
                self.scene.insert_path(stroke);
            }
            return;
        }
        if let Some(drag) = self.drag.take() {
            if drag.moved {
                if let Err(e) = self.scene.commit_modified(drag.id) {
                    log::warn!("Drag ended on missing object: {}", e);
                }
            }
        }
    }

    /// Secondary-button click: select what's under the pointer and open the menu there.
    pub fn context_click(&mut self, point: Point) -> bool {
        if self.drawing.is_drawing() {
            return false;
        }
        match self.scene.hit_test(point, self.config.hit_tolerance) {
            Some(id) => {
                self.select_and_show(id, Some(point));
                true
            }
            None => false,
        }
    }

    /// Double click on text starts editing it.
    pub fn double_click(&mut self, point: Point) -> bool {
        match self.scene.hit_test(point, self.config.hit_tolerance) {
            Some(id) => self.scene.enter_text_editing(id),
            None => false,
        }
    }

    /// A press anywhere in the document; dismisses the menu when outside canvas and menu.
    pub fn document_pointer_down(&mut self, target: PointerTarget) {
        if self.menu.on_pointer_down(target) {
            self.scene.clear_selection();
        }
    }

    /// Escape: drop selection, editing and the menu.
    pub fn escape(&mut self) {
        self.drawing.cancel_stroke();
        self.clear_selection();
    }

    // --- Rendering ---

    /// Keep painting every frame (while streaming) or only on change.
    pub fn set_continuous_render(&mut self, continuous: bool) {
        self.scene.render_requests().set_continuous(continuous);
    }

    /// Consume the pending render request. True if a frame should be drawn now.
    pub fn take_render_request(&mut self) -> bool {
        self.scene.render_requests().take()
    }
}
