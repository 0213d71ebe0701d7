//! Floating action menu anchored to the selected object.

use crate::shapes::{SerializableColor, ShapeId};
use kurbo::{Point, Rect};

/// Fill colors offered as one-click swatches.
pub const QUICK_COLORS: [&str; 4] = ["#e0e7ff", "#fef9c3", "#d1fae5", "#fbcfe8"];

/// Vertical gap between the menu anchor and the object's top edge.
pub const MENU_OFFSET_Y: f64 = 48.0;
/// Horizontal inset keeping the (centered) menu inside the container.
pub const MENU_INSET_X: f64 = 150.0;
/// Vertical inset from the container edges.
pub const MENU_INSET_Y: f64 = 10.0;

/// An action offered by the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Delete,
    Duplicate,
    SetColor(SerializableColor),
    AddComment,
}

impl MenuAction {
    /// All actions in display order.
    pub fn all() -> Vec<MenuAction> {
        let mut actions = vec![MenuAction::Delete, MenuAction::Duplicate];
        actions.extend(
            QUICK_COLORS
                .iter()
                .filter_map(|hex| SerializableColor::from_hex(hex))
                .map(MenuAction::SetColor),
        );
        actions.push(MenuAction::AddComment);
        actions
    }
}

/// Where a pointer press landed, as reported by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Canvas,
    Menu,
    Outside,
}

/// Page-space rectangles the menu is positioned against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuLayout {
    /// The drawing surface; object bounds are relative to its origin.
    pub canvas: Rect,
    /// The container the menu must stay within.
    pub container: Rect,
}

impl MenuLayout {
    pub fn new(canvas: Rect, container: Rect) -> Self {
        Self { canvas, container }
    }

    /// Anchor for a menu targeting `bounds` (surface coordinates).
    /// A context-click `pointer` takes precedence over the object's center.
    pub fn position(&self, bounds: Rect, pointer: Option<Point>) -> Point {
        let origin = self.canvas.origin();
        let (x, y) = match pointer {
            Some(p) => (origin.x + p.x, origin.y + p.y - MENU_OFFSET_Y),
            None => (
                origin.x + bounds.x0 + bounds.width() / 2.0,
                origin.y + bounds.y0 - MENU_OFFSET_Y,
            ),
        };
        let c = self.container;
        Point::new(
            clamp_inset(x, c.x0, c.x1, MENU_INSET_X),
            clamp_inset(y, c.y0, c.y1, MENU_INSET_Y),
        )
    }
}

/// Keep `value` at least `inset` inside `[lo, hi]`; a span too small for the
/// insets pins it to the middle.
fn clamp_inset(value: f64, lo: f64, hi: f64, inset: f64) -> f64 {
    let (min, max) = (lo + inset, hi - inset);
    if max < min {
        return (lo + hi) / 2.0;
    }
    value.clamp(min, max)
}

impl Default for MenuLayout {
    fn default() -> Self {
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        Self::new(rect, rect)
    }
}

/// Visibility, placement and target of the menu.
#[derive(Debug, Clone, Default)]
pub struct ContextMenuController {
    layout: MenuLayout,
    visible: bool,
    position: Point,
    target: Option<ShapeId>,
}

impl ContextMenuController {
    pub fn new(layout: MenuLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn set_layout(&mut self, layout: MenuLayout) {
        self.layout = layout;
    }

    pub fn layout(&self) -> MenuLayout {
        self.layout
    }

    /// Show the menu for `target`.
    pub fn show(&mut self, target: ShapeId, bounds: Rect, pointer: Option<Point>) {
        self.position = self.layout.position(bounds, pointer);
        self.target = Some(target);
        self.visible = true;
    }

    /// Re-anchor after the target moved. No-op when hidden or targeting something else.
    pub fn follow(&mut self, target: ShapeId, bounds: Rect) {
        if self.visible && self.target == Some(target) {
            self.position = self.layout.position(bounds, None);
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.target = None;
    }

    /// Pointer presses outside both the canvas and the menu dismiss it.
    /// Returns true if the menu was dismissed.
    pub fn on_pointer_down(&mut self, target: PointerTarget) -> bool {
        if self.visible && target == PointerTarget::Outside {
            self.hide();
            return true;
        }
        false
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn position(&self) -> Option<Point> {
        self.visible.then_some(self.position)
    }

    pub fn target(&self) -> Option<ShapeId> {
        self.target
    }
}
