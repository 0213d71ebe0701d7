//! Drawing mode: tool selection, brush settings and freehand stroke capture.

use crate::shapes::{
    CompositeMode, Freehand, SerializableColor, ShapeStyle, StrokeCap, StrokeJoin,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Brush,
    Pencil,
    Eraser,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "select" => Some(ToolKind::Select),
            "brush" => Some(ToolKind::Brush),
            "pencil" => Some(ToolKind::Pencil),
            "eraser" | "erase" => Some(ToolKind::Eraser),
            _ => None,
        }
    }

    /// The freehand instrument this tool drives, if any.
    pub fn instrument(&self) -> Option<Instrument> {
        match self {
            ToolKind::Select => None,
            ToolKind::Brush => Some(Instrument::Brush),
            ToolKind::Pencil => Some(Instrument::Pencil),
            ToolKind::Eraser => Some(Instrument::Eraser),
        }
    }
}

/// Freehand instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Brush,
    Pencil,
    Eraser,
}

/// Whether pointer input draws or manipulates objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawingMode {
    #[default]
    Idle,
    Drawing(Instrument),
}

/// User-facing brush parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    pub color: SerializableColor,
    pub width: f64,
}

impl BrushSettings {
    pub const MIN_WIDTH: f64 = 1.0;
    pub const MAX_WIDTH: f64 = 20.0;
    pub const DEFAULT_WIDTH: f64 = 5.0;
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: Self::DEFAULT_WIDTH,
        }
    }
}

/// Parameters actually applied to the active instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    pub instrument: Instrument,
    pub color: SerializableColor,
    pub width: f64,
    pub composite: CompositeMode,
    pub line_cap: StrokeCap,
    pub line_join: StrokeJoin,
}

impl InstrumentConfig {
    pub fn resolve(instrument: Instrument, brush: &BrushSettings) -> Self {
        match instrument {
            Instrument::Brush => Self {
                instrument,
                color: brush.color,
                width: brush.width,
                composite: CompositeMode::SourceOver,
                line_cap: StrokeCap::Round,
                line_join: StrokeJoin::Round,
            },
            Instrument::Pencil => Self {
                instrument,
                color: brush.color,
                width: brush.width * 0.5,
                composite: CompositeMode::SourceOver,
                line_cap: StrokeCap::Square,
                line_join: StrokeJoin::Miter,
            },
            Instrument::Eraser => Self {
                instrument,
                color: SerializableColor::white(),
                width: brush.width,
                composite: CompositeMode::DestinationOut,
                line_cap: StrokeCap::Round,
                line_join: StrokeJoin::Round,
            },
        }
    }
}

/// Result of a tool change, for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Unchanged,
    /// Selection must be cleared and the context menu hidden.
    EnteredDrawing,
    LeftDrawing,
    /// Switched between instruments while drawing.
    SwitchedInstrument,
}

/// Tracks the active tool and captures freehand strokes.
#[derive(Debug, Clone, Default)]
pub struct DrawingModeController {
    tool: ToolKind,
    mode: DrawingMode,
    brush: BrushSettings,
    instrument: Option<InstrumentConfig>,
    stroke: Option<Freehand>,
}

impl DrawingModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn mode(&self) -> DrawingMode {
        self.mode
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.mode, DrawingMode::Drawing(_))
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    /// Parameters on the active instrument; `None` when idle.
    pub fn instrument(&self) -> Option<&InstrumentConfig> {
        self.instrument.as_ref()
    }

    /// Change tool. Any stroke in progress is discarded.
    pub fn set_tool(&mut self, tool: ToolKind) -> ModeChange {
        let was_drawing = self.is_drawing();
        self.tool = tool;
        self.stroke = None;
        self.mode = match tool.instrument() {
            Some(instrument) => DrawingMode::Drawing(instrument),
            None => DrawingMode::Idle,
        };
        self.apply();
        log::debug!("Tool set to {:?}", tool);

        match (was_drawing, self.is_drawing()) {
            (false, true) => ModeChange::EnteredDrawing,
            (true, false) => ModeChange::LeftDrawing,
            (true, true) => ModeChange::SwitchedInstrument,
            (false, false) => ModeChange::Unchanged,
        }
    }

    pub fn set_brush_color(&mut self, color: SerializableColor) {
        self.brush.color = color;
        self.apply();
    }

    /// Set the brush width, clamped to the allowed range.
    pub fn set_brush_width(&mut self, width: f64) {
        self.brush.width = width.clamp(BrushSettings::MIN_WIDTH, BrushSettings::MAX_WIDTH);
        self.apply();
    }

    fn apply(&mut self) {
        self.instrument = match self.mode {
            DrawingMode::Drawing(instrument) => Some(InstrumentConfig::resolve(instrument, &self.brush)),
            DrawingMode::Idle => None,
        };
    }

    /// Start a stroke. Returns false when not in drawing mode.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        let Some(config) = &self.instrument else {
            return false;
        };
        let mut stroke = Freehand::from_points(vec![point]);
        stroke.style = ShapeStyle::new(config.color, config.width, None);
        stroke.composite = config.composite;
        stroke.line_cap = config.line_cap;
        stroke.line_join = config.line_join;
        self.stroke = Some(stroke);
        true
    }

    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(stroke) = &mut self.stroke {
            if stroke.points.last() != Some(&point) {
                stroke.add_point(point);
            }
        }
    }

    /// The stroke being drawn, for live preview.
    pub fn active_stroke(&self) -> Option<&Freehand> {
        self.stroke.as_ref()
    }

    /// Finish the current stroke, returning it ready to insert into the scene.
    pub fn finish_stroke(&mut self) -> Option<Freehand> {
        let mut stroke = self.stroke.take()?;
        stroke.simplify(0.5);
        Some(stroke)
    }

    pub fn cancel_stroke(&mut self) {
        self.stroke = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_transitions() {
        let mut ctl = DrawingModeController::new();
        assert_eq!(ctl.mode(), DrawingMode::Idle);
        assert!(ctl.instrument().is_none());

        assert_eq!(ctl.set_tool(ToolKind::Brush), ModeChange::EnteredDrawing);
        assert_eq!(ctl.mode(), DrawingMode::Drawing(Instrument::Brush));
        assert_eq!(ctl.set_tool(ToolKind::Eraser), ModeChange::SwitchedInstrument);
        assert_eq!(ctl.set_tool(ToolKind::Select), ModeChange::LeftDrawing);
        assert_eq!(ctl.set_tool(ToolKind::Select), ModeChange::Unchanged);
    }

    #[test]
    fn test_brush_defaults() {
        let mut ctl = DrawingModeController::new();
        ctl.set_tool(ToolKind::Brush);
        let cfg = ctl.instrument().unwrap();
        assert_eq!(cfg.color.to_hex(), "#000000");
        assert!((cfg.width - 5.0).abs() < f64::EPSILON);
        assert_eq!(cfg.line_cap, StrokeCap::Round);
        assert_eq!(cfg.composite, CompositeMode::SourceOver);
    }

    #[test]
    fn test_params_reapplied_while_drawing() {
        let mut ctl = DrawingModeController::new();
        ctl.set_tool(ToolKind::Pencil);
        ctl.set_brush_width(12.0);
        ctl.set_brush_color(SerializableColor::from_hex("#ff0000").unwrap());
        let cfg = ctl.instrument().unwrap();
        assert!((cfg.width - 6.0).abs() < f64::EPSILON);
        assert_eq!(cfg.color.to_hex(), "#ff0000");
        assert_eq!(cfg.line_cap, StrokeCap::Square);
    }

    #[test]
    fn test_width_clamped() {
        let mut ctl = DrawingModeController::new();
        ctl.set_brush_width(100.0);
        assert!((ctl.brush().width - 20.0).abs() < f64::EPSILON);
        ctl.set_brush_width(0.0);
        assert!((ctl.brush().width - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_eraser_forces_white_and_subtractive() {
        let mut ctl = DrawingModeController::new();
        ctl.set_brush_color(SerializableColor::from_hex("#123456").unwrap());
        ctl.set_tool(ToolKind::Eraser);
        let cfg = ctl.instrument().unwrap();
        assert_eq!(cfg.color, SerializableColor::white());
        assert_eq!(cfg.composite, CompositeMode::DestinationOut);
    }

    #[test]
    fn test_stroke_capture() {
        let mut ctl = DrawingModeController::new();
        assert!(!ctl.begin_stroke(Point::ZERO));

        ctl.set_tool(ToolKind::Eraser);
        assert!(ctl.begin_stroke(Point::new(0.0, 0.0)));
        ctl.extend_stroke(Point::new(10.0, 5.0));
        ctl.extend_stroke(Point::new(10.0, 5.0));
        ctl.extend_stroke(Point::new(20.0, 0.0));
        let stroke = ctl.finish_stroke().unwrap();
        assert_eq!(stroke.len(), 3);
        assert!(stroke.is_eraser());
        assert!(ctl.finish_stroke().is_none());
    }

    #[test]
    fn test_tool_change_discards_stroke() {
        let mut ctl = DrawingModeController::new();
        ctl.set_tool(ToolKind::Brush);
        ctl.begin_stroke(Point::ZERO);
        ctl.set_tool(ToolKind::Pencil);
        assert!(ctl.active_stroke().is_none());
    }
}
