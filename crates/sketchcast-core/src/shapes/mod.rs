//! Scene object definitions.

mod circle;
mod freehand;
mod image;
mod line;
mod polygon;
mod rectangle;
mod text;
mod triangle;

pub use circle::Circle;
pub use freehand::Freehand;
pub use image::{Image, ImageFormat};
pub use line::Line;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use text::Text;
pub use triangle::Triangle;

use kurbo::{Affine, BezPath, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as a CSS hex color. Alpha is only emitted when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// How a stroke's pixels combine with what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompositeMode {
    /// Normal additive painting.
    #[default]
    SourceOver,
    /// Subtractive painting (erasing).
    DestinationOut,
}

impl CompositeMode {
    /// Canvas 2D `globalCompositeOperation` name.
    pub fn css_name(&self) -> &'static str {
        match self {
            CompositeMode::SourceOver => "source-over",
            CompositeMode::DestinationOut => "destination-out",
        }
    }
}

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeJoin {
    Miter,
    #[default]
    Round,
    Bevel,
}

/// Style properties for scene objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color.
    pub stroke_color: SerializableColor,
    /// Stroke width.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl ShapeStyle {
    /// Style with the given stroke and fill.
    pub fn new(stroke: SerializableColor, stroke_width: f64, fill: Option<SerializableColor>) -> Self {
        Self {
            stroke_color: stroke,
            stroke_width,
            fill_color: fill,
            opacity: 1.0,
        }
    }

    /// Get the stroke color as a peniko Color.
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        with_opacity(self.stroke_color, self.opacity)
    }

    /// Get the fill color as a peniko Color.
    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| c.into())
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| with_opacity(c, self.opacity))
    }
}

fn with_opacity(color: SerializableColor, opacity: f64) -> Color {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)) as u8;
    Color::from_rgba8(color.r, color.g, color.b, alpha)
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self::new(SerializableColor::black(), 2.0, None)
    }
}

/// Whether an object takes part in pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionFlags {
    /// Can become the active selection.
    pub selectable: bool,
    /// Receives pointer events (hit testing).
    pub evented: bool,
}

impl Default for InteractionFlags {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
        }
    }
}

/// Unique identifier for scene objects.
pub type ShapeId = Uuid;

/// The kinds of object the toolbar can insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Line,
    Polygon,
    Freehand,
    Text,
    Image,
}

impl ShapeKind {
    /// Resolve a toolbar shape name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rect" | "rectangle" => Some(ShapeKind::Rectangle),
            "circle" => Some(ShapeKind::Circle),
            "triangle" => Some(ShapeKind::Triangle),
            "line" => Some(ShapeKind::Line),
            "polygon" => Some(ShapeKind::Polygon),
            _ => None,
        }
    }

    /// Whether `add_shape` can build this kind from defaults alone.
    pub fn is_basic_shape(&self) -> bool {
        matches!(
            self,
            ShapeKind::Rectangle
                | ShapeKind::Circle
                | ShapeKind::Triangle
                | ShapeKind::Line
                | ShapeKind::Polygon
        )
    }
}

/// Caller-supplied geometry overriding a kind's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InitialGeometry {
    pub position: Option<Point>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub radius: Option<f64>,
    pub rotation: Option<f64>,
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    if points.len() == 1 {
        return (points[0] - point).hypot();
    }
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Rotation by `angle` radians around `center`.
pub(crate) fn rotation_about(center: Point, angle: f64) -> Affine {
    Affine::translate(center.to_vec2()) * Affine::rotate(angle) * Affine::translate(-center.to_vec2())
}

/// Bounds of the path points, or an empty rect at the origin.
pub(crate) fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Polygon containment by ray casting.
pub(crate) fn polygon_contains(points: &[Point], point: Point) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (points[i], points[j]);
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Common trait for all scene objects.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the axis-aligned bounding box in canvas coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point hits this object.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Get the path representation for rendering.
    fn to_path(&self) -> BezPath;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Apply a transform to this object.
    fn transform(&mut self, affine: Affine);
}

/// Enum wrapper for all object types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
    Triangle(Triangle),
    Line(Line),
    Polygon(Polygon),
    Freehand(Freehand),
    Text(Text),
    Image(Image),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Shape::Rectangle($s) => $body,
            Shape::Circle($s) => $body,
            Shape::Triangle($s) => $body,
            Shape::Line($s) => $body,
            Shape::Polygon($s) => $body,
            Shape::Freehand($s) => $body,
            Shape::Text($s) => $body,
            Shape::Image($s) => $body,
        }
    };
}

impl Shape {
    /// Build an object of `kind` from its defaults, overridden by `geometry`.
    /// Returns `None` for kinds that need more than geometry (freehand, text, image).
    pub fn with_defaults(kind: ShapeKind, geometry: &InitialGeometry) -> Option<Self> {
        let mut shape = match kind {
            ShapeKind::Rectangle => {
                let mut rect = Rectangle::default_shape();
                if let Some(p) = geometry.position {
                    rect.position = p;
                }
                rect.width = geometry.width.unwrap_or(rect.width);
                rect.height = geometry.height.unwrap_or(rect.height);
                Shape::Rectangle(rect)
            }
            ShapeKind::Circle => {
                let mut circle = Circle::default_shape();
                if let Some(p) = geometry.position {
                    circle.center = Point::new(p.x + circle.radius, p.y + circle.radius);
                }
                if let Some(r) = geometry.radius {
                    let top_left = circle.center - Vec2::new(circle.radius, circle.radius);
                    circle.radius = r;
                    circle.center = top_left + Vec2::new(r, r);
                }
                Shape::Circle(circle)
            }
            ShapeKind::Triangle => {
                let mut tri = Triangle::default_shape();
                if let Some(p) = geometry.position {
                    tri.position = p;
                }
                tri.width = geometry.width.unwrap_or(tri.width);
                tri.height = geometry.height.unwrap_or(tri.height);
                Shape::Triangle(tri)
            }
            ShapeKind::Line => {
                let mut line = Line::default_shape();
                if let Some(p) = geometry.position {
                    let delta = p - line.start;
                    line.transform(Affine::translate(delta));
                }
                Shape::Line(line)
            }
            ShapeKind::Polygon => {
                let mut polygon = Polygon::default_shape();
                if let Some(p) = geometry.position {
                    let origin = polygon.bounds().origin();
                    polygon.transform(Affine::translate(p - origin));
                }
                Shape::Polygon(polygon)
            }
            ShapeKind::Freehand | ShapeKind::Text | ShapeKind::Image => return None,
        };
        if let Some(rotation) = geometry.rotation {
            shape.rotate_by(rotation);
        }
        Some(shape)
    }

    pub fn id(&self) -> ShapeId {
        dispatch!(self, s => s.id())
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Triangle(_) => ShapeKind::Triangle,
            Shape::Line(_) => ShapeKind::Line,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Freehand(_) => ShapeKind::Freehand,
            Shape::Text(_) => ShapeKind::Text,
            Shape::Image(_) => ShapeKind::Image,
        }
    }

    pub fn bounds(&self) -> Rect {
        dispatch!(self, s => s.bounds())
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        dispatch!(self, s => s.hit_test(point, tolerance))
    }

    pub fn to_path(&self) -> BezPath {
        dispatch!(self, s => s.to_path())
    }

    pub fn style(&self) -> &ShapeStyle {
        dispatch!(self, s => s.style())
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        dispatch!(self, s => s.style_mut())
    }

    pub fn transform(&mut self, affine: Affine) {
        dispatch!(self, s => s.transform(affine))
    }

    pub fn flags(&self) -> InteractionFlags {
        dispatch!(self, s => s.flags)
    }

    pub fn flags_mut(&mut self) -> &mut InteractionFlags {
        dispatch!(self, s => &mut s.flags)
    }

    /// Regenerate the object's ID (used when duplicating).
    pub fn regenerate_id(&mut self) {
        let new_id = Uuid::new_v4();
        dispatch!(self, s => s.id = new_id)
    }

    /// Get the rotation angle in radians (0 for objects that don't rotate).
    pub fn rotation(&self) -> f64 {
        match self {
            Shape::Rectangle(r) => r.rotation,
            Shape::Circle(c) => c.rotation,
            Shape::Triangle(t) => t.rotation,
            Shape::Polygon(p) => p.rotation,
            Shape::Text(t) => t.rotation,
            Shape::Image(i) => i.rotation,
            Shape::Line(_) | Shape::Freehand(_) => 0.0,
        }
    }

    /// Rotate by `delta` radians around the object's center. Lines and strokes
    /// have no rotation field and are rotated in place instead.
    pub fn rotate_by(&mut self, delta: f64) {
        match self {
            Shape::Rectangle(r) => r.rotation += delta,
            Shape::Circle(c) => c.rotation += delta,
            Shape::Triangle(t) => t.rotation += delta,
            Shape::Polygon(p) => p.rotation += delta,
            Shape::Text(t) => t.rotation += delta,
            Shape::Image(i) => i.rotation += delta,
            Shape::Line(_) | Shape::Freehand(_) => {
                let center = self.bounds().center();
                self.transform(rotation_about(center, delta));
            }
        }
    }

    /// Set the fill color. For text this is the glyph color.
    pub fn set_fill(&mut self, color: SerializableColor) {
        self.style_mut().fill_color = Some(color);
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Shape::Image(img) => Some(img),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let c = SerializableColor::from_hex("#e0e7ff").unwrap();
        assert_eq!(c, SerializableColor::new(0xe0, 0xe7, 0xff, 255));
        assert_eq!(c.to_hex(), "#e0e7ff");
        assert_eq!(
            SerializableColor::from_hex("#fff"),
            Some(SerializableColor::white())
        );
        assert_eq!(SerializableColor::from_hex("e0e7ff"), None);
        assert_eq!(SerializableColor::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ShapeKind::from_name("rect"), Some(ShapeKind::Rectangle));
        assert_eq!(ShapeKind::from_name("Circle"), Some(ShapeKind::Circle));
        assert_eq!(ShapeKind::from_name("hexagon"), None);
    }

    #[test]
    fn test_defaults_per_kind() {
        let geometry = InitialGeometry::default();
        for kind in [
            ShapeKind::Rectangle,
            ShapeKind::Circle,
            ShapeKind::Triangle,
            ShapeKind::Line,
            ShapeKind::Polygon,
        ] {
            let shape = Shape::with_defaults(kind, &geometry).unwrap();
            assert_eq!(shape.kind(), kind);
            assert!(shape.flags().selectable);
            assert!(shape.bounds().area() > 0.0);
        }
        assert!(Shape::with_defaults(ShapeKind::Text, &geometry).is_none());
    }

    #[test]
    fn test_geometry_override() {
        let geometry = InitialGeometry {
            position: Some(Point::new(5.0, 6.0)),
            width: Some(40.0),
            height: Some(30.0),
            ..Default::default()
        };
        let shape = Shape::with_defaults(ShapeKind::Rectangle, &geometry).unwrap();
        let bounds = shape.bounds();
        assert!((bounds.x0 - 5.0).abs() < 1e-9);
        assert!((bounds.width() - 40.0).abs() < 1e-9);
        assert!((bounds.height() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_serialization_is_tagged() {
        let shape = Shape::with_defaults(ShapeKind::Circle, &InitialGeometry::default()).unwrap();
        let json = serde_json::to_string(&shape).unwrap();
        assert!(json.contains("\"type\":\"circle\""));
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&square, Point::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, Point::new(15.0, 5.0)));
    }
}
