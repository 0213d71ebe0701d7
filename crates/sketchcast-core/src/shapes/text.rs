//! Text objects, including comment bubbles.

use super::{InteractionFlags, SerializableColor, ShapeId, ShapeStyle, ShapeTrait, rotation_about};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An editable text box. Glyph color is `style.fill_color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    pub content: String,
    pub font_size: f64,
    pub font_family: String,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    /// Box painted behind the glyphs.
    #[serde(default)]
    pub background: Option<SerializableColor>,
    /// Inner padding between the background box and the glyphs.
    #[serde(default)]
    pub padding: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: InteractionFlags,
}

impl Text {
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;
    pub const DEFAULT_FONT_FAMILY: &'static str = "sans-serif";

    /// Create a new text object with default styling (near-black glyphs).
    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: Self::DEFAULT_FONT_FAMILY.to_string(),
            rotation: 0.0,
            background: None,
            padding: 0.0,
            style: ShapeStyle::new(
                SerializableColor::transparent(),
                0.0,
                Some(SerializableColor::new(0x11, 0x18, 0x27, 255)),
            ),
            flags: InteractionFlags::default(),
        }
    }

    /// A comment bubble: small dark glyphs on a padded white box.
    pub fn comment(position: Point, content: String) -> Self {
        let mut text = Self::new(position, content).with_font_size(14.0);
        text.style.fill_color = Some(SerializableColor::new(0x37, 0x41, 0x51, 255));
        text.background = Some(SerializableColor::white());
        text.padding = 8.0;
        text
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Glyph color.
    pub fn color(&self) -> SerializableColor {
        self.style.fill_color.unwrap_or_else(SerializableColor::black)
    }

    /// Approximate width based on character count and font size.
    pub fn approximate_width(&self) -> f64 {
        let max_line_len = self
            .content
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        max_line_len as f64 * self.font_size * 0.55
    }

    /// Approximate height based on font size and number of lines.
    pub fn approximate_height(&self) -> f64 {
        let mut line_count = self.content.lines().count().max(1);
        if self.content.ends_with('\n') {
            line_count += 1;
        }
        line_count as f64 * self.font_size * 1.2
    }

    /// Unrotated box including padding.
    pub fn box_rect(&self) -> Rect {
        let width = self.approximate_width().max(20.0) + self.padding * 2.0;
        let height = self.approximate_height() + self.padding * 2.0;
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + width,
            self.position.y + height,
        )
    }

    fn rotation_transform(&self) -> Affine {
        rotation_about(self.box_rect().center(), self.rotation)
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        if self.rotation == 0.0 {
            self.box_rect()
        } else {
            self.to_path().bounding_box()
        }
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let local = self.rotation_transform().inverse() * point;
        self.box_rect().inflate(tolerance, tolerance).contains(local)
    }

    fn to_path(&self) -> BezPath {
        // Text has no outline; the box stands in for selection and hit testing
        let path = self.box_rect().to_path(0.1);
        if self.rotation == 0.0 {
            path
        } else {
            self.rotation_transform() * path
        }
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
        let coeffs = affine.as_coeffs();
        let scale = (coeffs[0].abs() + coeffs[3].abs()) / 2.0;
        if (scale - 1.0).abs() > 0.01 {
            self.font_size *= scale;
            self.padding *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_creation() {
        let text = Text::new(Point::new(10.0, 20.0), "Hello".to_string());
        assert_eq!(text.content(), "Hello");
        assert!((text.font_size - 24.0).abs() < f64::EPSILON);
        assert_eq!(text.color().to_hex(), "#111827");
    }

    #[test]
    fn test_comment_style() {
        let comment = Text::comment(Point::ZERO, "Add comment...".to_string());
        assert!((comment.font_size - 14.0).abs() < f64::EPSILON);
        assert_eq!(comment.background, Some(SerializableColor::white()));
        assert_eq!(comment.color().to_hex(), "#374151");
        assert!(comment.box_rect().height() > comment.approximate_height());
    }

    #[test]
    fn test_multiline_bounds() {
        let text = Text::new(Point::ZERO, "ab\nabcd".to_string());
        let bounds = text.bounds();
        assert!((bounds.height() - 2.0 * 24.0 * 1.2).abs() < 1e-9);
        assert!((bounds.width() - 4.0 * 24.0 * 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test() {
        let text = Text::new(Point::new(0.0, 0.0), "Hello".to_string());
        assert!(text.hit_test(Point::new(5.0, 5.0), 0.0));
        assert!(!text.hit_test(Point::new(500.0, 5.0), 0.0));
    }
}
