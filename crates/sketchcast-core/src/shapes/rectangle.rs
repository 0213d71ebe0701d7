//! Rectangle shape.

use super::{InteractionFlags, SerializableColor, ShapeId, ShapeStyle, ShapeTrait, rotation_about};
use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position (before rotation).
    pub position: Point,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
    /// Corner radius (0 = sharp corners).
    pub corner_radius: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    /// Style properties.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: InteractionFlags,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            corner_radius: 0.0,
            rotation: 0.0,
            style: ShapeStyle::default(),
            flags: InteractionFlags::default(),
        }
    }

    /// The toolbar's default rectangle: 120×80 at (100, 100), indigo outline.
    pub fn default_shape() -> Self {
        let mut rect = Self::new(Point::new(100.0, 100.0), 120.0, 80.0);
        rect.corner_radius = 8.0;
        rect.style = ShapeStyle::new(
            SerializableColor::new(0x63, 0x66, 0xf1, 255),
            2.0,
            Some(SerializableColor::new(0xe0, 0xe7, 0xff, 255)),
        );
        rect
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let min_x = p1.x.min(p2.x);
        let min_y = p1.y.min(p2.y);
        let width = (p2.x - p1.x).abs();
        let height = (p2.y - p1.y).abs();

        Self::new(Point::new(min_x, min_y), width, height)
    }

    /// Get the unrotated rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    fn rotation_transform(&self) -> Affine {
        rotation_about(self.as_rect().center(), self.rotation)
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        if self.rotation == 0.0 {
            self.as_rect()
        } else {
            self.to_path().bounding_box()
        }
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let local = self.rotation_transform().inverse() * point;
        let rect = self.as_rect();
        if self.style.fill_color.is_some() {
            rect.inflate(tolerance, tolerance).contains(local)
        } else {
            // Outline only: hit on the border
            let margin = tolerance + self.style.stroke_width / 2.0;
            let outer = rect.inflate(margin, margin);
            let inner = rect.inflate(-margin, -margin);
            outer.contains(local) && !inner.contains(local)
        }
    }

    fn to_path(&self) -> BezPath {
        let path = if self.corner_radius > 0.0 {
            RoundedRect::from_rect(self.as_rect(), self.corner_radius).to_path(0.1)
        } else {
            self.as_rect().to_path(0.1)
        };
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
        // Translation and axis scale only; rotation lives in `rotation`.
        let scale = affine.as_coeffs();
        self.width *= scale[0].abs();
        self.height *= scale[3].abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rectangle_creation() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        assert!((rect.position.x - 10.0).abs() < f64::EPSILON);
        assert!((rect.position.y - 20.0).abs() < f64::EPSILON);
        assert!((rect.width - 100.0).abs() < f64::EPSILON);
        assert!((rect.height - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rectangle_from_corners() {
        let rect = Rectangle::from_corners(Point::new(100.0, 100.0), Point::new(50.0, 50.0));
        assert!((rect.position.x - 50.0).abs() < f64::EPSILON);
        assert!((rect.width - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_shape() {
        let rect = Rectangle::default_shape();
        assert_eq!(rect.style.fill_color.unwrap().to_hex(), "#e0e7ff");
        assert_eq!(rect.style.stroke_color.to_hex(), "#6366f1");
        assert!((rect.corner_radius - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        rect.style.fill_color = Some(SerializableColor::white());
        assert!(rect.hit_test(Point::new(50.0, 50.0), 0.0));
        assert!(!rect.hit_test(Point::new(150.0, 50.0), 0.0));
        assert!(rect.hit_test(Point::new(105.0, 50.0), 10.0));
    }

    #[test]
    fn test_rotated_bounds() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0);
        rect.rotation = FRAC_PI_2;
        let bounds = rect.bounds();
        assert!((bounds.width() - 50.0).abs() < 1e-6);
        assert!((bounds.height() - 100.0).abs() < 1e-6);
    }
}
