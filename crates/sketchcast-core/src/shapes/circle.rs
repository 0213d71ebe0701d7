//! Circle shape.

use super::{InteractionFlags, SerializableColor, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Circle as KurboCircle, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A circle defined by center and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub(crate) id: ShapeId,
    pub center: Point,
    pub radius: f64,
    /// Rotation angle in radians. Has no visual effect but is kept for round-tripping.
    #[serde(default)]
    pub rotation: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: InteractionFlags,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius,
            rotation: 0.0,
            style: ShapeStyle::default(),
            flags: InteractionFlags::default(),
        }
    }

    /// The toolbar's default circle: radius 60 with its bounding box at (140, 140).
    pub fn default_shape() -> Self {
        let mut circle = Self::new(Point::new(200.0, 200.0), 60.0);
        circle.style = ShapeStyle::new(
            SerializableColor::new(0xf5, 0x9e, 0x42, 255),
            2.0,
            Some(SerializableColor::new(0xfe, 0xf9, 0xc3, 255)),
        );
        circle
    }

    fn as_kurbo(&self) -> KurboCircle {
        KurboCircle::new(self.center, self.radius)
    }
}

impl ShapeTrait for Circle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_kurbo().bounding_box()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dist = (point - self.center).hypot();
        if self.style.fill_color.is_some() {
            dist <= self.radius + tolerance
        } else {
            (dist - self.radius).abs() <= tolerance + self.style.stroke_width / 2.0
        }
    }

    fn to_path(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.center = affine * self.center;
        let coeffs = affine.as_coeffs();
        self.radius *= (coeffs[0].abs() + coeffs[3].abs()) / 2.0;
    }
}
