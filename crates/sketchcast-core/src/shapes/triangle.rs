//! Isosceles triangle shape.

use super::{
    InteractionFlags, SerializableColor, ShapeId, ShapeStyle, ShapeTrait, polygon_contains,
    point_to_polyline_dist, rotation_about,
};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A triangle with its apex at the top-center of its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub(crate) id: ShapeId,
    /// Top-left corner of the bounding box (before rotation).
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: InteractionFlags,
}

impl Triangle {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            rotation: 0.0,
            style: ShapeStyle::default(),
            flags: InteractionFlags::default(),
        }
    }

    /// The toolbar's default triangle: 100×100 at (180, 120), green.
    pub fn default_shape() -> Self {
        let mut tri = Self::new(Point::new(180.0, 120.0), 100.0, 100.0);
        tri.style = ShapeStyle::new(
            SerializableColor::new(0x10, 0xb9, 0x81, 255),
            2.0,
            Some(SerializableColor::new(0xd1, 0xfa, 0xe5, 255)),
        );
        tri
    }

    /// Vertices in canvas coordinates, rotation applied.
    pub fn vertices(&self) -> [Point; 3] {
        let Point { x, y } = self.position;
        let local = [
            Point::new(x + self.width / 2.0, y),
            Point::new(x + self.width, y + self.height),
            Point::new(x, y + self.height),
        ];
        if self.rotation == 0.0 {
            return local;
        }
        let center = Point::new(x + self.width / 2.0, y + self.height / 2.0);
        let rot = rotation_about(center, self.rotation);
        local.map(|p| rot * p)
    }
}

impl ShapeTrait for Triangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.to_path().bounding_box()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let verts = self.vertices();
        if self.style.fill_color.is_some() && polygon_contains(&verts, point) {
            return true;
        }
        let closed = [verts[0], verts[1], verts[2], verts[0]];
        point_to_polyline_dist(point, &closed) <= tolerance + self.style.stroke_width / 2.0
    }

    fn to_path(&self) -> BezPath {
        let [a, b, c] = self.vertices();
        let mut path = BezPath::new();
        path.move_to(a);
        path.line_to(b);
        path.line_to(c);
        path.close_path();
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
        let scale = affine.as_coeffs();
        self.width *= scale[0].abs();
        self.height *= scale[3].abs();
    }
}
