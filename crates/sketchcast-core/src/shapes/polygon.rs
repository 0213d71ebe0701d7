//! Closed polygon.

use super::{
    InteractionFlags, SerializableColor, ShapeId, ShapeStyle, ShapeTrait, points_bounds,
    polygon_contains, point_to_polyline_dist, rotation_about,
};
use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A closed polygon through an ordered list of vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub(crate) id: ShapeId,
    pub points: Vec<Point>,
    /// Rotation around the center of the unrotated bounds.
    #[serde(default)]
    pub rotation: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: InteractionFlags,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            rotation: 0.0,
            style: ShapeStyle::default(),
            flags: InteractionFlags::default(),
        }
    }

    /// The toolbar's default pentagon, pink.
    pub fn default_shape() -> Self {
        let mut polygon = Self::new(vec![
            Point::new(100.0, 50.0),
            Point::new(140.0, 100.0),
            Point::new(120.0, 160.0),
            Point::new(80.0, 160.0),
            Point::new(60.0, 100.0),
        ]);
        polygon.style = ShapeStyle::new(
            SerializableColor::new(0xdb, 0x27, 0x77, 255),
            2.0,
            Some(SerializableColor::new(0xfb, 0xcf, 0xe8, 255)),
        );
        polygon
    }

    /// Vertices in canvas coordinates, rotation applied.
    pub fn world_points(&self) -> Vec<Point> {
        if self.rotation == 0.0 {
            return self.points.clone();
        }
        let rot = rotation_about(points_bounds(&self.points).center(), self.rotation);
        self.points.iter().map(|p| rot * *p).collect()
    }
}

impl ShapeTrait for Polygon {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        points_bounds(&self.world_points())
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let pts = self.world_points();
        if self.style.fill_color.is_some() && polygon_contains(&pts, point) {
            return true;
        }
        let mut closed = pts.clone();
        if let Some(first) = pts.first() {
            closed.push(*first);
        }
        point_to_polyline_dist(point, &closed) <= tolerance + self.style.stroke_width / 2.0
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let pts = self.world_points();
        if let Some((first, rest)) = pts.split_first() {
            path.move_to(*first);
            for p in rest {
                path.line_to(*p);
            }
            path.close_path();
        }
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        for p in &mut self.points {
            *p = affine * *p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let polygon = Polygon::default_shape();
        let bounds = polygon.bounds();
        assert_eq!(bounds, Rect::new(60.0, 50.0, 140.0, 160.0));
    }

    #[test]
    fn test_hit_inside() {
        let polygon = Polygon::default_shape();
        assert!(polygon.hit_test(Point::new(100.0, 110.0), 0.0));
        assert!(!polygon.hit_test(Point::new(10.0, 10.0), 0.0));
    }
}
