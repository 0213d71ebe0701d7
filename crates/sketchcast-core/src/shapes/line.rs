//! Straight line segment.

use super::{InteractionFlags, SerializableColor, ShapeId, ShapeStyle, ShapeTrait, point_to_segment_dist};
use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A line segment between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: ShapeId,
    pub start: Point,
    pub end: Point,
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: InteractionFlags,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            style: ShapeStyle::default(),
            flags: InteractionFlags::default(),
        }
    }

    /// The toolbar's default line: (60, 60) to (200, 200), 4px indigo.
    pub fn default_shape() -> Self {
        let mut line = Self::new(Point::new(60.0, 60.0), Point::new(200.0, 200.0));
        line.style = ShapeStyle::new(SerializableColor::new(0x63, 0x66, 0xf1, 255), 4.0, None);
        line
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).hypot()
    }
}

impl ShapeTrait for Line {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start, self.end) <= tolerance + self.style.stroke_width / 2.0
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.start = affine * self.start;
        self.end = affine * self.end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_test() {
        let line = Line::default_shape();
        assert!(line.hit_test(Point::new(130.0, 130.0), 0.0));
        assert!(!line.hit_test(Point::new(130.0, 60.0), 2.0));
    }

    #[test]
    fn test_translate() {
        let mut line = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        line.transform(Affine::translate((20.0, 20.0)));
        assert_eq!(line.start, Point::new(20.0, 20.0));
        assert!((line.length() - 10.0).abs() < f64::EPSILON);
    }
}
