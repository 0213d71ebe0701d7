//! Backend-neutral display list built from a canvas.

use crate::renderer::{RenderContext, RenderResult, Renderer};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape, Size};
use peniko::Color;
use sketchcast_core::shapes::{
    CompositeMode, Freehand, Image, Shape, ShapeId, ShapeStyle, StrokeCap, StrokeJoin, Text,
};

/// Dash used for the selection outline.
const SELECTION_DASH: [f64; 2] = [6.0, 4.0];
/// Gap between an object and its selection outline.
const SELECTION_MARGIN: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    pub cap: StrokeCap,
    pub join: StrokeJoin,
    pub dash: Vec<f64>,
}

impl StrokeStyle {
    fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            cap: StrokeCap::Butt,
            join: StrokeJoin::Miter,
            dash: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Top-left of the first line's box, before `transform`.
    pub origin: Point,
    pub lines: Vec<String>,
    pub font: String,
    pub line_height: f64,
    pub color: Color,
    /// Padded box drawn behind the text.
    pub backdrop: Option<(Rect, Color)>,
}

/// One drawing operation, in surface coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear { size: Size, color: Color },
    Background { data_url: String, rect: Rect },
    Path {
        path: BezPath,
        fill: Option<Color>,
        stroke: Option<StrokeStyle>,
        composite: CompositeMode,
        opacity: f64,
    },
    Text {
        layout: TextLayout,
        transform: Affine,
        opacity: f64,
    },
    Image {
        id: ShapeId,
        data_url: String,
        rect: Rect,
        transform: Affine,
        opacity: f64,
    },
}

/// Commands for one frame.
///
/// `surface` is what the capture stream sees. `overlay` holds editing chrome
/// (selection outline, in-progress stroke) drawn on a layer above it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    pub surface: Vec<DrawCommand>,
    pub overlay: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn build(ctx: &RenderContext) -> Self {
        let scene = ctx.canvas.scene();
        let document = scene.document();
        let size = document.surface_size();
        let mut list = DisplayList::default();

        list.surface.push(DrawCommand::Clear {
            size,
            color: ctx.background_color,
        });
        if let Some(background) = &document.background {
            list.surface.push(DrawCommand::Background {
                data_url: background.data_url(),
                rect: Rect::from_origin_size(Point::ZERO, size),
            });
        }
        for shape in scene.objects() {
            if ctx.editing_shape_id == Some(shape.id()) {
                continue;
            }
            list.surface.push(shape_command(shape));
        }

        if ctx.overlay {
            if let Some(stroke) = ctx.canvas.drawing().active_stroke() {
                list.overlay.push(freehand_command(stroke));
            }
            if let Some(bounds) = scene.selected_bounds() {
                let mut outline = StrokeStyle::solid(ctx.selection_color, 1.5);
                outline.dash = SELECTION_DASH.to_vec();
                list.overlay.push(DrawCommand::Path {
                    path: bounds.inflate(SELECTION_MARGIN, SELECTION_MARGIN).to_path(0.1),
                    fill: None,
                    stroke: Some(outline),
                    composite: CompositeMode::SourceOver,
                    opacity: 1.0,
                });
            }
        }
        list
    }

    pub fn len(&self) -> usize {
        self.surface.len() + self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn shape_command(shape: &Shape) -> DrawCommand {
    match shape {
        Shape::Freehand(stroke) => freehand_command(stroke),
        Shape::Text(text) => text_command(text),
        Shape::Image(image) => image_command(shape.id(), image),
        other => path_command(other.to_path(), other.style()),
    }
}

fn path_command(path: BezPath, style: &ShapeStyle) -> DrawCommand {
    let stroke = (style.stroke_width > 0.0)
        .then(|| StrokeStyle::solid(style.stroke_color.into(), style.stroke_width));
    DrawCommand::Path {
        path,
        fill: style.fill_color.map(Color::from),
        stroke,
        composite: CompositeMode::SourceOver,
        opacity: style.opacity,
    }
}

fn freehand_command(stroke: &Freehand) -> DrawCommand {
    let mut path = BezPath::new();
    if let Some((first, rest)) = stroke.points.split_first() {
        path.move_to(*first);
        if rest.is_empty() {
            // A click without movement still leaves a dot.
            path.line_to(*first);
        }
        for p in rest {
            path.line_to(*p);
        }
    }
    DrawCommand::Path {
        path,
        fill: None,
        stroke: Some(StrokeStyle {
            color: stroke.style.stroke_color.into(),
            width: stroke.style.stroke_width,
            cap: stroke.line_cap,
            join: stroke.line_join,
            dash: Vec::new(),
        }),
        composite: stroke.composite,
        opacity: stroke.style.opacity,
    }
}

fn text_command(text: &Text) -> DrawCommand {
    let frame = text.box_rect();
    let transform = Affine::rotate_about(text.rotation, frame.center());
    DrawCommand::Text {
        layout: TextLayout {
            origin: Point::new(frame.x0 + text.padding, frame.y0 + text.padding),
            lines: text.content.lines().map(str::to_string).collect(),
            font: format!("{}px {}", text.font_size, text.font_family),
            line_height: text.font_size * 1.2,
            color: text.color().into(),
            backdrop: text.background.map(|bg| (frame, bg.into())),
        },
        transform,
        opacity: text.style.opacity,
    }
}

fn image_command(id: ShapeId, image: &Image) -> DrawCommand {
    let rect = image.as_rect();
    DrawCommand::Image {
        id,
        data_url: image.data_url(),
        rect,
        transform: Affine::rotate_about(image.rotation, rect.center()),
        opacity: image.style.opacity,
    }
}

/// Renderer that keeps the last built display list; platform renderers replay it.
#[derive(Debug, Default)]
pub struct DisplayListRenderer {
    last: DisplayList,
}

impl DisplayListRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.last
    }

    pub fn take(&mut self) -> DisplayList {
        std::mem::take(&mut self.last)
    }
}

impl Renderer for DisplayListRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        self.last = DisplayList::build(ctx);
        Ok(())
    }
}
