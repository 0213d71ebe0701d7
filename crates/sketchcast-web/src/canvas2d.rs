//! Replays display lists onto a `CanvasRenderingContext2d`.

use crate::fetch::js_error;
use kurbo::{Affine, BezPath, PathEl};
use peniko::Color;
use sketchcast_core::shapes::{StrokeCap, StrokeJoin};
use sketchcast_render::{
    DisplayList, DrawCommand, RenderContext, RenderResult, Renderer, RendererError, StrokeStyle,
    TextLayout,
};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

const BACKGROUND_KEY: &str = "background";

fn css_color(color: Color) -> String {
    let c = color.to_rgba8();
    format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a as f64 / 255.0)
}

fn cap_name(cap: StrokeCap) -> &'static str {
    match cap {
        StrokeCap::Butt => "butt",
        StrokeCap::Round => "round",
        StrokeCap::Square => "square",
    }
}

fn join_name(join: StrokeJoin) -> &'static str {
    match join {
        StrokeJoin::Miter => "miter",
        StrokeJoin::Round => "round",
        StrokeJoin::Bevel => "bevel",
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> RenderResult<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .map_err(|e| RendererError::InitFailed(js_error(&e)))?
        .ok_or_else(|| RendererError::InitFailed("2d context unavailable".to_string()))?
        .dyn_into()
        .map_err(|_| RendererError::InitFailed("not a 2d context".to_string()))
}

/// Decoded image elements keyed by object, reloaded when the source changes.
struct ImageCache {
    entries: HashMap<String, (String, HtmlImageElement)>,
    /// Called when an image finishes loading and the frame should be redrawn.
    on_loaded: Option<Rc<dyn Fn()>>,
}

impl ImageCache {
    fn get(&mut self, key: &str, data_url: &str) -> Option<&HtmlImageElement> {
        let stale = self
            .entries
            .get(key)
            .is_none_or(|(url, _)| url != data_url);
        if stale {
            let image = HtmlImageElement::new().ok()?;
            let hook = self.on_loaded.clone();
            let onload = Closure::once_into_js(move || {
                if let Some(hook) = hook {
                    hook();
                }
            });
            image.set_onload(Some(onload.unchecked_ref()));
            image.set_src(data_url);
            self.entries
                .insert(key.to_string(), (data_url.to_string(), image));
        }
        let (_, image) = self.entries.get(key)?;
        image.complete().then_some(image)
    }

    fn retain(&mut self, live: &[String]) {
        self.entries.retain(|key, _| live.contains(key));
    }
}

/// Draws onto the surface canvas (captured by the stream) and an optional overlay canvas.
pub struct Canvas2dRenderer {
    surface: HtmlCanvasElement,
    surface_ctx: CanvasRenderingContext2d,
    overlay: Option<(HtmlCanvasElement, CanvasRenderingContext2d)>,
    images: ImageCache,
}

impl Canvas2dRenderer {
    pub fn new(surface: HtmlCanvasElement, overlay: Option<HtmlCanvasElement>) -> RenderResult<Self> {
        let surface_ctx = context_2d(&surface)?;
        let overlay = match overlay {
            Some(canvas) => {
                let ctx = context_2d(&canvas)?;
                Some((canvas, ctx))
            }
            None => None,
        };
        Ok(Self {
            surface,
            surface_ctx,
            overlay,
            images: ImageCache {
                entries: HashMap::new(),
                on_loaded: None,
            },
        })
    }

    pub fn surface(&self) -> &HtmlCanvasElement {
        &self.surface
    }

    /// Run `hook` whenever an image finishes decoding.
    pub fn set_on_image_loaded(&mut self, hook: Rc<dyn Fn()>) {
        self.images.on_loaded = Some(hook);
    }

    fn resize(canvas: &HtmlCanvasElement, ctx: &CanvasRenderingContext2d, width: u32, height: u32, scale: f64) {
        if canvas.width() != width || canvas.height() != height {
            canvas.set_width(width);
            canvas.set_height(height);
        }
        let _ = ctx.set_transform(scale, 0.0, 0.0, scale, 0.0, 0.0);
    }

    fn replay(&mut self, list: &DisplayList, scale: f64, physical: (u32, u32)) -> Result<(), JsValue> {
        let (width, height) = physical;
        Self::resize(&self.surface, &self.surface_ctx, width, height, scale);
        let ctx = self.surface_ctx.clone();
        for command in &list.surface {
            self.draw(&ctx, command)?;
        }

        let live: Vec<String> = list
            .surface
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Image { id, .. } => Some(id.to_string()),
                DrawCommand::Background { .. } => Some(BACKGROUND_KEY.to_string()),
                _ => None,
            })
            .collect();
        self.images.retain(&live);

        if let Some((canvas, ctx)) = self.overlay.clone() {
            Self::resize(&canvas, &ctx, width, height, scale);
            ctx.clear_rect(0.0, 0.0, width as f64, height as f64);
            for command in &list.overlay {
                self.draw(&ctx, command)?;
            }
        }
        Ok(())
    }

    fn draw(&mut self, ctx: &CanvasRenderingContext2d, command: &DrawCommand) -> Result<(), JsValue> {
        match command {
            DrawCommand::Clear { size, color } => {
                ctx.set_global_composite_operation("source-over")?;
                ctx.set_global_alpha(1.0);
                ctx.clear_rect(0.0, 0.0, size.width, size.height);
                ctx.set_fill_style_str(&css_color(*color));
                ctx.fill_rect(0.0, 0.0, size.width, size.height);
            }
            DrawCommand::Background { data_url, rect } => {
                if let Some(image) = self.images.get(BACKGROUND_KEY, data_url) {
                    ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        image,
                        rect.x0,
                        rect.y0,
                        rect.width(),
                        rect.height(),
                    )?;
                }
            }
            DrawCommand::Path {
                path,
                fill,
                stroke,
                composite,
                opacity,
            } => {
                ctx.save();
                ctx.set_global_alpha(*opacity);
                ctx.set_global_composite_operation(composite.css_name())?;
                trace_path(ctx, path);
                if let Some(fill) = fill {
                    ctx.set_fill_style_str(&css_color(*fill));
                    ctx.fill();
                }
                if let Some(stroke) = stroke {
                    apply_stroke(ctx, stroke)?;
                    ctx.stroke();
                }
                ctx.restore();
            }
            DrawCommand::Text {
                layout,
                transform,
                opacity,
            } => {
                ctx.save();
                ctx.set_global_alpha(*opacity);
                apply_transform(ctx, *transform)?;
                draw_text(ctx, layout)?;
                ctx.restore();
            }
            DrawCommand::Image {
                id,
                data_url,
                rect,
                transform,
                opacity,
            } => {
                if let Some(image) = self.images.get(&id.to_string(), data_url) {
                    ctx.save();
                    ctx.set_global_alpha(*opacity);
                    apply_transform(ctx, *transform)?;
                    ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        image,
                        rect.x0,
                        rect.y0,
                        rect.width(),
                        rect.height(),
                    )?;
                    ctx.restore();
                }
            }
        }
        Ok(())
    }
}

fn trace_path(ctx: &CanvasRenderingContext2d, path: &BezPath) {
    ctx.begin_path();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => ctx.move_to(p.x, p.y),
            PathEl::LineTo(p) => ctx.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c1, c2, p) => ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            PathEl::ClosePath => ctx.close_path(),
        }
    }
}

fn apply_stroke(ctx: &CanvasRenderingContext2d, stroke: &StrokeStyle) -> Result<(), JsValue> {
    ctx.set_stroke_style_str(&css_color(stroke.color));
    ctx.set_line_width(stroke.width);
    ctx.set_line_cap(cap_name(stroke.cap));
    ctx.set_line_join(join_name(stroke.join));
    let dash = js_sys::Array::new();
    for d in &stroke.dash {
        dash.push(&JsValue::from_f64(*d));
    }
    ctx.set_line_dash(&dash)
}

fn apply_transform(ctx: &CanvasRenderingContext2d, transform: Affine) -> Result<(), JsValue> {
    let [a, b, c, d, e, f] = transform.as_coeffs();
    ctx.transform(a, b, c, d, e, f)
}

fn draw_text(ctx: &CanvasRenderingContext2d, layout: &TextLayout) -> Result<(), JsValue> {
    if let Some((rect, color)) = layout.backdrop {
        ctx.set_fill_style_str(&css_color(color));
        ctx.fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
    }
    ctx.set_font(&layout.font);
    ctx.set_text_baseline("top");
    ctx.set_fill_style_str(&css_color(layout.color));
    for (i, line) in layout.lines.iter().enumerate() {
        ctx.fill_text(
            line,
            layout.origin.x,
            layout.origin.y + i as f64 * layout.line_height,
        )?;
    }
    Ok(())
}

impl Renderer for Canvas2dRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let list = DisplayList::build(ctx);
        let physical = ctx.physical_size();
        self.replay(
            &list,
            ctx.scale_factor,
            (physical.width as u32, physical.height as u32),
        )
        .map_err(|e| RendererError::RenderFailed(js_error(&e)))
    }
}
