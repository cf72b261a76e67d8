//! CPU rasterizer.

use crate::renderer::{Rasterizer, RenderResult, RenderTarget};
use crate::text::{TextBox, TextRasterizer, fill_rect};
use bannerink_core::loader::Bitmap;
use bannerink_core::surface::{DrawSurface, DrawableContent, LayerKind};
use image::{Pixel, RgbaImage};
use image::imageops::{self, FilterType};
use kurbo::{Point, Rect, Size};

/// Resampled crops larger than this many pixels are sampled point by point.
const MAX_RESAMPLED_PIXELS: u64 = 1 << 26;

/// Software rasterizer backed by the `image` crate.
///
/// The text rasterizer is created on first use; compositions without text
/// never load fonts.
#[derive(Default)]
pub struct CpuRasterizer {
    text: Option<TextRasterizer>,
}

impl CpuRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn text(&mut self) -> &mut TextRasterizer {
        self.text.get_or_insert_with(TextRasterizer::new)
    }
}

/// Lanczos for downscaling, bilinear when enlarging.
fn filter_for(source: (u32, u32), width: u32, height: u32) -> FilterType {
    if width > source.0 || height > source.1 {
        FilterType::Triangle
    } else {
        FilterType::Lanczos3
    }
}

/// Draw `bitmap` stretched over `dest`, touching only the part inside the canvas.
///
/// The source is cropped to the texels that land on the canvas before
/// resampling, so the work is bounded by the canvas size however far the
/// image is enlarged.
fn draw_bitmap(canvas: &mut RgbaImage, bitmap: &Bitmap, dest: Rect) {
    if !(dest.width() > 0.0 && dest.height() > 0.0 && dest.is_finite()) {
        return;
    }
    let canvas_rect = Rect::new(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
    let visible = dest.intersect(canvas_rect);
    if visible.area() <= 0.0 {
        return;
    }

    let (bw, bh) = (bitmap.width() as f64, bitmap.height() as f64);
    let scale_x = dest.width() / bw;
    let scale_y = dest.height() / bh;
    let src_x0 = ((visible.x0 - dest.x0) / scale_x).floor().clamp(0.0, bw);
    let src_y0 = ((visible.y0 - dest.y0) / scale_y).floor().clamp(0.0, bh);
    let src_x1 = ((visible.x1 - dest.x0) / scale_x).ceil().clamp(src_x0, bw);
    let src_y1 = ((visible.y1 - dest.y0) / scale_y).ceil().clamp(src_y0, bh);
    if src_x1 <= src_x0 || src_y1 <= src_y0 {
        return;
    }

    let Some(source) = RgbaImage::from_raw(bitmap.width(), bitmap.height(), bitmap.pixels().to_vec()) else {
        log::warn!("Bitmap buffer does not match {}x{}", bitmap.width(), bitmap.height());
        return;
    };
    let crop = imageops::crop_imm(
        &source,
        src_x0 as u32,
        src_y0 as u32,
        (src_x1 - src_x0) as u32,
        (src_y1 - src_y0) as u32,
    )
    .to_image();

    // Where the cropped texels land; may overhang the canvas by part of a texel.
    let left = (dest.x0 + src_x0 * scale_x).round();
    let top = (dest.y0 + src_y0 * scale_y).round();
    let right = (dest.x0 + src_x1 * scale_x).round();
    let bottom = (dest.y0 + src_y1 * scale_y).round();
    if right <= left || bottom <= top {
        return;
    }
    let (width, height) = ((right - left) as u32, (bottom - top) as u32);

    if width as u64 * height as u64 > MAX_RESAMPLED_PIXELS {
        sample_nearest(canvas, &source, dest, visible);
        return;
    }
    let resized = if (width, height) == crop.dimensions() {
        crop
    } else {
        let filter = filter_for(crop.dimensions(), width, height);
        imageops::resize(&crop, width, height, filter)
    };
    imageops::overlay(canvas, &resized, left as i64, top as i64);
}

/// Point-sample `source` for every canvas pixel inside `visible`.
///
/// Used when single texels cover more than the canvas, where filtering makes
/// no visible difference.
fn sample_nearest(canvas: &mut RgbaImage, source: &RgbaImage, dest: Rect, visible: Rect) {
    let (bw, bh) = source.dimensions();
    let x_range = visible.x0.round() as u32..(visible.x1.round() as u32).min(canvas.width());
    let y_range = visible.y0.round() as u32..(visible.y1.round() as u32).min(canvas.height());
    for y in y_range {
        let v = ((y as f64 + 0.5 - dest.y0) / dest.height() * bh as f64).floor();
        let v = (v.max(0.0) as u32).min(bh - 1);
        for x in x_range.clone() {
            let u = ((x as f64 + 0.5 - dest.x0) / dest.width() * bw as f64).floor();
            let u = (u.max(0.0) as u32).min(bw - 1);
            canvas.get_pixel_mut(x, y).blend(source.get_pixel(u, v));
        }
    }
}

impl Rasterizer for CpuRasterizer {
    fn rasterize(&mut self, surface: &dyn DrawSurface, target: &RenderTarget) -> RenderResult<RgbaImage> {
        let m = target.multiplier;
        let mut canvas = RgbaImage::new(target.width, target.height);

        // The fill drawable carries the same color; paint it only once.
        if surface.query(LayerKind::Background).is_empty() {
            if let Some(fill) = surface.fill() {
                let full = Rect::new(0.0, 0.0, target.width as f64, target.height as f64);
                fill_rect(&mut canvas, full, fill);
            }
        }

        for drawable in surface.ordered() {
            match &drawable.content {
                DrawableContent::Fill { color, .. } => {
                    let full = Rect::new(0.0, 0.0, target.width as f64, target.height as f64);
                    fill_rect(&mut canvas, full, *color);
                }
                DrawableContent::Image {
                    bitmap,
                    origin,
                    scale_x,
                    scale_y,
                    ..
                } => {
                    let size = bitmap.size();
                    let dest = Rect::from_origin_size(
                        Point::new(origin.x * m, origin.y * m),
                        Size::new(size.width * scale_x * m, size.height * scale_y * m),
                    );
                    draw_bitmap(&mut canvas, bitmap, dest);
                }
                DrawableContent::Text {
                    text,
                    style,
                    origin,
                    width,
                    scale_x,
                    scale_y,
                    ..
                } => {
                    let text_box = TextBox {
                        origin: Point::new(origin.x * m, origin.y * m),
                        width: *width,
                        scale_x: scale_x * m,
                        scale_y: scale_y * m,
                    };
                    self.text().draw(&mut canvas, text, style, text_box);
                }
            }
        }
        Ok(canvas)
    }
}
