//! Text box rasterization with cosmic-text.

use bannerink_core::color::Rgba;
use bannerink_core::document::{FontStyle, FontWeight, TextAlign, TextStyle};
use bannerink_core::surface::TEXT_LINE_HEIGHT;
use cosmic_text::{Align, Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, Style, SwashCache, Weight, Wrap};
use image::{Pixel, RgbaImage};
use kurbo::{Point, Rect};

/// Geometry of one text box in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    /// Top-left corner.
    pub origin: Point,
    /// Wrapping width.
    pub width: f64,
    /// Horizontal and vertical pixels per style unit.
    pub scale_x: f64,
    pub scale_y: f64,
}

/// Owns the font database and glyph cache.
///
/// Building the font database scans system fonts, so create one per export
/// session rather than per text box.
pub struct TextRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl Default for TextRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn family(name: &str) -> Family<'_> {
    match name.trim().to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name.trim()),
    }
}

fn align(align: TextAlign) -> Align {
    match align {
        TextAlign::Left => Align::Left,
        TextAlign::Center => Align::Center,
        TextAlign::Right => Align::Right,
    }
}

/// Source-over blend of one pixel, ignoring out-of-bounds coordinates.
pub(crate) fn blend_at(canvas: &mut RgbaImage, x: i64, y: i64, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 || color[3] == 0 {
        return;
    }
    canvas.get_pixel_mut(x as u32, y as u32).blend(&image::Rgba(color));
}

/// Blend a solid color over a rectangle, clipped to the canvas.
pub(crate) fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba) {
    if color.a == 0 {
        return;
    }
    let x0 = rect.x0.round().max(0.0) as u32;
    let y0 = rect.y0.round().max(0.0) as u32;
    let x1 = (rect.x1.round().max(0.0) as u32).min(canvas.width());
    let y1 = (rect.y1.round().max(0.0) as u32).min(canvas.height());
    let src = image::Rgba(color.to_array());
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.get_pixel_mut(x, y).blend(&src);
        }
    }
}

impl TextRasterizer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Lay out `text` and return the buffer plus its height in pixels.
    fn layout(&mut self, text: &str, style: &TextStyle, width: f32, font_px: f32) -> (Buffer, f32) {
        let line_px = font_px * TEXT_LINE_HEIGHT as f32;
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(font_px, line_px));
        buffer.set_wrap(&mut self.font_system, Wrap::WordOrGlyph);
        buffer.set_size(&mut self.font_system, Some(width), None);

        let mut attrs = Attrs::new().family(family(&style.font_family));
        if style.font_weight == FontWeight::Bold {
            attrs = attrs.weight(Weight::BOLD);
        }
        if style.font_style == FontStyle::Italic {
            attrs = attrs.style(Style::Italic);
        }
        buffer.set_text(&mut self.font_system, text, attrs, Shaping::Advanced);
        for line in buffer.lines.iter_mut() {
            line.set_align(Some(align(style.text_align)));
        }
        buffer.shape_until_scroll(&mut self.font_system, false);

        let lines = buffer.layout_runs().count().max(1);
        (buffer, lines as f32 * line_px)
    }

    /// Paint a text box: optional background with padding, then glyphs.
    pub fn draw(&mut self, canvas: &mut RgbaImage, text: &str, style: &TextStyle, text_box: TextBox) {
        let font_px = (style.font_size * text_box.scale_y) as f32;
        let width = (text_box.width * text_box.scale_x) as f32;
        if !(font_px.is_finite() && font_px > 0.0 && width.is_finite() && width > 0.0) {
            log::warn!("Skipping text box with unusable size {font_px}px x {width}px");
            return;
        }
        let (buffer, height) = self.layout(text, style, width, font_px);

        let mut inset = Point::ZERO;
        if let Some(background) = style.background_color.color() {
            let pad_x = style.padding * text_box.scale_x;
            let pad_y = style.padding * text_box.scale_y;
            let rect = Rect::new(
                text_box.origin.x,
                text_box.origin.y,
                text_box.origin.x + width as f64 + pad_x * 2.0,
                text_box.origin.y + height as f64 + pad_y * 2.0,
            );
            fill_rect(canvas, rect, background);
            inset = Point::new(pad_x, pad_y);
        }

        let left = (text_box.origin.x + inset.x).round() as i64;
        let top = (text_box.origin.y + inset.y).round() as i64;
        let ink = style.color;
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            Color::rgba(ink.r, ink.g, ink.b, ink.a),
            |x, y, w, h, color| {
                let rgba = [color.r(), color.g(), color.b(), color.a()];
                for dy in 0..h as i64 {
                    for dx in 0..w as i64 {
                        blend_at(canvas, left + x as i64 + dx, top + y as i64 + dy, rgba);
                    }
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bannerink_core::color::Background;

    #[test]
    fn test_family_mapping() {
        assert_eq!(family("serif"), Family::Serif);
        assert_eq!(family(" Monospace "), Family::Monospace);
        assert_eq!(family("Arial"), Family::Name("Arial"));
    }

    #[test]
    fn test_fill_rect_clips_to_canvas() {
        let mut canvas = RgbaImage::new(10, 10);
        fill_rect(&mut canvas, Rect::new(-5.0, 5.0, 3.0, 50.0), Rgba::rgb(255, 0, 0));
        assert_eq!(canvas.get_pixel(0, 9).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 9).0, [0, 0, 0, 0]);
        assert_eq!(canvas.get_pixel(0, 4).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_text_background_box_is_painted() {
        let mut canvas = RgbaImage::new(400, 200);
        let style = TextStyle {
            background_color: Background::Solid(Rgba::rgb(0, 0, 255)),
            padding: 10.0,
            ..TextStyle::default()
        };
        let text_box = TextBox {
            origin: Point::new(20.0, 20.0),
            width: 200.0,
            scale_x: 1.0,
            scale_y: 1.0,
        };
        TextRasterizer::new().draw(&mut canvas, "Sale", &style, text_box);

        // Inside the padding band no glyph is drawn.
        assert_eq!(canvas.get_pixel(22, 22).0, [0, 0, 255, 255]);
        assert_eq!(canvas.get_pixel(5, 5).0, [0, 0, 0, 0]);
        assert_eq!(canvas.get_pixel(300, 22).0, [0, 0, 0, 0]);
    }
}
