//! Export renderer.
//!
//! Re-renders the live composition at a preset pixel size and encodes it.
//! The on-screen zoom never leaks into the output.

use crate::raster::CpuRasterizer;
use crate::renderer::{Rasterizer, RenderResult, RenderTarget, RendererError};
use bannerink_core::document::{ExportFormat, ExportSettings};
use bannerink_core::surface::{Composition, DrawSurface};
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};

/// Encoded export output plus what the delivery side needs to name it.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ExportFormat,
}

impl ExportedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// `"Summer Sale"` becomes `Summer_Sale.png`.
    pub fn suggested_filename(&self, project_name: &str) -> String {
        let name = project_name.trim();
        let stem = if name.is_empty() { "banner".to_string() } else { name.replace(' ', "_") };
        format!("{stem}.{}", self.extension())
    }
}

/// Encode RGBA pixels as PNG.
pub fn encode_png(pixels: &RgbaImage) -> RenderResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixels.width(), pixels.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(format!("PNG header: {e}")))?;
        writer
            .write_image_data(pixels.as_raw())
            .map_err(|e| RendererError::Encode(format!("PNG data: {e}")))?;
        writer.finish().map_err(|e| RendererError::Encode(format!("PNG finish: {e}")))?;
    }
    Ok(png_data)
}

/// Composite straight-alpha pixels over opaque white.
pub fn flatten_onto_white(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let alpha = a as u32;
        let over = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

/// Encode as JPEG at `quality` (clamped to the accepted range).
pub fn encode_jpeg(pixels: &RgbaImage, quality: u32) -> RenderResult<Vec<u8>> {
    let quality = ExportSettings::clamp_quality(quality) as u8;
    let rgb = flatten_onto_white(pixels);
    let mut jpeg_data = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_data, quality)
        .encode_image(&rgb)
        .map_err(|e| RendererError::Encode(format!("JPEG: {e}")))?;
    Ok(jpeg_data)
}

/// Renders compositions at export resolution.
#[derive(Default)]
pub struct ExportRenderer<R: Rasterizer = CpuRasterizer> {
    rasterizer: R,
}

impl ExportRenderer<CpuRasterizer> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Rasterizer> ExportRenderer<R> {
    pub fn with_rasterizer(rasterizer: R) -> Self {
        Self { rasterizer }
    }

    /// Rasterize without encoding.
    pub fn render_pixels<S: DrawSurface>(
        &mut self,
        composition: Option<&Composition<S>>,
        settings: &ExportSettings,
    ) -> RenderResult<RgbaImage> {
        let composition = composition
            .ok_or_else(|| RendererError::RenderUnavailable("no drawing surface is mounted".to_string()))?;
        if composition.is_empty() {
            return Err(RendererError::RenderUnavailable("the canvas is empty".to_string()));
        }
        let (width, height) = settings.resolution.dimensions();
        let target = RenderTarget::new(composition.logical_size(), width, height)?;
        log::debug!(
            "Rasterizing {:?} at {width}x{height} (x{:.3})",
            composition.logical_size(),
            target.multiplier
        );
        self.rasterizer.rasterize(composition.surface(), &target)
    }

    /// Rasterize and encode in the requested format.
    pub fn render<S: DrawSurface>(
        &mut self,
        composition: Option<&Composition<S>>,
        settings: &ExportSettings,
    ) -> RenderResult<ExportedImage> {
        let pixels = self.render_pixels(composition, settings)?;
        let bytes = match settings.format {
            ExportFormat::Png => encode_png(&pixels)?,
            ExportFormat::Jpeg => encode_jpeg(&pixels, settings.quality)?,
        };
        log::info!(
            "Exported {}x{} {} ({} bytes)",
            pixels.width(),
            pixels.height(),
            settings.format.extension(),
            bytes.len()
        );
        Ok(ExportedImage {
            bytes,
            width: pixels.width(),
            height: pixels.height(),
            format: settings.format,
        })
    }
}
