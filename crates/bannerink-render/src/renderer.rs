//! Rasterizer abstraction.

use bannerink_core::surface::DrawSurface;
use image::RgbaImage;
use kurbo::Size;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    /// There is nothing to render: no surface is mounted, or it is empty.
    #[error("Render unavailable: {0}")]
    RenderUnavailable(String),
    #[error("Invalid render target {width}x{height} for a {logical_width}x{logical_height} canvas")]
    InvalidTarget {
        width: u32,
        height: u32,
        logical_width: f64,
        logical_height: f64,
    },
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Uniform scale from logical canvas units to output pixels.
pub fn export_multiplier(logical: Size, target_width: u32) -> f64 {
    target_width as f64 / logical.width
}

/// Output raster size and the uniform logical-to-pixel scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    /// Pixels per logical unit on both axes.
    pub multiplier: f64,
}

impl RenderTarget {
    /// Target of exactly `width` x `height` pixels for a canvas of `logical` size.
    ///
    /// The multiplier is [`export_multiplier`] of the width.
    pub fn new(logical: Size, width: u32, height: u32) -> RenderResult<Self> {
        let usable = logical.width.is_finite() && logical.height.is_finite() && logical.width > 0.0 && logical.height > 0.0;
        if !usable || width == 0 || height == 0 {
            return Err(RendererError::InvalidTarget {
                width,
                height,
                logical_width: logical.width,
                logical_height: logical.height,
            });
        }
        Ok(Self {
            width,
            height,
            multiplier: export_multiplier(logical, width),
        })
    }
}

/// Turns a surface into pixels.
pub trait Rasterizer {
    /// Paint the surface fill and every drawable, back to front.
    ///
    /// The surface's display zoom is ignored.
    fn rasterize(&mut self, surface: &dyn DrawSurface, target: &RenderTarget) -> RenderResult<RgbaImage>;
}
