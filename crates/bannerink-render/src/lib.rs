//! BannerInk Render Library
//!
//! Rasterizes a composition at export resolution and encodes it as PNG or
//! JPEG. Everything runs on the CPU.

mod export;
mod raster;
mod renderer;
pub mod text;

pub use export::{ExportRenderer, ExportedImage, encode_jpeg, encode_png, flatten_onto_white};
pub use raster::CpuRasterizer;
pub use renderer::{Rasterizer, RenderResult, RenderTarget, RendererError, export_multiplier};
pub use text::{TextBox, TextRasterizer};
