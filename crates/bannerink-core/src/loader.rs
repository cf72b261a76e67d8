//! Image acquisition contract.
//!
//! Loading is the only asynchronous operation in the editor. Sources return
//! `'static` futures so the session can run many loads at once; their
//! results are applied to the surface one at a time.

use crate::document::{ImageId, ImageRef};
use kurbo::Size;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Uploads larger than this are rejected.
pub const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// Per-image load failure. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceLoadError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Unsupported image location: {0}")]
    UnsupportedScheme(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Image {uri} is {size} bytes, limit is 50 MiB")]
    TooLarge { uri: String, size: u64 },
    #[error("Failed to decode {uri}: {reason}")]
    Decode { uri: String, reason: String },
    #[error("Failed to read {uri}: {reason}")]
    Io { uri: String, reason: String },
}

/// Encoded image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        if data.starts_with(b"GIF8") {
            return Some(ImageFormat::Gif);
        }
        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }
        None
    }
}

/// Decoded RGBA8 pixels (straight alpha, row-major).
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Bitmap {
    /// Wrap pixel data. Returns `None` if the buffer length does not match.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    /// A bitmap filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Natural size in logical units.
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }
}

/// Future produced by an [`ImageSource`].
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<Bitmap, ResourceLoadError>> + Send + 'static>>;

/// Something that can turn an image reference into pixels.
pub trait ImageSource: Send + Sync {
    /// Start loading `image`. The future resolves independently of others.
    fn load(&self, image: &ImageRef) -> LoadFuture;
}

/// Memoizes decoded bitmaps by image id so re-layouts do not refetch.
///
/// Failures are not cached.
pub struct CachedSource<S: ImageSource> {
    inner: Arc<S>,
    cache: Arc<RwLock<HashMap<ImageId, Bitmap>>>,
}

impl<S: ImageSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of cached bitmaps.
    pub fn len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a cached bitmap (e.g. after the image was deleted).
    pub fn evict(&self, id: &ImageId) -> bool {
        match self.cache.write() {
            Ok(mut cache) => cache.remove(id).is_some(),
            Err(_) => false,
        }
    }
}

impl<S: ImageSource + 'static> ImageSource for CachedSource<S> {
    fn load(&self, image: &ImageRef) -> LoadFuture {
        let cached = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&image.id).cloned());
        if let Some(bitmap) = cached {
            return Box::pin(async move { Ok(bitmap) });
        }

        let id = image.id.clone();
        let cache = Arc::clone(&self.cache);
        let pending = self.inner.load(image);
        Box::pin(async move {
            let bitmap = pending.await?;
            if let Ok(mut cache) = cache.write() {
                cache.insert(id, bitmap.clone());
            }
            Ok(bitmap)
        })
    }
}
