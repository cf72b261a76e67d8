//! Image source for local files and inline data URIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bannerink_core::document::ImageRef;
use bannerink_core::loader::{Bitmap, ImageFormat, ImageSource, LoadFuture, MAX_IMAGE_BYTES, ResourceLoadError};
use std::path::{Path, PathBuf};

/// Where the bytes of an image live.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Inline { mime: String, payload: String },
}

/// Loads images from the filesystem and `data:` URIs.
///
/// Decoding runs on tokio's blocking pool.
#[derive(Debug, Clone, Default)]
pub struct FsImageSource {
    root: Option<PathBuf>,
}

impl FsImageSource {
    /// Relative paths are resolved against `root` when given.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn locate(&self, uri: &str) -> Result<Location, ResourceLoadError> {
        if let Some(rest) = uri.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ResourceLoadError::UnsupportedScheme(truncate(uri)))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| ResourceLoadError::UnsupportedScheme(truncate(uri)))?;
            return Ok(Location::Inline {
                mime: mime.to_string(),
                payload: payload.to_string(),
            });
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(Location::File(PathBuf::from(path)));
        }
        if uri.contains("://") {
            return Err(ResourceLoadError::UnsupportedScheme(uri.to_string()));
        }
        let path = Path::new(uri);
        let path = match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        };
        Ok(Location::File(path))
    }
}

/// Data URIs can be huge; keep error messages readable.
fn truncate(uri: &str) -> String {
    uri.chars().take(48).collect()
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ResourceLoadError> {
    let uri = path.display().to_string();
    let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ResourceLoadError::NotFound(uri.clone()),
        _ => ResourceLoadError::Io {
            uri: uri.clone(),
            reason: e.to_string(),
        },
    })?;
    if metadata.len() > MAX_IMAGE_BYTES {
        return Err(ResourceLoadError::TooLarge {
            uri,
            size: metadata.len(),
        });
    }
    tokio::fs::read(path)
        .await
        .map_err(|e| ResourceLoadError::Io { uri, reason: e.to_string() })
}

fn decode_inline(mime: &str, payload: &str) -> Result<Vec<u8>, ResourceLoadError> {
    if ImageFormat::from_mime_type(mime).is_none() {
        return Err(ResourceLoadError::UnsupportedFormat(mime.to_string()));
    }
    let bytes = STANDARD.decode(payload.trim()).map_err(|e| ResourceLoadError::Decode {
        uri: format!("data:{mime}"),
        reason: e.to_string(),
    })?;
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(ResourceLoadError::TooLarge {
            uri: format!("data:{mime}"),
            size: bytes.len() as u64,
        });
    }
    Ok(bytes)
}

/// Decode encoded image bytes into RGBA pixels.
pub fn decode_bitmap(uri: &str, bytes: &[u8]) -> Result<Bitmap, ResourceLoadError> {
    if ImageFormat::from_magic_bytes(bytes).is_none() {
        return Err(ResourceLoadError::UnsupportedFormat(uri.to_string()));
    }
    let decoded = image::load_from_memory(bytes).map_err(|e| ResourceLoadError::Decode {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::new(width, height, rgba.into_raw()).ok_or_else(|| ResourceLoadError::Decode {
        uri: uri.to_string(),
        reason: format!("empty image {width}x{height}"),
    })
}

impl ImageSource for FsImageSource {
    fn load(&self, image: &ImageRef) -> LoadFuture {
        let location = self.locate(&image.source_uri);
        let uri = truncate(&image.source_uri);
        Box::pin(async move {
            let bytes = match location? {
                Location::File(path) => read_file(&path).await?,
                Location::Inline { mime, payload } => decode_inline(&mime, &payload)?,
            };
            let decode_uri = uri.clone();
            tokio::task::spawn_blocking(move || decode_bitmap(&decode_uri, &bytes))
                .await
                .map_err(|e| ResourceLoadError::Decode {
                    uri,
                    reason: e.to_string(),
                })?
        })
    }
}
