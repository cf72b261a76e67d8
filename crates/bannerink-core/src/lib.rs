//! BannerInk Core Library
//!
//! Platform-agnostic document model, grid layout and composition logic for
//! the BannerInk banner editor. Nothing in this crate touches pixels.

pub mod color;
pub mod document;
pub mod layout;
pub mod loader;
pub mod notice;
pub mod storage;
pub mod surface;
pub mod sync;
pub mod viewport;
pub mod wire;

pub use color::{Background, ColorParseError, Rgba};
pub use document::{
    ChangeSet, Document, ExportFormat, ExportSettings, GridSize, ImageId, ImageRef, OverlayId, ResolutionPreset,
    TextAlign, TextOverlay, TextStyle, ValidationError,
};
pub use layout::{Cell, Placement, compute_grid_placements};
pub use loader::{Bitmap, CachedSource, ImageFormat, ImageSource, LoadFuture, ResourceLoadError};
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use surface::{Composition, DrawSurface, Drawable, DrawableContent, DrawableId, LayerKind, Readback, RetainedSurface, SurfaceError, SurfaceInitError};
pub use sync::{Generation, LoadCompletion, LoadOutcome, LoadRequest, RenderSynchronizer};
pub use viewport::Viewport;
pub use wire::ProjectPayload;
