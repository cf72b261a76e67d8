//! Application-level errors.

use bannerink_core::document::ValidationError;
use bannerink_core::loader::ResourceLoadError;
use bannerink_core::storage::StorageError;
use bannerink_core::surface::{SurfaceError, SurfaceInitError};
use bannerink_render::RendererError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Load(#[from] ResourceLoadError),
    #[error(transparent)]
    SurfaceInit(#[from] SurfaceInitError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid project file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// An edit referred to something that does not exist.
    #[error("Cannot apply edit: {0}")]
    Command(String),
}

pub type AppResult<T> = Result<T, AppError>;
