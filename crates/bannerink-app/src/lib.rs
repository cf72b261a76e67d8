//! BannerInk editor session and command-line front end.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod session;
pub mod source;

pub use command::EditCommand;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::EditorSession;
pub use source::FsImageSource;
