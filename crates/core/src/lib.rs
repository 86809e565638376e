pub mod config;
pub mod error;
pub mod types;

pub use config::{ResolvedSettings, ToolsetSettings};
pub use error::{Error, Result};
pub use types::{ImageMediaType, ImageSegment, ToolStatus, Viewport};
