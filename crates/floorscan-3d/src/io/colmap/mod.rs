mod model;
mod text;
mod types;

pub use model::*;
pub use text::*;
pub use types::*;

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// Invalid number of camera parameters
    #[error("Invalid number of camera parameters: {0}")]
    InvalidNumCameraParams(usize),

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),

    /// The directory does not hold a complete model
    #[error("No complete COLMAP model in {0}")]
    IncompleteModel(std::path::PathBuf),
}
