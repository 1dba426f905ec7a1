mod parser;
mod properties;

pub use parser::*;
pub use properties::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read PLY file
    #[error("Failed to read PLY file")]
    Io(#[from] std::io::Error),

    /// Malformed header
    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    /// Body encoding other than ASCII or binary little endian
    #[error("Unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    /// Unknown property type
    #[error("Unsupported PLY property: {0}")]
    UnsupportedProperty(String),

    /// A required element or property is absent
    #[error("Missing PLY {0}")]
    Missing(String),

    /// Failed to parse a body value
    #[error("Failed to parse PLY body: {0}")]
    Parse(String),

    /// A face references a vertex that does not exist
    #[error("Face index {index} out of range for {num_vertices} vertices")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of vertices in the file.
        num_vertices: usize,
    },
}
