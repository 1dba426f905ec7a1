#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// I/O utilities for reading 3D data.
pub mod io;

/// Triangle mesh container.
pub mod mesh;

/// Plane sections of triangle meshes.
pub mod section;

pub use mesh::TriangleMesh;
pub use section::{section_at_height, Section, SectionError};
