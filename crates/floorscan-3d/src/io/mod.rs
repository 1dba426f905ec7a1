/// Colmap sparse model module.
pub mod colmap;

/// PLY reader module.
pub mod ply;
