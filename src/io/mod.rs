//! Input plumbing: path resolution, stream opening, decompression and line reading.

pub mod compression;
pub mod glob;
pub mod lines;
pub mod opener;
