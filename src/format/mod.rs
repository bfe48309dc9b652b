//! File format layer.
//!
//! Only TIFF is understood. The [`tiff`] module knows how directories are laid
//! out on disk and how to grow one without breaking the rest of the file.

pub mod tiff;
