//! # tiff-dpi
//!
//! Edit the resolution (DPI) of TIFF images in place, without re-encoding
//! pixel data.
//!
//! Setting the resolution means rewriting the XResolution, YResolution and
//! ResolutionUnit tags of every image directory. When a directory lacks one
//! of them, the directory is grown by the missing entries and every offset in
//! the file that pointed past the insertion point is shifted to match.
//!
//! ## Architecture
//!
//! - [`io`] - Byte-order-aware random-access stream
//! - [`mod@format`] - Classic TIFF header, directory walking and directory growth
//! - [`resolution`] - Rational densities, units, patching and inspection
//! - [`config`] - CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tiff_dpi::{patch_file, PatchSettings, ResolutionUnit};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = PatchSettings::new("300".parse()?, "300".parse()?)
//!         .with_unit(ResolutionUnit::Inch);
//!
//!     let report = patch_file(Path::new("scan.tif"), &settings)?;
//!     println!("{} directories patched", report.directories.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod resolution;

// Re-export commonly used types
pub use config::{Cli, Command, OutputFormat, SetConfig, ShowConfig};
pub use error::{InputError, PatchError, TiffError};
pub use format::tiff::{
    ifd_chain, insert_entries, ByteOrder, FieldType, IfdCursor, IfdEntry, IfdLocation, Insertion,
    TiffHeader, TiffTag, TIFF_HEADER_SIZE,
};
pub use io::EndianStream;
pub use resolution::{
    approximate, patch_file, patch_stream, read_resolutions, DirectoryReport, PatchReport,
    PatchSettings, Rational, ResolutionInfo, ResolutionUnit, MAX_COMPONENT,
};
