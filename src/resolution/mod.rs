//! Resolution values and the operations that read and write them.
//!
//! - [`Rational`] / [`approximate`]: densities as TIFF fractions
//! - [`ResolutionUnit`]: the ResolutionUnit tag value
//! - [`patch_stream`] / [`patch_file`]: set the resolution of every directory
//! - [`read_resolutions`]: list the current resolution of every directory

mod inspect;
mod patcher;
mod rational;
mod unit;

pub use inspect::{read_resolutions, ResolutionInfo};
pub use patcher::{patch_file, patch_stream, DirectoryReport, PatchReport, PatchSettings};
pub use rational::{approximate, Rational, MAX_COMPONENT};
pub use unit::ResolutionUnit;
