//! Classic TIFF structure: header, directories and entries.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values are read and written respecting this order.
//!
//! - **IFD (Image File Directory)**: a counted table of 12-byte entries followed by the
//!   offset of the next directory. Files with several images chain several IFDs.
//!
//! - **Inline vs offset values**: values of at most 4 bytes live in the entry itself,
//!   larger values are stored elsewhere and the entry holds their offset. Growing a
//!   directory moves everything after it, so those offsets must be rewritten
//!   (see [`mutator`]).
//!
//! Only classic TIFF (32-bit offsets) is handled. BigTIFF is rejected at the header.

mod entry;
mod header;
mod tags;

pub mod mutator;
pub mod walker;


pub use entry::{IfdEntry, ENTRY_VALUE_FIELD, IFD_COUNT_SIZE, IFD_ENTRY_SIZE, IFD_NEXT_OFFSET_SIZE};
pub use header::{ByteOrder, TiffHeader, FIRST_IFD_OFFSET_FIELD, TIFF_HEADER_SIZE};
pub use mutator::{insert_entries, sort_entries, Insertion, PLACEHOLDER_TYPE};
pub use tags::{FieldType, TiffTag};
pub use walker::{find_ifd, ifd_chain, read_entries, read_ifd_at, IfdCursor, IfdLocation};
