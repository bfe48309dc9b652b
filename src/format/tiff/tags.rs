//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for walking and patching TIFF files:
//! - Field types that determine how values are encoded and whether they fit inline
//! - Tag IDs for the resolution tags and for every tag whose value is itself a file offset

use serde::Serialize;

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF 6.0 field types.
///
/// The byte length of each type decides whether a value with a given count is
/// stored inline in the 4-byte value field or at an offset elsewhere in the
/// file. Getting a length wrong makes the relocation pass shift inline values
/// or miss real offsets, so every classic TIFF type is listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    /// NUL-terminated text, one byte per character
    Ascii = 2,
    Short = 3,
    Long = 4,
    /// Numerator and denominator, each a LONG
    Rational = 5,
    SByte = 6,
    /// Opaque bytes, interpreted per tag
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    /// LONG that points at a directory
    Ifd = 13,
}

impl FieldType {
    /// Maximum bytes that can be stored inline in a classic TIFF IFD entry.
    pub const INLINE_THRESHOLD: u64 = 4;

    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> u64 {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    /// Look up a type code read from an IFD entry.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Total size of `count` values, or `None` on overflow.
    #[inline]
    pub fn total_size(self, count: u32) -> Option<u64> {
        self.size_in_bytes().checked_mul(u64::from(count))
    }

    /// Check if `count` values of this type fit in the 4-byte value field.
    #[inline]
    pub fn fits_inline(self, count: u32) -> bool {
        matches!(self.total_size(count), Some(size) if size <= Self::INLINE_THRESHOLD)
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs the patcher reads or must keep consistent.
///
/// Besides the three resolution tags, this lists every baseline and
/// Exif-pointer tag whose *value* is a file offset. Those values have to move
/// along with the data they point at when bytes are inserted into the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------
    /// Pixels per unit in X direction
    XResolution = 282,

    /// Pixels per unit in Y direction
    YResolution = 283,

    /// Unit of resolution (1=none, 2=inch, 3=centimeter)
    ResolutionUnit = 296,

    // -------------------------------------------------------------------------
    // Tags whose values are offsets into the file
    // -------------------------------------------------------------------------
    /// Byte offsets of strips
    StripOffsets = 273,

    /// Byte offsets of unused regions
    FreeOffsets = 288,

    /// Byte offsets of tiles
    TileOffsets = 324,

    /// Offsets of child IFDs
    SubIfds = 330,

    /// Offset of an embedded JPEG stream (old-style JPEG / thumbnails)
    JpegInterchangeFormat = 513,

    /// Offset of the Exif private IFD
    ExifIfd = 34665,

    /// Offset of the GPS IFD
    GpsIfd = 34853,

    /// Offset of the Exif interoperability IFD
    InteropIfd = 40965,
}

impl TiffTag {
    /// Tags every directory needs for its resolution to be set.
    pub const RESOLUTION_TAGS: [TiffTag; 3] = [
        TiffTag::XResolution,
        TiffTag::YResolution,
        TiffTag::ResolutionUnit,
    ];

    /// Map a raw tag ID, or `None` for tags outside this set.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            273 => Some(TiffTag::StripOffsets),
            282 => Some(TiffTag::XResolution),
            283 => Some(TiffTag::YResolution),
            288 => Some(TiffTag::FreeOffsets),
            296 => Some(TiffTag::ResolutionUnit),
            324 => Some(TiffTag::TileOffsets),
            330 => Some(TiffTag::SubIfds),
            513 => Some(TiffTag::JpegInterchangeFormat),
            34665 => Some(TiffTag::ExifIfd),
            34853 => Some(TiffTag::GpsIfd),
            40965 => Some(TiffTag::InteropIfd),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the tag's values are absolute file offsets.
    #[inline]
    pub const fn holds_offsets(self) -> bool {
        !matches!(
            self,
            TiffTag::XResolution | TiffTag::YResolution | TiffTag::ResolutionUnit
        )
    }

    /// Whether the tag's values point at further directories.
    #[inline]
    pub const fn is_sub_ifd_pointer(self) -> bool {
        matches!(
            self,
            TiffTag::SubIfds | TiffTag::ExifIfd | TiffTag::GpsIfd | TiffTag::InteropIfd
        )
    }

    /// Name as written in the TIFF and Exif tag registries.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::XResolution => "XResolution",
            TiffTag::YResolution => "YResolution",
            TiffTag::ResolutionUnit => "ResolutionUnit",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::FreeOffsets => "FreeOffsets",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::SubIfds => "SubIFDs",
            TiffTag::JpegInterchangeFormat => "JPEGInterchangeFormat",
            TiffTag::ExifIfd => "ExifIFD",
            TiffTag::GpsIfd => "GPSIFD",
            TiffTag::InteropIfd => "InteroperabilityIFD",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
