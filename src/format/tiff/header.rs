//! TIFF header parsing.
//!
//! # TIFF Header Structure
//!
//! ```text
//! Bytes 0-3: Signature, either "MM\0*" (4D 4D 00 2A, big-endian)
//!            or "II*\0" (49 49 2A 00, little-endian)
//! Bytes 4-7: Offset to first IFD (4 bytes, relative to the header start)
//! ```
//!
//! The header may sit at a non-zero `base` position when the TIFF is
//! embedded inside a container. Every offset stored in the file is relative
//! to that base.

use std::io::{Read, Seek};

use crate::error::TiffError;
use crate::io::EndianStream;

// =============================================================================
// Constants
// =============================================================================

/// Signature of a big-endian classic TIFF ("MM", version 42)
const BIG_ENDIAN_SIGNATURE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A];

/// Signature of a little-endian classic TIFF ("II", version 42)
const LITTLE_ENDIAN_SIGNATURE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00];

/// BigTIFF signatures (version 43), recognized only to be rejected
const BIG_ENDIAN_BIGTIFF_SIGNATURE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2B];
const LITTLE_ENDIAN_BIGTIFF_SIGNATURE: [u8; 4] = [0x49, 0x49, 0x2B, 0x00];

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Position of the first-IFD offset field, relative to the header start
pub const FIRST_IFD_OFFSET_FIELD: u64 = 4;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order declared by the "II"/"MM" marker. Every multi-byte field in
/// the file, offsets included, uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II"
    LittleEndian,
    /// "MM"
    BigEndian,
}

impl ByteOrder {
    /// Decode the first two bytes of `bytes`.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 2 bytes.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Decode the first four bytes of `bytes`.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Encode a u16 in this byte order.
    #[inline]
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Encode a u32 in this byte order.
    #[inline]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Human-readable name, as used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "little-endian",
            ByteOrder::BigEndian => "big-endian",
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed classic TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Offset to the first IFD, relative to the header start
    pub first_ifd_offset: u32,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw header bytes (at least 8)
    /// * `file_size` - Size of the TIFF data counted from the header start
    ///
    /// # Errors
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `BigTiffUnsupported` for a BigTIFF signature
    /// - `InvalidSignature` for anything else that is not a classic TIFF signature
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let signature = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let byte_order = match signature {
            BIG_ENDIAN_SIGNATURE => ByteOrder::BigEndian,
            LITTLE_ENDIAN_SIGNATURE => ByteOrder::LittleEndian,
            BIG_ENDIAN_BIGTIFF_SIGNATURE | LITTLE_ENDIAN_BIGTIFF_SIGNATURE => {
                return Err(TiffError::BigTiffUnsupported)
            }
            _ => return Err(TiffError::InvalidSignature(signature)),
        };

        let first_ifd_offset = byte_order.read_u32(&bytes[4..8]);
        if u64::from(first_ifd_offset) >= file_size {
            return Err(TiffError::InvalidIfdOffset(u64::from(first_ifd_offset)));
        }

        Ok(TiffHeader {
            byte_order,
            first_ifd_offset,
        })
    }

    /// Read and parse the header located at `base` in `inner`.
    pub fn read<S: Read + Seek>(inner: &mut S, base: u64) -> Result<Self, TiffError> {
        let file_size = inner.seek(std::io::SeekFrom::End(0))?;
        let available = file_size.saturating_sub(base);
        if available < TIFF_HEADER_SIZE as u64 {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: available,
            });
        }

        inner.seek(std::io::SeekFrom::Start(base))?;
        let mut bytes = [0u8; TIFF_HEADER_SIZE];
        inner.read_exact(&mut bytes)?;
        Self::parse(&bytes, available)
    }
}

impl<S: Read + Seek> EndianStream<S> {
    /// Read the header at `base` and wrap `inner` with the declared byte order.
    pub fn open(mut inner: S, base: u64) -> Result<(Self, TiffHeader), TiffError> {
        let header = TiffHeader::read(&mut inner, base)?;
        Ok((EndianStream::new(inner, header.byte_order, base), header))
    }
}

// =============================================================================
// Tests
// =============================================================================
