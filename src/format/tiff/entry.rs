//! IFD entry views.
//!
//! An entry is 12 bytes: tag (2), field type (2), count (4) and a 4-byte
//! field holding either the value itself or the offset of the value. An
//! [`IfdEntry`] is a snapshot of those bytes at one position. It goes stale
//! as soon as anything is inserted before that position, so entries are
//! re-read after every structural change instead of being kept around.

use std::io::{Read, Seek};

use crate::error::TiffError;
use crate::io::EndianStream;

use super::header::ByteOrder;
use super::tags::{FieldType, TiffTag};

/// Size of an IFD entry in bytes.
pub const IFD_ENTRY_SIZE: u64 = 12;

/// Size of the entry count field at the start of an IFD.
pub const IFD_COUNT_SIZE: u64 = 2;

/// Size of the next-IFD offset field at the end of an IFD.
pub const IFD_NEXT_OFFSET_SIZE: u64 = 4;

/// Position of the value/offset field within an entry.
pub const ENTRY_VALUE_FIELD: u64 = 8;

/// A single IFD entry as read from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    /// Absolute position of the entry's first byte
    pub position: u64,

    /// Raw tag ID
    pub tag: u16,

    /// Raw field type code
    pub field_type_raw: u16,

    /// Parsed field type, `None` if unknown
    pub field_type: Option<FieldType>,

    /// Number of values
    pub count: u32,

    /// The raw value/offset field, in file byte order
    pub value_bytes: [u8; 4],
}

impl IfdEntry {
    /// Read the entry starting at `position`.
    pub fn read<S: Read + Seek>(
        stream: &mut EndianStream<S>,
        position: u64,
    ) -> Result<Self, TiffError> {
        let mut bytes = [0u8; IFD_ENTRY_SIZE as usize];
        stream.read_bytes_at(position, &mut bytes)?;
        Ok(Self::parse(&bytes, position, stream.byte_order()))
    }

    /// Parse an entry from its 12 raw bytes.
    pub fn parse(bytes: &[u8; IFD_ENTRY_SIZE as usize], position: u64, byte_order: ByteOrder) -> Self {
        let field_type_raw = byte_order.read_u16(&bytes[2..4]);
        IfdEntry {
            position,
            tag: byte_order.read_u16(&bytes[0..2]),
            field_type_raw,
            field_type: FieldType::from_u16(field_type_raw),
            count: byte_order.read_u32(&bytes[4..8]),
            value_bytes: [bytes[8], bytes[9], bytes[10], bytes[11]],
        }
    }

    /// The tag, if it is one the patcher knows.
    #[inline]
    pub fn tiff_tag(&self) -> Option<TiffTag> {
        TiffTag::from_u16(self.tag)
    }

    /// Absolute position of the 4-byte value/offset field.
    #[inline]
    pub fn value_position(&self) -> u64 {
        self.position + ENTRY_VALUE_FIELD
    }

    /// The value field interpreted as a u32 (an offset for indirect values).
    #[inline]
    pub fn value_u32(&self, byte_order: ByteOrder) -> u32 {
        byte_order.read_u32(&self.value_bytes)
    }

    /// The first two bytes of the value field as a u16 (inline SHORT values).
    #[inline]
    pub fn value_u16(&self, byte_order: ByteOrder) -> u16 {
        byte_order.read_u16(&self.value_bytes[0..2])
    }

    /// Total size of the entry's value in bytes.
    ///
    /// Returns `None` for unknown field types.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .map(|t| t.total_size(self.count).unwrap_or(u64::MAX))
    }

    /// Whether the value field holds an offset rather than the value itself.
    ///
    /// # Errors
    /// `UnknownFieldType` when the type code is not a TIFF 6.0 type; such an
    /// entry cannot be classified.
    pub fn is_offset(&self) -> Result<bool, TiffError> {
        let size = self.value_byte_size().ok_or(TiffError::UnknownFieldType {
            tag: self.tag,
            field_type: self.field_type_raw,
        })?;
        Ok(size > FieldType::INLINE_THRESHOLD)
    }
}
