//! IFD chain traversal.
//!
//! ```text
//! IFD layout:
//!   start            entry count (2 bytes)
//!   start + 2        count x 12-byte entries
//!   end              offset of the next IFD (4 bytes, 0 = end of chain)
//! ```
//!
//! Traversal is driven by [`IfdCursor`], which holds nothing but the position
//! of the next directory. The stream is passed into every call, so a cursor
//! cannot keep a borrow alive across a mutation and every step re-reads the
//! chain from the stream.

use std::collections::HashSet;
use std::io::{Read, Seek};

use tracing::debug;

use crate::error::TiffError;
use crate::io::EndianStream;

use super::entry::{IfdEntry, IFD_COUNT_SIZE, IFD_ENTRY_SIZE, IFD_NEXT_OFFSET_SIZE};
use super::header::FIRST_IFD_OFFSET_FIELD;

// =============================================================================
// IfdLocation
// =============================================================================

/// Location of one directory in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdLocation {
    /// 0-based position in the chain
    pub index: usize,

    /// Absolute position of the entry count field
    pub start: u64,

    /// Absolute position one past the last entry (the next-IFD offset field)
    pub end: u64,

    /// Number of entries
    pub entry_count: u16,
}

impl IfdLocation {
    /// Absolute positions of every entry, in storage order.
    pub fn entry_positions(&self) -> impl Iterator<Item = u64> {
        (self.start + IFD_COUNT_SIZE..self.end).step_by(IFD_ENTRY_SIZE as usize)
    }

    /// Absolute position of the next-IFD offset field.
    #[inline]
    pub fn next_offset_position(&self) -> u64 {
        self.end
    }
}

/// Read the directory header at `start` and check it fits in the stream.
pub fn read_ifd_at<S: Read + Seek>(
    stream: &mut EndianStream<S>,
    start: u64,
    index: usize,
) -> Result<IfdLocation, TiffError> {
    let size = stream.len()?;
    if start < stream.base() || start + IFD_COUNT_SIZE > size {
        return Err(TiffError::InvalidIfdOffset(start.saturating_sub(stream.base())));
    }

    let entry_count = stream.read_u16_at(start)?;
    let end = start + IFD_COUNT_SIZE + u64::from(entry_count) * IFD_ENTRY_SIZE;
    if end + IFD_NEXT_OFFSET_SIZE > size {
        return Err(TiffError::IfdOutOfBounds {
            start,
            end: end + IFD_NEXT_OFFSET_SIZE,
            size,
        });
    }

    Ok(IfdLocation {
        index,
        start,
        end,
        entry_count,
    })
}

/// Read every entry of a directory.
pub fn read_entries<S: Read + Seek>(
    stream: &mut EndianStream<S>,
    ifd: &IfdLocation,
) -> Result<Vec<IfdEntry>, TiffError> {
    ifd.entry_positions()
        .map(|position| IfdEntry::read(stream, position))
        .collect()
}

// =============================================================================
// IfdCursor
// =============================================================================

/// Cursor over the main IFD chain.
#[derive(Debug, Clone)]
pub struct IfdCursor {
    next: Option<u64>,
    index: usize,
    visited: HashSet<u64>,
}

impl IfdCursor {
    /// Start a cursor at the first IFD named by the header.
    pub fn new<S: Read + Seek>(stream: &mut EndianStream<S>) -> Result<Self, TiffError> {
        let first = stream.read_u32_at(stream.base() + FIRST_IFD_OFFSET_FIELD)?;
        Ok(Self {
            next: (first != 0).then(|| stream.resolve(first)),
            index: 0,
            visited: HashSet::new(),
        })
    }

    /// Read the next directory, or `None` once the chain ends.
    pub fn advance<S: Read + Seek>(
        &mut self,
        stream: &mut EndianStream<S>,
    ) -> Result<Option<IfdLocation>, TiffError> {
        let Some(start) = self.next.take() else {
            return Ok(None);
        };
        if !self.visited.insert(start) {
            return Err(TiffError::IfdCycle(start - stream.base()));
        }

        let ifd = read_ifd_at(stream, start, self.index)?;
        let next = stream.read_u32_at(ifd.next_offset_position())?;
        debug!(
            index = ifd.index,
            start = ifd.start,
            entries = ifd.entry_count,
            next,
            "Read IFD"
        );

        self.next = (next != 0).then(|| stream.resolve(next));
        self.index += 1;
        Ok(Some(ifd))
    }
}

/// Collect the locations of every directory in the main chain.
pub fn ifd_chain<S: Read + Seek>(
    stream: &mut EndianStream<S>,
) -> Result<Vec<IfdLocation>, TiffError> {
    let mut cursor = IfdCursor::new(stream)?;
    let mut chain = Vec::new();
    while let Some(ifd) = cursor.advance(stream)? {
        chain.push(ifd);
    }
    Ok(chain)
}

/// Find the directory at `index` in the main chain.
pub fn find_ifd<S: Read + Seek>(
    stream: &mut EndianStream<S>,
    index: usize,
) -> Result<Option<IfdLocation>, TiffError> {
    let mut cursor = IfdCursor::new(stream)?;
    while let Some(ifd) = cursor.advance(stream)? {
        if ifd.index == index {
            return Ok(Some(ifd));
        }
    }
    Ok(None)
}

// =============================================================================
// Tests
// =============================================================================
