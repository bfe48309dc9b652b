//! Directory growth with offset relocation.
//!
//! Adding entries to an IFD means inserting `12 * N` bytes at the end of its
//! entry table. Everything from that point on moves forward, so every stored
//! offset that pointed at or past the insertion point has to grow by the
//! same amount:
//!
//! - the header's first-IFD offset and every next-IFD offset
//! - the value field of every entry whose value does not fit inline
//! - the values of offset-holding tags (strip/tile offsets, sub-IFD pointers, ...)
//!
//! Offsets below the insertion point are left alone. Their targets did not move.
//!
//! The relocation walk runs twice. First in check mode over the untouched
//! file, which rejects unclassifiable entries and overflowing offsets before
//! anything is written. Then in apply mode after the splice. Each pointer is
//! fixed before it is followed, so the apply walk always sees the new layout.

use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use tracing::{debug, warn};

use crate::error::TiffError;
use crate::io::EndianStream;

use super::entry::{IfdEntry, IFD_COUNT_SIZE, IFD_ENTRY_SIZE};
use super::header::FIRST_IFD_OFFSET_FIELD;
use super::tags::FieldType;
use super::walker::{find_ifd, read_ifd_at, IfdLocation};

/// Field type of freshly inserted entries.
///
/// One value of a 1-byte type always fits inline, so placeholders are never
/// mistaken for offsets by the relocation pass.
pub const PLACEHOLDER_TYPE: FieldType = FieldType::Byte;

/// Outcome of growing one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Index of the grown directory
    pub index: usize,

    /// Absolute position of the directory
    pub ifd_start: u64,

    /// Absolute end of the entry table before the insertion
    pub insertion_point: u64,

    /// Number of entries added
    pub inserted: usize,

    /// Number of bytes the file grew by
    pub grown_by: u64,

    /// Number of stored offsets that were shifted
    pub relocated: usize,
}

/// Insert one placeholder entry per tag into the IFD at `index`.
///
/// Placeholders have type BYTE, count 1, and a provisional value of
/// `12 * i` for the i-th new entry. Callers are expected to overwrite them.
/// The directory's entries are re-sorted by tag afterwards.
///
/// # Errors
/// - `IfdNotFound` if the chain has no directory at `index`
/// - `TooManyEntries` if the entry count would overflow
/// - `UnknownFieldType` / `OffsetOverflow` / bounds errors from the check walk;
///   these are raised before the stream is modified
pub fn insert_entries<S: Read + Write + Seek>(
    stream: &mut EndianStream<S>,
    index: usize,
    tags: &[u16],
) -> Result<Insertion, TiffError> {
    let target = find_ifd(stream, index)?.ok_or(TiffError::IfdNotFound(index))?;
    if tags.is_empty() {
        return Ok(Insertion {
            index,
            ifd_start: target.start,
            insertion_point: target.end,
            inserted: 0,
            grown_by: 0,
            relocated: 0,
        });
    }

    let count = usize::from(target.entry_count) + tags.len();
    let new_count =
        u16::try_from(count).map_err(|_| TiffError::TooManyEntries { index, count })?;
    let grown_by = tags.len() as u64 * IFD_ENTRY_SIZE;

    let size = stream.len()?;
    stream.relative(size + grown_by)?;

    let threshold = stream.relative(target.end)?;
    let shift = grown_by as u32;
    RelocationPass::new(threshold, shift, false).run(stream)?;

    debug!(
        index,
        start = target.start,
        insertion_point = target.end,
        tags = ?tags,
        "Inserting entries"
    );

    let byte_order = stream.byte_order();
    let mut placeholders = Vec::with_capacity(grown_by as usize);
    for (i, tag) in tags.iter().enumerate() {
        placeholders.extend_from_slice(&byte_order.u16_bytes(*tag));
        placeholders.extend_from_slice(&byte_order.u16_bytes(PLACEHOLDER_TYPE.as_u16()));
        placeholders.extend_from_slice(&byte_order.u32_bytes(1));
        placeholders.extend_from_slice(&byte_order.u32_bytes(i as u32 * IFD_ENTRY_SIZE as u32));
    }

    stream.write_u16_at(target.start, new_count)?;

    let remainder = stream.read_to_end_from(target.end)?;
    stream.write_bytes_at(target.end, &placeholders)?;
    stream.write_bytes_at(target.end + grown_by, &remainder)?;

    let relocated = RelocationPass::new(threshold, shift, true).run(stream)?;

    let grown = read_ifd_at(stream, target.start, index)?;
    sort_entries(stream, &grown)?;
    stream.flush()?;

    debug!(index, grown_by, relocated, "Directory grown");

    Ok(Insertion {
        index,
        ifd_start: target.start,
        insertion_point: target.end,
        inserted: tags.len(),
        grown_by,
        relocated,
    })
}

/// Rewrite a directory's entries in ascending tag order.
///
/// Returns `true` if the order changed. Entries keep their own value fields,
/// so nothing they point at moves.
pub fn sort_entries<S: Read + Write + Seek>(
    stream: &mut EndianStream<S>,
    ifd: &IfdLocation,
) -> Result<bool, TiffError> {
    let table_start = ifd.start + IFD_COUNT_SIZE;
    let mut table = vec![0u8; (ifd.end - table_start) as usize];
    stream.read_bytes_at(table_start, &mut table)?;

    let byte_order = stream.byte_order();
    let mut entries: Vec<&[u8]> = table.chunks_exact(IFD_ENTRY_SIZE as usize).collect();
    if entries
        .windows(2)
        .all(|pair| byte_order.read_u16(pair[0]) <= byte_order.read_u16(pair[1]))
    {
        return Ok(false);
    }

    entries.sort_by_key(|entry| byte_order.read_u16(entry));
    let sorted = entries.concat();
    stream.write_bytes_at(table_start, &sorted)?;
    Ok(true)
}

// =============================================================================
// Relocation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotWidth {
    Short,
    Long,
}

impl SlotWidth {
    const fn bytes(self) -> u64 {
        match self {
            SlotWidth::Short => 2,
            SlotWidth::Long => 4,
        }
    }

    const fn max(self) -> u64 {
        match self {
            SlotWidth::Short => u16::MAX as u64,
            SlotWidth::Long => u32::MAX as u64,
        }
    }
}

/// One walk over every directory reachable from the header.
struct RelocationPass {
    /// Stored offsets at or above this value are shifted
    threshold: u32,
    shift: u32,
    apply: bool,
    shifted: HashSet<u64>,
    moved: usize,
}

impl RelocationPass {
    fn new(threshold: u32, shift: u32, apply: bool) -> Self {
        Self {
            threshold,
            shift,
            apply,
            shifted: HashSet::new(),
            moved: 0,
        }
    }

    /// Walk the main chain and every sub-directory, returning how many
    /// offsets were (or would be) shifted.
    fn run<S: Read + Write + Seek>(mut self, stream: &mut EndianStream<S>) -> Result<usize, TiffError> {
        let header_field = stream.base() + FIRST_IFD_OFFSET_FIELD;
        let first = self.shift_slot(stream, header_field, SlotWidth::Long)?;

        let mut pending = Vec::new();
        if first != 0 {
            pending.push(stream.resolve(first));
        }

        let mut visited = HashSet::new();
        while let Some(start) = pending.pop() {
            if !visited.insert(start) {
                continue;
            }
            let ifd = read_ifd_at(stream, start, visited.len() - 1)?;

            for position in ifd.entry_positions() {
                let entry = IfdEntry::read(stream, position)?;
                if entry.is_offset()? {
                    self.shift_slot(stream, entry.value_position(), SlotWidth::Long)?;
                }

                let Some(tag) = entry.tiff_tag().filter(|tag| tag.holds_offsets()) else {
                    continue;
                };
                for slot in self.pointer_slots(stream, &entry)? {
                    let value = self.shift_slot(stream, slot.0, slot.1)?;
                    if tag.is_sub_ifd_pointer() && value != 0 {
                        pending.push(stream.resolve(value));
                    }
                }
            }

            let next = self.shift_slot(stream, ifd.next_offset_position(), SlotWidth::Long)?;
            if next != 0 {
                pending.push(stream.resolve(next));
            }
        }

        Ok(self.moved)
    }

    /// Positions of the offset values held by an offset-holding tag.
    fn pointer_slots<S: Read + Seek>(
        &self,
        stream: &mut EndianStream<S>,
        entry: &IfdEntry,
    ) -> Result<Vec<(u64, SlotWidth)>, TiffError> {
        let width = match entry.field_type {
            Some(FieldType::Short) => SlotWidth::Short,
            Some(FieldType::Long) | Some(FieldType::Ifd) => SlotWidth::Long,
            _ => {
                warn!(
                    tag = entry.tag,
                    field_type = entry.field_type_raw,
                    "Offset tag has a non-integer type, leaving its values untouched"
                );
                return Ok(Vec::new());
            }
        };

        // Re-read the value field: in apply mode it has just been shifted.
        let first = if entry.is_offset()? {
            let stored = stream.read_u32_at(entry.value_position())?;
            stream.resolve(stored)
        } else {
            entry.value_position()
        };

        let length = u64::from(entry.count) * width.bytes();
        if first + length > stream.len()? {
            return Err(TiffError::UnexpectedEof {
                offset: first,
                len: length as usize,
            });
        }

        Ok((0..u64::from(entry.count))
            .map(|i| (first + i * width.bytes(), width))
            .collect())
    }

    /// Shift the offset stored at `position` if it points past the threshold.
    ///
    /// Returns the offset that is valid for the walk's layout: the original
    /// in check mode, the shifted one in apply mode.
    fn shift_slot<S: Read + Write + Seek>(
        &mut self,
        stream: &mut EndianStream<S>,
        position: u64,
        width: SlotWidth,
    ) -> Result<u32, TiffError> {
        let value = match width {
            SlotWidth::Short => u32::from(stream.read_u16_at(position)?),
            SlotWidth::Long => stream.read_u32_at(position)?,
        };
        if value < self.threshold || !self.shifted.insert(position) {
            return Ok(value);
        }

        let moved = u64::from(value) + u64::from(self.shift);
        if moved > width.max() {
            return Err(TiffError::OffsetOverflow {
                offset: moved,
                width: width.bytes() as usize,
            });
        }
        self.moved += 1;

        if !self.apply {
            return Ok(value);
        }
        match width {
            SlotWidth::Short => stream.write_u16_at(position, moved as u16)?,
            SlotWidth::Long => stream.write_u32_at(position, moved as u32)?,
        }
        Ok(moved as u32)
    }
}

// =============================================================================
// Tests
// =============================================================================
