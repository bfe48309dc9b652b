//! Test utilities for integration tests.
//!
//! This module provides a builder for TIFF files with the layouts the patcher
//! has to cope with (several directories, strips, Exif sub-directories,
//! directories stored out of chain order, TIFFs embedded after a prefix) and a
//! small standalone reader used to check the patched bytes.

use std::collections::HashSet;

// =============================================================================
// TIFF File Builder
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

impl ByteOrderType {
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrderType::LittleEndian => u16::from_le_bytes(raw),
            ByteOrderType::BigEndian => u16::from_be_bytes(raw),
        }
    }

    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrderType::LittleEndian => u32::from_le_bytes(raw),
            ByteOrderType::BigEndian => u32::from_be_bytes(raw),
        }
    }
}

/// Builder for creating test TIFF files.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    prefix: Vec<u8>,
    reversed_layout: bool,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            prefix: Vec::new(),
            reversed_layout: false,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    /// Put `prefix` in front of the TIFF header, as a container would.
    pub fn with_prefix(mut self, prefix: Vec<u8>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Store the directories in reverse chain order, so the last directory
    /// of the chain comes first in the file.
    pub fn with_reversed_layout(mut self, reversed: bool) -> Self {
        self.reversed_layout = reversed;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the TIFF file data.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;
        let base = self.prefix.len();
        let mut data = self.prefix.clone();

        match order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        data.extend_from_slice(&order.u16_bytes(42));
        let first_ifd_field = data.len();
        data.extend_from_slice(&[0; 4]);

        let mut physical: Vec<usize> = (0..self.ifds.len()).collect();
        if self.reversed_layout {
            physical.reverse();
        }

        let mut placed = vec![(0u32, 0usize); self.ifds.len()];
        for index in physical {
            placed[index] = self.ifds[index].write_to(&mut data, order, base);
        }

        if let Some((start, _)) = placed.first() {
            data[first_ifd_field..first_ifd_field + 4].copy_from_slice(&order.u32_bytes(*start));
        }
        for pair in placed.windows(2) {
            let (_, next_field) = pair[0];
            let (next_start, _) = pair[1];
            data[next_field..next_field + 4].copy_from_slice(&order.u32_bytes(next_start));
        }

        data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

enum EntryValue {
    /// Value stored in the entry itself (at most 4 bytes, file byte order applied at build)
    Inline(u32),

    /// Value stored after the directory
    External(Vec<u8>),

    /// LONG array, inline when it holds a single value
    Longs(Vec<u32>),

    /// Strip pixel data; the entry holds the offsets
    Strips(Vec<Vec<u8>>),

    /// A sub-directory; the entry holds its offset
    SubIfd(Box<IfdBuilder>),
}

struct IfdEntryBuilder {
    tag: u16,
    field_type: u16,
    count: u32,
    value: EntryValue,
}

/// Builder for one directory.
pub struct IfdBuilder {
    entries: Vec<IfdEntryBuilder>,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A directory with ImageWidth and ImageLength only.
    pub fn image(width: u32, height: u32) -> Self {
        let mut builder = Self::new();
        builder
            .add_entry(256, 4, 1, width) // ImageWidth
            .add_entry(257, 4, 1, height); // ImageLength
        builder
    }

    /// Add an entry whose value fits inline (BYTE, SHORT or LONG, count 1).
    pub fn add_entry(&mut self, tag: u16, field_type: u16, count: u32, value: u32) -> &mut Self {
        self.entries.push(IfdEntryBuilder {
            tag,
            field_type,
            count,
            value: EntryValue::Inline(value),
        });
        self
    }

    /// Add an entry whose value is stored after the directory.
    pub fn add_entry_with_data(
        &mut self,
        tag: u16,
        field_type: u16,
        count: u32,
        data: Vec<u8>,
    ) -> &mut Self {
        self.entries.push(IfdEntryBuilder {
            tag,
            field_type,
            count,
            value: EntryValue::External(data),
        });
        self
    }

    /// Add an ASCII entry (always long enough to be stored externally).
    pub fn add_ascii(&mut self, tag: u16, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        assert!(bytes.len() > 4, "use add_entry for short values");
        let count = bytes.len() as u32;
        self.add_entry_with_data(tag, 2, count, bytes)
    }

    /// Add a RATIONAL x 1 entry.
    pub fn add_rational(
        &mut self,
        order: ByteOrderType,
        tag: u16,
        numerator: u32,
        denominator: u32,
    ) -> &mut Self {
        let mut bytes = order.u32_bytes(numerator).to_vec();
        bytes.extend_from_slice(&order.u32_bytes(denominator));
        self.add_entry_with_data(tag, 5, 1, bytes)
    }

    /// Add StripOffsets / StripByteCounts for the given strips.
    pub fn with_strips(mut self, strips: Vec<Vec<u8>>) -> Self {
        let count = strips.len() as u32;
        let lengths = strips.iter().map(|s| s.len() as u32).collect();

        self.entries.push(IfdEntryBuilder {
            tag: 273, // StripOffsets
            field_type: 4,
            count,
            value: EntryValue::Strips(strips),
        });
        self.entries.push(IfdEntryBuilder {
            tag: 279, // StripByteCounts
            field_type: 4,
            count,
            value: EntryValue::Longs(lengths),
        });
        self
    }

    /// Attach an Exif sub-directory through tag 34665.
    pub fn with_exif(mut self, exif: IfdBuilder) -> Self {
        self.entries.push(IfdEntryBuilder {
            tag: 34665,
            field_type: 4,
            count: 1,
            value: EntryValue::SubIfd(Box::new(exif)),
        });
        self
    }

    /// Write the directory and everything it owns at the end of `data`.
    ///
    /// Returns the directory's stored offset and the absolute position of its
    /// next-IFD field.
    fn write_to(&self, data: &mut Vec<u8>, order: ByteOrderType, base: usize) -> (u32, usize) {
        align(data, base);
        let start = data.len();

        let mut entries: Vec<&IfdEntryBuilder> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.tag);

        data.extend_from_slice(&order.u16_bytes(entries.len() as u16));
        let table = data.len();
        data.resize(table + entries.len() * 12, 0);
        let next_field = data.len();
        data.extend_from_slice(&[0; 4]);

        for (i, entry) in entries.iter().enumerate() {
            let at = table + i * 12;
            data[at..at + 2].copy_from_slice(&order.u16_bytes(entry.tag));
            data[at + 2..at + 4].copy_from_slice(&order.u16_bytes(entry.field_type));
            data[at + 4..at + 8].copy_from_slice(&order.u32_bytes(entry.count));

            let field: [u8; 4] = match &entry.value {
                EntryValue::Inline(value) => inline_bytes(order, entry.field_type, *value),
                EntryValue::External(bytes) => order.u32_bytes(append(data, base, bytes)),
                EntryValue::Longs(values) => longs(data, order, base, values),
                EntryValue::Strips(strips) => {
                    let offsets: Vec<u32> =
                        strips.iter().map(|strip| append(data, base, strip)).collect();
                    longs(data, order, base, &offsets)
                }
                EntryValue::SubIfd(sub) => order.u32_bytes(sub.write_to(data, order, base).0),
            };
            data[at + 8..at + 12].copy_from_slice(&field);
        }

        ((start - base) as u32, next_field)
    }
}

impl Default for IfdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn inline_bytes(order: ByteOrderType, field_type: u16, value: u32) -> [u8; 4] {
    let mut field = [0u8; 4];
    match field_type {
        1 | 2 | 6 | 7 => field[0] = value as u8,
        3 | 8 => field[0..2].copy_from_slice(&order.u16_bytes(value as u16)),
        _ => field.copy_from_slice(&order.u32_bytes(value)),
    }
    field
}

/// Value field for a LONG array: the value itself, or the offset of the array.
fn longs(data: &mut Vec<u8>, order: ByteOrderType, base: usize, values: &[u32]) -> [u8; 4] {
    if values.len() == 1 {
        return order.u32_bytes(values[0]);
    }
    let mut array = Vec::new();
    for value in values {
        array.extend_from_slice(&order.u32_bytes(*value));
    }
    order.u32_bytes(append(data, base, &array))
}

fn align(data: &mut Vec<u8>, base: usize) {
    if (data.len() - base) % 2 == 1 {
        data.push(0);
    }
}

/// Append `bytes` at a word boundary and return their stored offset.
fn append(data: &mut Vec<u8>, base: usize, bytes: &[u8]) -> u32 {
    align(data, base);
    let offset = (data.len() - base) as u32;
    data.extend_from_slice(bytes);
    offset
}

// =============================================================================
// Standalone Reader
// =============================================================================

/// One entry as stored in the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub field: [u8; 4],
}

impl RawEntry {
    pub fn value_u32(&self, order: ByteOrderType) -> u32 {
        order.read_u32(&self.field)
    }

    pub fn value_u16(&self, order: ByteOrderType) -> u16 {
        order.read_u16(&self.field)
    }

    /// Total value size in bytes.
    pub fn byte_len(&self) -> usize {
        let size = match self.field_type {
            1 | 2 | 6 | 7 => 1,
            3 | 8 => 2,
            4 | 9 | 11 | 13 => 4,
            5 | 10 | 12 => 8,
            other => panic!("unknown field type {other}"),
        };
        size * self.count as usize
    }

    pub fn is_offset(&self) -> bool {
        self.byte_len() > 4
    }
}

/// One directory as stored in the file.
#[derive(Clone, Debug)]
pub struct RawIfd {
    /// Absolute position
    pub start: usize,
    pub entries: Vec<RawEntry>,
    pub next: u32,
}

impl RawIfd {
    pub fn entry(&self, tag: u16) -> Option<&RawEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn tags(&self) -> Vec<u16> {
        self.entries.iter().map(|e| e.tag).collect()
    }
}

/// Minimal TIFF reader, independent of the crate under test.
pub struct RawTiff<'a> {
    pub data: &'a [u8],
    pub base: usize,
    pub order: ByteOrderType,
}

impl<'a> RawTiff<'a> {
    pub fn new(data: &'a [u8], base: usize) -> Self {
        let order = match &data[base..base + 2] {
            b"II" => ByteOrderType::LittleEndian,
            b"MM" => ByteOrderType::BigEndian,
            other => panic!("not a TIFF: {other:?}"),
        };
        Self { data, base, order }
    }

    pub fn read_ifd(&self, offset: u32) -> RawIfd {
        let start = self.base + offset as usize;
        let count = self.order.read_u16(&self.data[start..]) as usize;
        let entries = (0..count)
            .map(|i| {
                let at = start + 2 + i * 12;
                RawEntry {
                    tag: self.order.read_u16(&self.data[at..]),
                    field_type: self.order.read_u16(&self.data[at + 2..]),
                    count: self.order.read_u32(&self.data[at + 4..]),
                    field: self.data[at + 8..at + 12].try_into().unwrap(),
                }
            })
            .collect();
        let next = self.order.read_u32(&self.data[start + 2 + count * 12..]);
        RawIfd {
            start,
            entries,
            next,
        }
    }

    /// Every directory of the main chain, panicking on a loop.
    pub fn chain(&self) -> Vec<RawIfd> {
        let mut ifds = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = self.order.read_u32(&self.data[self.base + 4..]);
        while offset != 0 {
            assert!(seen.insert(offset), "IFD chain loops at {offset}");
            let ifd = self.read_ifd(offset);
            offset = ifd.next;
            ifds.push(ifd);
        }
        ifds
    }

    /// The bytes an entry's value occupies.
    pub fn payload(&self, entry: &RawEntry) -> Vec<u8> {
        if entry.is_offset() {
            let start = self.base + entry.value_u32(self.order) as usize;
            self.data[start..start + entry.byte_len()].to_vec()
        } else {
            entry.field[..entry.byte_len()].to_vec()
        }
    }

    /// A RATIONAL x 1 entry's (numerator, denominator).
    pub fn rational(&self, entry: &RawEntry) -> (u32, u32) {
        assert_eq!((entry.field_type, entry.count), (5, 1));
        let payload = self.payload(entry);
        (
            self.order.read_u32(&payload[0..4]),
            self.order.read_u32(&payload[4..8]),
        )
    }

    /// The bytes of every strip of a directory.
    pub fn strips(&self, ifd: &RawIfd) -> Vec<Vec<u8>> {
        let offsets = self.u32_values(ifd.entry(273).expect("StripOffsets"));
        let counts = self.u32_values(ifd.entry(279).expect("StripByteCounts"));
        offsets
            .iter()
            .zip(&counts)
            .map(|(offset, count)| {
                let start = self.base + *offset as usize;
                self.data[start..start + *count as usize].to_vec()
            })
            .collect()
    }

    fn u32_values(&self, entry: &RawEntry) -> Vec<u32> {
        assert_eq!(entry.field_type, 4);
        self.payload(entry)
            .chunks_exact(4)
            .map(|chunk| self.order.read_u32(chunk))
            .collect()
    }
}

// =============================================================================
// Sample Files
// =============================================================================

/// Pixel data for `count` strips of `len` bytes, each strip distinct.
pub fn sample_strips(count: usize, len: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|strip| (0..len).map(|i| (strip * 31 + i) as u8).collect())
        .collect()
}

/// Big-endian TIFF with a single directory holding only ImageWidth.
pub fn create_width_only_tiff() -> Vec<u8> {
    let mut ifd = IfdBuilder::new();
    ifd.add_entry(256, 4, 1, 640);
    TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_ifd(ifd)
        .build()
}

/// Multi-page TIFF: a full-resolution page with strips and a description,
/// and a thumbnail page with its own strip.
pub fn create_multi_page_tiff(order: ByteOrderType) -> Vec<u8> {
    let mut page = IfdBuilder::image(64, 4).with_strips(sample_strips(4, 64));
    page.add_ascii(270, "full resolution page");

    let mut thumbnail = IfdBuilder::image(8, 1).with_strips(sample_strips(1, 8));
    thumbnail
        .add_entry(254, 4, 1, 1) // NewSubfileType = reduced resolution
        .add_ascii(305, "test-suite");

    TiffBuilder::new()
        .with_byte_order(order)
        .add_ifd(page)
        .add_ifd(thumbnail)
        .build()
}
