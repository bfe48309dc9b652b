//! Resolution patching.
//!
//! Patching runs in two phases over the same stream:
//!
//! 1. Every directory missing XResolution, YResolution or ResolutionUnit is
//!    grown by the missing entries (see [`insert_entries`]).
//! 2. Every directory is walked again and the three tags are overwritten:
//!    X and Y become RATIONAL x 1 pointing at the new fraction, the unit
//!    becomes an inline SHORT.
//!
//! X/Y values are written in place when the entry already is a RATIONAL x 1
//! with a usable offset. Otherwise 8 bytes are appended at the word-aligned
//! end of the stream. A second run therefore finds nothing to insert or
//! append and leaves the file byte-identical.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, warn};

use crate::error::{PatchError, TiffError};
use crate::format::tiff::{
    ifd_chain, insert_entries, read_entries, FieldType, IfdCursor, IfdEntry, TiffTag,
    IFD_NEXT_OFFSET_SIZE, TIFF_HEADER_SIZE,
};
use crate::io::EndianStream;

use super::{Rational, ResolutionUnit};

/// Size of a RATIONAL value in bytes.
const RATIONAL_SIZE: u64 = 8;

// =============================================================================
// Settings
// =============================================================================

/// Everything one patch run needs to know.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchSettings {
    pub x_resolution: Rational,
    pub y_resolution: Rational,
    pub unit: ResolutionUnit,

    /// Suppress per-tag status lines
    pub quiet: bool,

    /// Position of the TIFF header in the stream (non-zero for embedded TIFFs)
    pub base_offset: u64,

    /// Patch a staged copy and discard it (file-level only)
    pub dry_run: bool,
}

impl PatchSettings {
    /// Settings for the given densities, in inches.
    pub fn new(x_resolution: Rational, y_resolution: Rational) -> Self {
        Self {
            x_resolution,
            y_resolution,
            unit: ResolutionUnit::default(),
            quiet: false,
            base_offset: 0,
            dry_run: false,
        }
    }

    pub fn with_unit(mut self, unit: ResolutionUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_base_offset(mut self, base_offset: u64) -> Self {
        self.base_offset = base_offset;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

// =============================================================================
// Report
// =============================================================================

/// What a patch run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchReport {
    pub byte_order: &'static str,
    pub x_resolution: Rational,
    pub y_resolution: Rational,
    pub unit: ResolutionUnit,
    pub directories: Vec<DirectoryReport>,

    /// Growth of the stream, from inserted entries and appended values
    pub bytes_added: u64,

    pub dry_run: bool,
}

/// Per-directory part of a [`PatchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryReport {
    pub index: usize,

    /// Position of the directory after patching
    pub start: u64,

    /// Tags that had to be added
    pub inserted: Vec<TiffTag>,
}

// =============================================================================
// Patching
// =============================================================================

/// Patch every directory of the TIFF in `inner`.
///
/// The stream is modified in place. A failure in the insertion check leaves
/// it untouched, but an I/O error midway can leave it half-written; use
/// [`patch_file`] for files.
pub fn patch_stream<S: Read + Write + Seek>(
    inner: S,
    settings: &PatchSettings,
) -> Result<PatchReport, PatchError> {
    let (mut stream, header) = EndianStream::open(inner, settings.base_offset)?;
    let initial_len = stream.len()?;
    debug!(
        byte_order = header.byte_order.name(),
        first_ifd = header.first_ifd_offset,
        "Opened TIFF"
    );

    let missing = missing_tags(&mut stream)?;
    for (index, tags) in missing.iter().enumerate() {
        if tags.is_empty() {
            continue;
        }
        let ids: Vec<u16> = tags.iter().map(|tag| tag.as_u16()).collect();
        insert_entries(&mut stream, index, &ids)?;
    }

    let mut reserved = vec![(stream.base(), stream.base() + TIFF_HEADER_SIZE as u64)];
    for ifd in ifd_chain(&mut stream)? {
        reserved.push((ifd.start, ifd.end + IFD_NEXT_OFFSET_SIZE));
    }
    let mut writer = ValueWriter::new(reserved);
    let mut directories = Vec::with_capacity(missing.len());
    let mut cursor = IfdCursor::new(&mut stream)?;
    while let Some(ifd) = cursor.advance(&mut stream)? {
        for position in ifd.entry_positions() {
            let entry = IfdEntry::read(&mut stream, position)?;
            match entry.tiff_tag() {
                Some(TiffTag::XResolution) => {
                    writer.write_rational(&mut stream, &entry, settings.x_resolution)?;
                    if !settings.quiet {
                        info!(
                            ifd = ifd.index,
                            start = ifd.start,
                            "Setting x-density to {}{}",
                            settings.x_resolution,
                            settings.unit.density_suffix()
                        );
                    }
                }
                Some(TiffTag::YResolution) => {
                    writer.write_rational(&mut stream, &entry, settings.y_resolution)?;
                    if !settings.quiet {
                        info!(
                            ifd = ifd.index,
                            start = ifd.start,
                            "Setting y-density to {}{}",
                            settings.y_resolution,
                            settings.unit.density_suffix()
                        );
                    }
                }
                Some(TiffTag::ResolutionUnit) => {
                    write_unit(&mut stream, &entry, settings.unit)?;
                    if !settings.quiet {
                        info!(
                            ifd = ifd.index,
                            start = ifd.start,
                            "Setting density unit to {}",
                            settings.unit
                        );
                    }
                }
                _ => {}
            }
        }

        directories.push(DirectoryReport {
            index: ifd.index,
            start: ifd.start,
            inserted: missing.get(ifd.index).cloned().unwrap_or_default(),
        });
    }
    stream.flush()?;

    Ok(PatchReport {
        byte_order: header.byte_order.name(),
        x_resolution: settings.x_resolution,
        y_resolution: settings.y_resolution,
        unit: settings.unit,
        directories,
        bytes_added: stream.len()? - initial_len,
        dry_run: settings.dry_run,
    })
}

/// Patch the TIFF file at `path`.
///
/// The file is copied next to itself, the copy is patched and synced, then
/// renamed over the original. The original is never written to directly,
/// so a failure at any point leaves it as it was. With `dry_run` the
/// patched copy is discarded instead.
pub fn patch_file(path: &Path, settings: &PatchSettings) -> Result<PatchReport, PatchError> {
    let _span = info_span!("patch", file = %path.display()).entered();

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut original = File::open(path)?;
    let permissions = original.metadata()?.permissions();

    let mut staged = NamedTempFile::new_in(parent)?;
    io::copy(&mut original, staged.as_file_mut())?;
    drop(original);

    let report = patch_stream(staged.as_file_mut(), settings)?;

    if settings.dry_run {
        debug!(bytes_added = report.bytes_added, "Dry run, discarding patched copy");
        return Ok(report);
    }

    staged.as_file().sync_all()?;
    fs::set_permissions(staged.path(), permissions)?;
    staged.persist(path).map_err(|e| e.error)?;
    debug!(bytes_added = report.bytes_added, "Patched file persisted");

    Ok(report)
}

/// For each directory in the chain, the resolution tags it lacks.
fn missing_tags<S: Read + Seek>(
    stream: &mut EndianStream<S>,
) -> Result<Vec<Vec<TiffTag>>, TiffError> {
    let mut missing = Vec::new();
    for ifd in ifd_chain(stream)? {
        let present: HashSet<u16> = read_entries(stream, &ifd)?
            .iter()
            .map(|entry| entry.tag)
            .collect();
        let absent: Vec<TiffTag> = TiffTag::RESOLUTION_TAGS
            .into_iter()
            .filter(|tag| !present.contains(&tag.as_u16()))
            .collect();
        if !absent.is_empty() {
            debug!(ifd = ifd.index, tags = ?absent, "Missing resolution tags");
        }
        missing.push(absent);
    }
    Ok(missing)
}

// =============================================================================
// Value Writing
// =============================================================================

/// Writes resolution values, remembering which value slots it has claimed.
#[derive(Debug)]
struct ValueWriter {
    claimed: HashSet<u64>,
    /// Header and directory byte ranges a value slot must not overlap
    reserved: Vec<(u64, u64)>,
}

impl ValueWriter {
    fn new(reserved: Vec<(u64, u64)>) -> Self {
        Self {
            claimed: HashSet::new(),
            reserved,
        }
    }

    /// Turn `entry` into RATIONAL x 1 holding `value`.
    fn write_rational<S: Read + Write + Seek>(
        &mut self,
        stream: &mut EndianStream<S>,
        entry: &IfdEntry,
        value: Rational,
    ) -> Result<(), TiffError> {
        let target = match self.reusable_slot(stream, entry)? {
            Some(target) => target,
            None => append_aligned(stream, RATIONAL_SIZE)?,
        };
        self.claimed.insert(target);

        stream.write_u16_at(entry.position + 2, FieldType::Rational.as_u16())?;
        stream.write_u32_at(entry.position + 4, 1)?;
        let stored = stream.relative(target)?;
        stream.write_u32_at(entry.value_position(), stored)?;
        stream.write_bytes_at(target, &value.to_bytes(stream.byte_order()))?;
        Ok(())
    }

    /// The existing value slot of `entry`, if it can be overwritten in place.
    fn reusable_slot<S: Read + Seek>(
        &self,
        stream: &mut EndianStream<S>,
        entry: &IfdEntry,
    ) -> Result<Option<u64>, TiffError> {
        if entry.field_type != Some(FieldType::Rational) {
            return Ok(None);
        }
        if entry.count != 1 {
            warn!(
                tag = entry.tag,
                count = entry.count,
                "RATIONAL resolution entry with count != 1, writing a fresh value"
            );
            return Ok(None);
        }

        let offset = entry.value_u32(stream.byte_order());
        let target = stream.resolve(offset);
        let slot_end = target + RATIONAL_SIZE;
        if slot_end > stream.len()? {
            return Ok(None);
        }
        if let Some(&(start, end)) = self
            .reserved
            .iter()
            .find(|&&(start, end)| target < end && slot_end > start)
        {
            warn!(
                tag = entry.tag,
                offset,
                start,
                end,
                "RATIONAL value overlaps TIFF structure, writing a fresh value"
            );
            return Ok(None);
        }
        // X and Y sharing one slot would end up with the same value
        Ok((!self.claimed.contains(&target)).then_some(target))
    }
}

/// Append `len` zero bytes at the end of the stream, starting at an even
/// offset, and return their position.
fn append_aligned<S: Write + Seek>(
    stream: &mut EndianStream<S>,
    len: u64,
) -> Result<u64, TiffError> {
    let end = stream.len()?;
    let padding = u64::from(stream.relative(end)? % 2);
    let target = end + padding;
    stream.relative(target + len)?;

    stream.write_bytes_at(end, &vec![0u8; (padding + len) as usize])?;
    Ok(target)
}

/// Turn `entry` into an inline SHORT x 1 holding the unit code.
fn write_unit<S: Write + Seek>(
    stream: &mut EndianStream<S>,
    entry: &IfdEntry,
    unit: ResolutionUnit,
) -> Result<(), TiffError> {
    let byte_order = stream.byte_order();
    let mut value = [0u8; 4];
    value[0..2].copy_from_slice(&byte_order.u16_bytes(unit.code()));

    stream.write_u16_at(entry.position + 2, FieldType::Short.as_u16())?;
    stream.write_u32_at(entry.position + 4, 1)?;
    stream.write_bytes_at(entry.value_position(), &value)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
