//! Read-only view of the resolution tags in every directory.

use std::io::{Read, Seek};

use serde::Serialize;
use tracing::warn;

use crate::error::TiffError;
use crate::format::tiff::{read_entries, FieldType, IfdCursor, IfdEntry, TiffTag};
use crate::io::EndianStream;

use super::{Rational, ResolutionUnit};

/// Resolution tags of one directory, `None` where a tag is absent or unreadable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionInfo {
    pub index: usize,
    pub start: u64,
    pub x_resolution: Option<Rational>,
    pub y_resolution: Option<Rational>,
    pub unit: Option<ResolutionUnit>,
}

/// List the resolution of every directory in the main chain.
pub fn read_resolutions<S: Read + Seek>(
    inner: S,
    base_offset: u64,
) -> Result<Vec<ResolutionInfo>, TiffError> {
    let (mut stream, _) = EndianStream::open(inner, base_offset)?;

    let mut infos = Vec::new();
    let mut cursor = IfdCursor::new(&mut stream)?;
    while let Some(ifd) = cursor.advance(&mut stream)? {
        let mut info = ResolutionInfo {
            index: ifd.index,
            start: ifd.start,
            x_resolution: None,
            y_resolution: None,
            unit: None,
        };

        for entry in read_entries(&mut stream, &ifd)? {
            match entry.tiff_tag() {
                Some(TiffTag::XResolution) => info.x_resolution = read_rational(&mut stream, &entry)?,
                Some(TiffTag::YResolution) => info.y_resolution = read_rational(&mut stream, &entry)?,
                Some(TiffTag::ResolutionUnit) => info.unit = read_unit(&stream, &entry),
                _ => {}
            }
        }
        infos.push(info);
    }

    Ok(infos)
}

fn read_rational<S: Read + Seek>(
    stream: &mut EndianStream<S>,
    entry: &IfdEntry,
) -> Result<Option<Rational>, TiffError> {
    let byte_order = stream.byte_order();
    let value = match entry.field_type {
        Some(FieldType::Rational) if entry.count >= 1 => {
            let mut bytes = [0u8; 8];
            let position = stream.resolve(entry.value_u32(byte_order));
            stream.read_bytes_at(position, &mut bytes)?;
            Rational::from_bytes(&bytes, byte_order)
        }
        // Some writers store whole-number densities as integers
        Some(FieldType::Short) if entry.count == 1 => {
            Rational::new(u64::from(entry.value_u16(byte_order)), 1).ok()
        }
        Some(FieldType::Long) if entry.count == 1 => {
            Rational::new(u64::from(entry.value_u32(byte_order)), 1).ok()
        }
        _ => None,
    };

    if value.is_none() {
        warn!(
            tag = entry.tag,
            field_type = entry.field_type_raw,
            count = entry.count,
            "Unreadable resolution value"
        );
    }
    Ok(value)
}

fn read_unit<S>(stream: &EndianStream<S>, entry: &IfdEntry) -> Option<ResolutionUnit> {
    if entry.field_type != Some(FieldType::Short) || entry.count != 1 {
        return None;
    }
    ResolutionUnit::from_code(entry.value_u16(stream.byte_order()))
}
