use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::TiffError;
use crate::format::tiff::ByteOrder;

/// Random-access view of a TIFF byte stream.
///
/// Every read and write takes an absolute position and seeks before touching
/// the stream, so no cursor state carries over between operations. Stored
/// TIFF offsets are relative to `base` (non-zero when the TIFF is embedded in
/// a container); use [`resolve`](Self::resolve) and
/// [`relative`](Self::relative) to convert between the two.
#[derive(Debug)]
pub struct EndianStream<S> {
    inner: S,
    byte_order: ByteOrder,
    base: u64,
}

impl<S> EndianStream<S> {
    /// Wrap a stream whose byte order is already known.
    pub fn new(inner: S, byte_order: ByteOrder, base: u64) -> Self {
        Self {
            inner,
            byte_order,
            base,
        }
    }

    /// Byte order used for every multi-byte value.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Absolute position of the TIFF header.
    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Convert a stored offset into an absolute stream position.
    #[inline]
    pub fn resolve(&self, stored: u32) -> u64 {
        self.base + u64::from(stored)
    }

    /// Convert an absolute stream position into a storable 32-bit offset.
    pub fn relative(&self, position: u64) -> Result<u32, TiffError> {
        let offset = position
            .checked_sub(self.base)
            .ok_or(TiffError::PositionBeforeBase {
                position,
                base: self.base,
            })?;
        u32::try_from(offset).map_err(|_| TiffError::OffsetOverflow { offset, width: 4 })
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Seek> EndianStream<S> {
    /// Total length of the stream in bytes.
    pub fn len(&mut self) -> Result<u64, TiffError> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }
}

impl<S: Read + Seek> EndianStream<S> {
    /// Fill `buf` with the bytes at `position`.
    pub fn read_bytes_at(&mut self, position: u64, buf: &mut [u8]) -> Result<(), TiffError> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => TiffError::UnexpectedEof {
                offset: position,
                len: buf.len(),
            },
            _ => TiffError::Io(e),
        })
    }

    pub fn read_u16_at(&mut self, position: u64) -> Result<u16, TiffError> {
        let mut buf = [0u8; 2];
        self.read_bytes_at(position, &mut buf)?;
        Ok(self.byte_order.read_u16(&buf))
    }

    pub fn read_u32_at(&mut self, position: u64) -> Result<u32, TiffError> {
        let mut buf = [0u8; 4];
        self.read_bytes_at(position, &mut buf)?;
        Ok(self.byte_order.read_u32(&buf))
    }

    /// Read everything from `position` to the end of the stream.
    pub fn read_to_end_from(&mut self, position: u64) -> Result<Vec<u8>, TiffError> {
        self.inner.seek(SeekFrom::Start(position))?;
        let mut remainder = Vec::new();
        self.inner.read_to_end(&mut remainder)?;
        Ok(remainder)
    }
}

impl<S: Write + Seek> EndianStream<S> {
    pub fn write_bytes_at(&mut self, position: u64, bytes: &[u8]) -> Result<(), TiffError> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_u16_at(&mut self, position: u64, value: u16) -> Result<(), TiffError> {
        let bytes = self.byte_order.u16_bytes(value);
        self.write_bytes_at(position, &bytes)
    }

    pub fn write_u32_at(&mut self, position: u64, value: u32) -> Result<(), TiffError> {
        let bytes = self.byte_order.u32_bytes(value);
        self.write_bytes_at(position, &bytes)
    }

    pub fn flush(&mut self) -> Result<(), TiffError> {
        self.inner.flush()?;
        Ok(())
    }
}
