//! Random-access I/O over TIFF byte streams.

mod stream;

pub use stream::EndianStream;
