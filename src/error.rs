use thiserror::Error;

/// Errors that can occur when reading or restructuring a TIFF file
#[derive(Debug, Error)]
pub enum TiffError {
    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// First four bytes are neither `MM\0*` nor `II*\0`
    #[error("Not a valid TIFF image: initial TIFF signature is missing (found {0:02X?})")]
    InvalidSignature([u8; 4]),

    /// File carries a BigTIFF signature (64-bit offsets)
    #[error("BigTIFF files are not supported")]
    BigTiffUnsupported,

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// A read ran past the end of the stream
    #[error("Unexpected end of file: needed {len} bytes at offset {offset}")]
    UnexpectedEof { offset: u64, len: usize },

    /// IFD offset points outside the file
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// IFD entry count claims more entries than the file holds
    #[error("IFD at offset {start} extends past end of file ({end} > {size})")]
    IfdOutOfBounds { start: u64, end: u64, size: u64 },

    /// IFD chain points back to a directory already visited
    #[error("IFD chain loops back to offset {0}")]
    IfdCycle(u64),

    /// Target directory does not exist in the chain
    #[error("IFD index {0} not found")]
    IfdNotFound(usize),

    /// Unknown field type in IFD entry
    #[error("Unknown field type {field_type} in tag {tag}")]
    UnknownFieldType { tag: u16, field_type: u16 },

    /// Offset no longer fits the field it is stored in
    #[error("Offset overflow: {offset} does not fit in {width} bytes")]
    OffsetOverflow { offset: u64, width: usize },

    /// Position lies before the TIFF header and has no stored form
    #[error("Position {position} precedes the TIFF header at {base}")]
    PositionBeforeBase { position: u64, base: u64 },

    /// Entry count no longer fits the 2-byte count field
    #[error("Too many entries in IFD {index}: {count}")]
    TooManyEntries { index: usize, count: usize },
}

/// Errors in user-supplied resolution values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Decimal value too large to be represented by any fraction
    #[error("Density {value} exceeds the maximum possible value {max}")]
    DensityTooLarge { value: f64, max: u64 },

    /// Value is neither a positive decimal nor `numerator/denominator`
    #[error("Invalid density '{0}': expected a positive number or 'numerator/denominator'")]
    InvalidDensity(String),

    /// Fraction component is zero or does not fit in 32 bits
    #[error("Fraction component {0} out of range: must be between 1 and 4294967295")]
    ComponentOutOfRange(u64),

    /// Unit string not recognized
    #[error("Invalid unit '{0}': expected inches, centimeters or none")]
    UnrecognizedUnit(String),
}

/// Errors returned by the resolution patch operations
#[derive(Debug, Error)]
pub enum PatchError {
    /// Malformed or unsupported TIFF structure
    #[error(transparent)]
    Tiff(#[from] TiffError),

    /// Invalid resolution or unit input
    #[error(transparent)]
    Input(#[from] InputError),

    /// I/O error while staging or persisting the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
