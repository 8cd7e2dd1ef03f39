//! error kinds reported by every volume operation
use thiserror::Error;

/// The error type of this filesystem.
///
/// A short write is *not* an error: [ChainFs::write](crate::ChainFs::write)
/// reports it through its returned length.
#[derive(Error, Debug)]
pub enum FsError {
    /// descriptor out of range or not open, or a file whose chain is broken
    #[error("invalid file handle")]
    InvalidHandle,

    #[error("file not found: {name}")]
    NotFound { name: String },

    #[error("file already exists: {name}")]
    AlreadyExists { name: String },

    #[error("file name is {len} bytes long, the limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("no free directory entry left")]
    NamespaceFull,

    #[error("no free file descriptor left")]
    DescriptorTableFull,

    #[error("no free data block left")]
    OutOfSpace,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported filesystem version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("file {name} is still open by {open_count} descriptor(s)")]
    BusyOnDelete { name: String, open_count: u32 },

    #[error("device error: {0}")]
    DeviceError(#[from] std::io::Error),

    /// metadata failed to decode, failed its digest or has a foreign geometry
    #[error("metadata corrupted: {0}")]
    Corrupted(String),

    #[error("no volume is mounted")]
    NotMounted,

    #[error("volume {0} is already mounted")]
    AlreadyMounted(String),
}

impl From<bincode::error::EncodeError> for FsError {
    fn from(e: bincode::error::EncodeError) -> Self {
        FsError::Corrupted(format!("encode failed: {e}"))
    }
}

impl From<bincode::error::DecodeError> for FsError {
    fn from(e: bincode::error::DecodeError) -> Self {
        FsError::Corrupted(format!("decode failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
