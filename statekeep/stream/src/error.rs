use std::{io, path::PathBuf, str::Utf8Error};

use thiserror::Error;

/// Error that may occur while reading or writing a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The backing file could not be opened or created.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An error occurred on the underlying file.
    #[error("I/O error on stream: {0}")]
    Io(#[source] io::Error),
    /// The stream ended in the middle of a field.
    #[error("stream ended unexpectedly")]
    UnexpectedEof,
    /// A string field did not contain valid UTF-8.
    #[error("string field is not valid UTF-8: {0}")]
    Utf8(#[source] Utf8Error),
    /// A boolean field held something other than 0 or 1.
    #[error("invalid boolean byte 0x{0:02X}")]
    InvalidBool(u8),
    /// A length prefix exceeded [`MAX_FIELD_LEN`][crate::MAX_FIELD_LEN].
    #[error("field of {len} bytes is too long")]
    FieldTooLong { len: usize },
    /// A structured value failed to encode or decode.
    #[error("value codec error: {0}")]
    Codec(#[source] bincode::Error),
}

impl From<io::Error> for StreamError {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::UnexpectedEof => Self::UnexpectedEof,
            _ => Self::Io(value),
        }
    }
}
impl From<Utf8Error> for StreamError {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8(value)
    }
}
impl From<bincode::Error> for StreamError {
    fn from(value: bincode::Error) -> Self {
        Self::Codec(value)
    }
}
