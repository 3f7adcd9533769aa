use std::{
    fs::File,
    io::{BufRead, BufReader, Cursor, Read},
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use crate::{error::StreamError, MAX_FIELD_LEN};

/// Sequential reader for typed fields written by a [`Serializer`][crate::Serializer].
#[derive(Debug)]
pub struct Deserializer {
    source: Source,
}

#[derive(Debug)]
enum Source {
    File {
        reader: BufReader<File>,
        path: PathBuf,
    },
    Memory(Cursor<Vec<u8>>),
}

impl Deserializer {
    /// Opens the file at `path` for reading.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StreamError> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| StreamError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            source: Source::File {
                reader: BufReader::new(file),
                path,
            },
        })
    }

    /// Reads from an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            source: Source::Memory(Cursor::new(data)),
        }
    }

    /// Path of the file being read, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File { path, .. } => Some(path),
            Source::Memory(_) => None,
        }
    }

    /// Returns true if no bytes are left in the stream.
    pub fn at_end(&mut self) -> Result<bool, StreamError> {
        Ok(self.reader().fill_buf()?.is_empty())
    }

    fn reader(&mut self) -> &mut dyn BufRead {
        match &mut self.source {
            Source::File { reader, .. } => reader,
            Source::Memory(cursor) => cursor,
        }
    }

    fn get_raw<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let mut buffer = [0u8; N];
        self.reader().read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn get_len(&mut self) -> Result<usize, StreamError> {
        let len = usize::try_from(self.get_u32()?).unwrap_or(usize::MAX);
        if len > MAX_FIELD_LEN {
            return Err(StreamError::FieldTooLong { len });
        }
        Ok(len)
    }

    pub fn get_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.get_raw::<1>()?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, StreamError> {
        Ok(u16::from_le_bytes(self.get_raw()?))
    }

    pub fn get_u32(&mut self) -> Result<u32, StreamError> {
        Ok(u32::from_le_bytes(self.get_raw()?))
    }

    pub fn get_u64(&mut self) -> Result<u64, StreamError> {
        Ok(u64::from_le_bytes(self.get_raw()?))
    }

    pub fn get_i32(&mut self) -> Result<i32, StreamError> {
        Ok(i32::from_le_bytes(self.get_raw()?))
    }

    pub fn get_bool(&mut self) -> Result<bool, StreamError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StreamError::InvalidBool(other)),
        }
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn get_string(&mut self) -> Result<String, StreamError> {
        let data = self.get_bytes()?;
        String::from_utf8(data).map_err(|err| StreamError::Utf8(err.utf8_error()))
    }

    /// Reads a length-prefixed byte blob.
    pub fn get_bytes(&mut self) -> Result<Vec<u8>, StreamError> {
        let len = self.get_len()?;
        let mut data = Vec::with_capacity(len);
        self.reader().take(len as u64).read_to_end(&mut data)?;
        if data.len() < len {
            return Err(StreamError::UnexpectedEof);
        }
        Ok(data)
    }

    /// Reads a byte blob and decodes it with bincode.
    pub fn get_value<T: DeserializeOwned>(&mut self) -> Result<T, StreamError> {
        let data = self.get_bytes()?;
        Ok(bincode::deserialize(&data)?)
    }
}
