use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use serde::Serialize;

use crate::{error::StreamError, MAX_FIELD_LEN};

/// Sequential writer for typed fields.
#[derive(Debug)]
pub struct Serializer {
    sink: Sink,
}

#[derive(Debug)]
enum Sink {
    File(BufWriter<File>),
    Atomic {
        writer: BufWriter<File>,
        temp: TempFile,
    },
    Memory(Vec<u8>),
}

/// A file written under a temporary name and moved into place on commit.
/// Dropping it uncommitted removes the temporary file.
#[derive(Debug)]
struct TempFile {
    tmp_path: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl TempFile {
    fn create(path: PathBuf) -> Result<(BufWriter<File>, Self), StreamError> {
        let mut tmp_name = path.file_name().unwrap_or_default().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let file = File::create(&tmp_path).map_err(|source| StreamError::Open {
            path: tmp_path.clone(),
            source,
        })?;

        let temp = Self {
            tmp_path,
            path,
            committed: false,
        };
        Ok((BufWriter::new(file), temp))
    }

    fn commit(mut self, mut writer: BufWriter<File>) -> Result<(), StreamError> {
        writer.flush()?;
        writer.get_ref().sync_all()?;
        // the file has to be closed before it can be renamed on Windows
        drop(writer);

        fs::rename(&self.tmp_path, &self.path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = fs::remove_file(&self.tmp_path) {
                log::warn!("could not remove {}: {}", self.tmp_path.display(), err);
            }
        }
    }
}

impl Serializer {
    /// Creates (or truncates) the file at `path` and writes straight into it.
    /// Whatever has been written when the serializer is dropped stays on disk.
    pub fn create<P: Into<PathBuf>>(path: P) -> Result<Self, StreamError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| StreamError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            sink: Sink::File(BufWriter::new(file)),
        })
    }

    /// Writes into a temporary file next to `path`. The file only replaces
    /// `path` once [`Serializer::finish`] succeeds.
    pub fn create_atomic<P: Into<PathBuf>>(path: P) -> Result<Self, StreamError> {
        let (writer, temp) = TempFile::create(path.into())?;
        Ok(Self {
            sink: Sink::Atomic { writer, temp },
        })
    }

    /// Buffers everything in memory. Use [`Serializer::into_bytes`] to get the data.
    pub fn in_memory() -> Self {
        Self {
            sink: Sink::Memory(Vec::new()),
        }
    }

    /// Flushes all buffered data. Atomic serializers are moved into place.
    pub fn finish(self) -> Result<(), StreamError> {
        match self.sink {
            Sink::File(mut writer) => writer.flush()?,
            Sink::Atomic { writer, temp } => temp.commit(writer)?,
            Sink::Memory(_) => (),
        }
        Ok(())
    }

    /// Returns the buffered bytes of an in-memory serializer, or `None` if
    /// the serializer writes to a file.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self.sink {
            Sink::Memory(data) => Some(data),
            Sink::File(_) | Sink::Atomic { .. } => None,
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match &mut self.sink {
            Sink::File(writer) | Sink::Atomic { writer, .. } => writer,
            Sink::Memory(data) => data,
        }
    }

    fn put_raw(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.writer().write_all(data)?;
        Ok(())
    }

    fn put_len(&mut self, len: usize) -> Result<(), StreamError> {
        if len > MAX_FIELD_LEN {
            return Err(StreamError::FieldTooLong { len });
        }
        // MAX_FIELD_LEN fits in a u32
        self.put_u32(len as u32)
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), StreamError> {
        self.put_raw(&[value])
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), StreamError> {
        self.put_raw(&value.to_le_bytes())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), StreamError> {
        self.put_raw(&value.to_le_bytes())
    }

    pub fn put_u64(&mut self, value: u64) -> Result<(), StreamError> {
        self.put_raw(&value.to_le_bytes())
    }

    pub fn put_i32(&mut self, value: i32) -> Result<(), StreamError> {
        self.put_raw(&value.to_le_bytes())
    }

    pub fn put_bool(&mut self, value: bool) -> Result<(), StreamError> {
        self.put_u8(value as u8)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn put_string(&mut self, value: &str) -> Result<(), StreamError> {
        self.put_bytes(value.as_bytes())
    }

    /// Writes a length-prefixed byte blob.
    pub fn put_bytes(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.put_len(data.len())?;
        self.put_raw(data)
    }

    /// Encodes `value` with bincode and writes it as a byte blob.
    pub fn put_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), StreamError> {
        let data = bincode::serialize(value)?;
        self.put_bytes(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut out = Serializer::in_memory();
        out.put_u16(0x0102).unwrap();
        out.put_u32(0x03040506).unwrap();
        out.put_bool(true).unwrap();
        out.put_string("ab").unwrap();

        assert_eq!(
            out.into_bytes().unwrap(),
            vec![0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x01, 2, 0, 0, 0, b'a', b'b']
        );
    }

    #[test]
    fn test_file_backed_has_no_bytes() {
        let dir = tempfile::tempdir().unwrap();

        let mut out = Serializer::create(dir.path().join("test.inp")).unwrap();
        out.put_u8(1).unwrap();
        assert_eq!(out.into_bytes(), None);

        let out = Serializer::create_atomic(dir.path().join("game.st0")).unwrap();
        assert_eq!(out.into_bytes(), None);
        assert!(!dir.path().join("game.st0.tmp").exists());
    }

    #[test]
    fn test_atomic_commit_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.st0");

        let mut out = Serializer::create_atomic(&path).unwrap();
        out.put_string("md5").unwrap();
        assert!(!path.exists(), "target written before commit");
        assert!(dir.path().join("game.st0.tmp").exists());

        out.finish().unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("game.st0.tmp").exists());
    }

    #[test]
    fn test_atomic_drop_discards_partial_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.st1");
        fs::write(&path, b"previous").unwrap();

        let mut out = Serializer::create_atomic(&path).unwrap();
        out.put_string("half").unwrap();
        drop(out);

        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert!(!dir.path().join("game.st1.tmp").exists());
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("test.inp");

        match Serializer::create(&path) {
            Err(StreamError::Open { path: err_path, .. }) => assert_eq!(err_path, path),
            other => panic!("expected open error, got {:?}", other),
        }
    }
}
