use std::{io, path::PathBuf};

use statekeep_stream::StreamError;
use thiserror::Error;

use crate::machine::Port;

/// Error that may occur during a savestate or movie operation.
///
/// None of these are fatal. The [`StateManager`][crate::StateManager] reports
/// them to the caller and through its message handler, then carries on with
/// movie mode switched off.
#[derive(Debug, Error)]
pub enum StateError {
    /// The slot or movie file could not be opened.
    #[error("could not open {}: {source}", .path.display())]
    StreamOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file was made with a different program.
    #[error("file belongs to {found:?}, loaded program is {expected:?}")]
    IdentityMismatch { expected: String, found: String },
    /// The movie was recorded with different controllers attached.
    #[error("{port} controller is {expected:?}, movie was recorded with {found:?}")]
    ControllerMismatch {
        port: Port,
        expected: String,
        found: String,
    },
    /// The machine rejected the saved state.
    #[error("machine state is corrupt: {0}")]
    MachineStateCorrupt(#[source] StreamError),
    /// Reading or writing the stream failed.
    #[error("stream error: {0}")]
    Stream(#[source] StreamError),
}

impl From<StreamError> for StateError {
    fn from(value: StreamError) -> Self {
        match value {
            StreamError::Open { path, source } => Self::StreamOpenFailed { path, source },
            other => Self::Stream(other),
        }
    }
}

/// Error that may occur while loading or storing [`Settings`][crate::Settings].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[source] io::Error),
    #[error("settings file is malformed: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("settings could not be encoded: {0}")]
    Encode(#[source] toml::ser::Error),
}

impl From<io::Error> for SettingsError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
impl From<toml::de::Error> for SettingsError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}
impl From<toml::ser::Error> for SettingsError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Encode(value)
    }
}
