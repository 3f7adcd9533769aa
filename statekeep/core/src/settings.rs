use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::SettingsError, slot::Slot};

/// Configuration for the [`StateManager`][crate::StateManager].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding savestate slot files.
    pub state_dir: PathBuf,
    /// Path of the input movie used for recording and playback.
    pub movie_file: PathBuf,
    /// Move to the next slot after every successful save.
    pub auto_slot: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let state_dir = dirs::data_dir()
            .map(|dir| dir.join("statekeep").join("state"))
            .unwrap_or_else(|| PathBuf::from("state"));

        Self {
            state_dir,
            movie_file: PathBuf::from("test.inp"),
            auto_slot: false,
        }
    }
}

impl Settings {
    /// Reads settings from a TOML file. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("{} not found, using default settings", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(toml::from_str(&text)?)
    }

    /// Writes settings to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Path of the savestate file for `slot` of the program named `name`.
    pub fn state_path(&self, name: &str, slot: Slot) -> PathBuf {
        self.state_dir.join(format!("{}.st{}", name, slot))
    }
}
