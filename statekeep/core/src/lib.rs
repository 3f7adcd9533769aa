//! Savestate slots and input movie recording for a frame-driven emulator.
//!
//! The [`StateManager`] owns the current slot pointer and the movie mode. It
//! never holds on to the emulated machine; every operation borrows it through
//! the [`Machine`] trait instead.

pub mod error;
pub mod machine;
pub mod manager;
pub mod message;
pub mod settings;
pub mod slot;
pub mod snapshot;
pub mod vcr;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{SettingsError, StateError};
pub use machine::{Controller, Machine, Port, Switches};
pub use manager::{FrameOutcome, ModeKind, StateManager, Toggle};
pub use message::MessageHandler;
pub use settings::Settings;
pub use slot::Slot;

pub use statekeep_stream as stream;
