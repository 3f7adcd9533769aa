use std::fmt::Display;

use thiserror::Error;

/// Index of a savestate slot, always in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Slot(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("slot value must be between 0-9 (got {0})")]
pub struct InvalidSlot(pub u8);

impl Slot {
    /// Number of available slots.
    pub const COUNT: u8 = 10;

    pub const fn new(value: u8) -> Option<Self> {
        if value < Self::COUNT {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The slot after this one, wrapping from 9 to 0.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % Self::COUNT)
    }
}

impl TryFrom<u8> for Slot {
    type Error = InvalidSlot;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidSlot(value))
    }
}

impl From<Slot> for u8 {
    fn from(value: Slot) -> Self {
        value.0
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
