use std::fmt::Display;

use statekeep_stream::{Deserializer, Serializable, Serializer};

use crate::error::StateError;

/// One of the two controller ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    Left,
    Right,
}

impl Port {
    pub const ALL: [Port; 2] = [Port::Left, Port::Right];
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Left => f.write_str("left"),
            Port::Right => f.write_str("right"),
        }
    }
}

/// An input device plugged into a port. Its [`Serializable`] impl covers
/// one frame's worth of input.
pub trait Controller: Serializable {
    /// Name of the kind of device attached. Movies only play back against
    /// the same pair of names they were recorded with.
    fn name(&self) -> &str;
}

/// The console's front-panel switches. Serialized once per movie frame.
pub trait Switches: Serializable {}

/// The emulated machine. Its [`Serializable`] impl covers the entire
/// internal state (memory, processor, peripherals).
pub trait Machine: Serializable {
    /// Fingerprint of the loaded program. Files carrying a different tag are rejected.
    fn identity(&self) -> &str;
    /// Human-readable program name, used to name savestate files.
    fn display_name(&self) -> &str;

    fn controller(&self, port: Port) -> &dyn Controller;
    fn controller_mut(&mut self, port: Port) -> &mut dyn Controller;

    fn switches(&self) -> &dyn Switches;
    fn switches_mut(&mut self) -> &mut dyn Switches;
}

/// Copy of a machine's state, taken before a load so a failed load
/// can be undone.
pub(crate) struct Rollback {
    data: Vec<u8>,
}

impl Rollback {
    pub(crate) fn capture<M: Machine + ?Sized>(machine: &M) -> Result<Self, StateError> {
        let mut out = Serializer::in_memory();
        machine
            .save(&mut out)
            .map_err(StateError::MachineStateCorrupt)?;
        Ok(Self {
            data: out.into_bytes().unwrap_or_default(),
        })
    }

    pub(crate) fn restore<M: Machine + ?Sized>(self, machine: &mut M) {
        let mut input = Deserializer::from_bytes(self.data);
        if let Err(err) = machine.load(&mut input) {
            log::error!("failed to restore machine state after a bad load: {}", err);
        }
    }
}

/// Loads the machine from `input`, leaving it as it was if anything goes wrong.
/// On success the rollback copy is handed back so later checks can still undo the load.
pub(crate) fn load_machine<M: Machine + ?Sized>(
    machine: &mut M,
    input: &mut Deserializer,
) -> Result<Rollback, StateError> {
    let rollback = Rollback::capture(machine)?;
    match machine.load(input) {
        Ok(()) => Ok(rollback),
        Err(err) => {
            rollback.restore(machine);
            Err(StateError::MachineStateCorrupt(err))
        }
    }
}
