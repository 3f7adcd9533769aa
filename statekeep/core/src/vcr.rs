//! Input movie streams.
//!
//! A movie file is laid out as:
//! 1. the program's identity tag (string)
//! 2. the machine's full state
//! 3. the left and right controller names (strings)
//! 4. one record per frame: left controller, right controller, switches
//!
//! Frame records have no length or index, so they can only be read back
//! in the order they were written.

use std::{fs, path::Path};

use statekeep_stream::{Deserializer, Serializable, Serializer, StreamError};

use crate::{
    error::StateError,
    machine::{load_machine, Machine, Port},
};

/// Open movie being recorded.
#[derive(Debug)]
pub struct MovieWriter {
    out: Serializer,
}

/// Open movie being played back.
#[derive(Debug)]
pub struct MovieReader {
    input: Deserializer,
}

impl MovieWriter {
    /// Creates the movie file and writes its header from the machine's current state.
    /// If the header can't be written, the file is removed again.
    pub fn create<M: Machine + ?Sized>(path: &Path, machine: &M) -> Result<Self, StateError> {
        let mut out = Serializer::create(path)?;

        if let Err(err) = write_header(&mut out, machine) {
            drop(out);
            if let Err(rm_err) = fs::remove_file(path) {
                log::warn!("could not remove {}: {}", path.display(), rm_err);
            }
            return Err(err);
        }

        Ok(Self { out })
    }

    /// Appends the current inputs of both controllers and the switches.
    pub fn record_frame<M: Machine + ?Sized>(&mut self, machine: &M) -> Result<(), StateError> {
        save_inputs(&mut self.out, machine)?;
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn finish(self) -> Result<(), StateError> {
        Ok(self.out.finish()?)
    }
}

fn write_header<M: Machine + ?Sized>(out: &mut Serializer, machine: &M) -> Result<(), StateError> {
    out.put_string(machine.identity())?;
    machine.save(out)?;
    // Controllers with extra state would make frame records unreadable
    // with a different device attached.
    for port in Port::ALL {
        out.put_string(machine.controller(port).name())?;
    }
    Ok(())
}

impl MovieReader {
    /// Opens a movie, checks it against the loaded program and controllers,
    /// and loads its starting state into the machine.
    ///
    /// On error the machine keeps the state it had before the call.
    pub fn open<M: Machine + ?Sized>(path: &Path, machine: &mut M) -> Result<Self, StateError> {
        let mut input = Deserializer::open(path)?;

        let found = input.get_string()?;
        if found != machine.identity() {
            return Err(StateError::IdentityMismatch {
                expected: machine.identity().to_owned(),
                found,
            });
        }

        let rollback = load_machine(machine, &mut input)?;

        if let Err(err) = check_controllers(&mut input, machine) {
            rollback.restore(machine);
            return Err(err);
        }

        Ok(Self { input })
    }

    /// Applies the next frame of inputs to the machine.
    /// Returns `false` without touching the machine once the movie has no frames left.
    ///
    /// A frame that can't be read in full is not applied at all: the
    /// controllers and switches keep the inputs they had before the call.
    pub fn play_frame<M: Machine + ?Sized>(&mut self, machine: &mut M) -> Result<bool, StateError> {
        if self.input.at_end()? {
            return Ok(false);
        }

        let mut previous = Serializer::in_memory();
        save_inputs(&mut previous, machine)?;

        if let Err(err) = load_inputs(&mut self.input, machine) {
            let previous = previous.into_bytes().unwrap_or_default();
            if let Err(restore_err) = load_inputs(&mut Deserializer::from_bytes(previous), machine) {
                log::error!("failed to restore inputs after a bad frame: {}", restore_err);
            }
            return Err(err.into());
        }
        Ok(true)
    }
}

fn save_inputs<M: Machine + ?Sized>(out: &mut Serializer, machine: &M) -> Result<(), StreamError> {
    for port in Port::ALL {
        machine.controller(port).save(out)?;
    }
    machine.switches().save(out)
}

fn load_inputs<M: Machine + ?Sized>(
    input: &mut Deserializer,
    machine: &mut M,
) -> Result<(), StreamError> {
    for port in Port::ALL {
        machine.controller_mut(port).load(input)?;
    }
    machine.switches_mut().load(input)
}

fn check_controllers<M: Machine + ?Sized>(
    input: &mut Deserializer,
    machine: &M,
) -> Result<(), StateError> {
    let names = [input.get_string()?, input.get_string()?];
    for (port, found) in Port::ALL.into_iter().zip(names) {
        let expected = machine.controller(port).name();
        if found != expected {
            return Err(StateError::ControllerMismatch {
                port,
                expected: expected.to_owned(),
                found,
            });
        }
    }
    Ok(())
}
