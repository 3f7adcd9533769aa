//! In-memory machine used by the unit tests.

use std::io;

use statekeep_stream::{Deserializer, Serializable, Serializer, StreamError};

use crate::machine::{Controller, Machine, Port, Switches};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeController {
    pub name: String,
    pub value: u32,
}

impl Serializable for FakeController {
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError> {
        out.put_u32(self.value)
    }

    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError> {
        self.value = input.get_u32()?;
        Ok(())
    }
}

impl Controller for FakeController {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FakeSwitches {
    pub bits: u8,
}

impl Serializable for FakeSwitches {
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError> {
        out.put_u8(self.bits)
    }

    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError> {
        self.bits = input.get_u8()?;
        Ok(())
    }
}

impl Switches for FakeSwitches {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMachine {
    pub identity: String,
    pub name: String,
    pub cycles: u64,
    pub ram: Vec<u8>,
    pub controllers: [FakeController; 2],
    pub switches: FakeSwitches,
    /// Makes [`Serializable::save`] fail after writing part of the state.
    pub fail_save: bool,
}

impl FakeMachine {
    pub fn new(identity: &str, name: &str) -> Self {
        let joystick = FakeController {
            name: "Joystick".to_owned(),
            value: 0,
        };
        Self {
            identity: identity.to_owned(),
            name: name.to_owned(),
            cycles: 0,
            ram: vec![0; 128],
            controllers: [joystick.clone(), joystick],
            switches: FakeSwitches::default(),
            fail_save: false,
        }
    }

    pub fn controller_by_port(&mut self, port: Port) -> &mut FakeController {
        match port {
            Port::Left => &mut self.controllers[0],
            Port::Right => &mut self.controllers[1],
        }
    }
}

impl Serializable for FakeMachine {
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError> {
        out.put_u64(self.cycles)?;
        if self.fail_save {
            return Err(StreamError::Io(io::Error::other("simulated save failure")));
        }
        out.put_bytes(&self.ram)
    }

    // fields are assigned as they are read, so a short stream leaves a half-loaded machine
    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError> {
        self.cycles = input.get_u64()?;
        self.ram = input.get_bytes()?;
        Ok(())
    }
}

impl Machine for FakeMachine {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn controller(&self, port: Port) -> &dyn Controller {
        match port {
            Port::Left => &self.controllers[0],
            Port::Right => &self.controllers[1],
        }
    }

    fn controller_mut(&mut self, port: Port) -> &mut dyn Controller {
        self.controller_by_port(port)
    }

    fn switches(&self) -> &dyn Switches {
        &self.switches
    }

    fn switches_mut(&mut self) -> &mut dyn Switches {
        &mut self.switches
    }
}
