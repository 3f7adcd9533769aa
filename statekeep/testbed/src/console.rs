use std::io;

use serde::{Deserialize, Serialize};
use statekeep_core::{Controller, Machine, Port, Switches};
use statekeep_stream::{Deserializer, Serializable, Serializer, StreamError};

const RAM_SIZE: usize = 128;

/// Joystick directions and fire button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoystickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

impl JoystickInput {
    fn bits(self) -> u8 {
        (self.up as u8)
            | (self.down as u8) << 1
            | (self.left as u8) << 2
            | (self.right as u8) << 3
            | (self.fire as u8) << 4
    }
}

#[derive(Debug, Clone, Default)]
pub struct Joystick {
    pub input: JoystickInput,
}

impl Serializable for Joystick {
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError> {
        let JoystickInput {
            up,
            down,
            left,
            right,
            fire,
        } = self.input;
        for pressed in [up, down, left, right, fire] {
            out.put_bool(pressed)?;
        }
        Ok(())
    }

    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError> {
        self.input = JoystickInput {
            up: input.get_bool()?,
            down: input.get_bool()?,
            left: input.get_bool()?,
            right: input.get_bool()?,
            fire: input.get_bool()?,
        };
        Ok(())
    }
}

impl Controller for Joystick {
    fn name(&self) -> &str {
        "Joystick"
    }
}

/// Front-panel switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelSwitches {
    pub select: bool,
    pub reset: bool,
    pub color: bool,
    pub left_difficulty_a: bool,
    pub right_difficulty_a: bool,
}

impl PanelSwitches {
    fn bits(self) -> u8 {
        (self.select as u8)
            | (self.reset as u8) << 1
            | (self.color as u8) << 3
            | (self.left_difficulty_a as u8) << 6
            | (self.right_difficulty_a as u8) << 7
    }

    fn from_bits(bits: u8) -> Self {
        Self {
            select: bits & 1 != 0,
            reset: bits & (1 << 1) != 0,
            color: bits & (1 << 3) != 0,
            left_difficulty_a: bits & (1 << 6) != 0,
            right_difficulty_a: bits & (1 << 7) != 0,
        }
    }
}

impl Serializable for PanelSwitches {
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError> {
        out.put_u8(self.bits())
    }

    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError> {
        *self = Self::from_bits(input.get_u8()?);
        Ok(())
    }
}

impl Switches for PanelSwitches {}

/// Everything that goes into a savestate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreState {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub cycles: u64,
    pub ram: Vec<u8>,
}

/// A toy console. Each frame it mixes the current inputs into its RAM, so any
/// divergence in inputs shows up in [`DemoConsole::checksum`].
#[derive(Debug, Clone)]
pub struct DemoConsole {
    md5: String,
    name: String,
    pub core: CoreState,
    pub joysticks: [Joystick; 2],
    pub switches: PanelSwitches,
}

impl DemoConsole {
    pub fn new(md5: &str, name: &str) -> Self {
        Self {
            md5: md5.to_owned(),
            name: name.to_owned(),
            core: CoreState {
                pc: 0xF000,
                a: 0,
                x: 0,
                y: 0,
                cycles: 0,
                ram: vec![0; RAM_SIZE],
            },
            joysticks: Default::default(),
            switches: PanelSwitches::default(),
        }
    }

    /// Runs one frame's worth of fake CPU work.
    pub fn run_frame(&mut self) {
        let core = &mut self.core;
        let left = self.joysticks[0].input.bits();
        let right = self.joysticks[1].input.bits();
        let switches = self.switches.bits();

        core.a = core.a.wrapping_mul(31).wrapping_add(left);
        core.x = core.x.rotate_left(3) ^ right;
        core.y = core.y.wrapping_add(switches);
        core.pc = core.pc.wrapping_add(u16::from(core.a) | 1);

        if let Some(index) = usize::from(core.pc).checked_rem(core.ram.len()) {
            core.ram[index] ^= core.a ^ core.x ^ core.y;
        }
        core.cycles += 19_912;
    }

    /// FNV-1a over the machine state.
    pub fn checksum(&self) -> u64 {
        let core = &self.core;
        let mut bytes = Vec::with_capacity(13 + core.ram.len());
        bytes.extend_from_slice(&core.pc.to_le_bytes());
        bytes.extend_from_slice(&[core.a, core.x, core.y]);
        bytes.extend_from_slice(&core.cycles.to_le_bytes());
        bytes.extend_from_slice(&core.ram);

        bytes.iter().fold(0xcbf29ce484222325u64, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(0x100000001b3)
        })
    }
}

impl Serializable for DemoConsole {
    fn save(&self, out: &mut Serializer) -> Result<(), StreamError> {
        out.put_value(&self.core)
    }

    fn load(&mut self, input: &mut Deserializer) -> Result<(), StreamError> {
        let core: CoreState = input.get_value()?;
        if core.ram.is_empty() {
            return Err(StreamError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "state has no RAM",
            )));
        }
        self.core = core;
        Ok(())
    }
}

impl Machine for DemoConsole {
    fn identity(&self) -> &str {
        &self.md5
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn controller(&self, port: Port) -> &dyn Controller {
        match port {
            Port::Left => &self.joysticks[0],
            Port::Right => &self.joysticks[1],
        }
    }

    fn controller_mut(&mut self, port: Port) -> &mut dyn Controller {
        match port {
            Port::Left => &mut self.joysticks[0],
            Port::Right => &mut self.joysticks[1],
        }
    }

    fn switches(&self) -> &dyn Switches {
        &self.switches
    }

    fn switches_mut(&mut self) -> &mut dyn Switches {
        &mut self.switches
    }
}
