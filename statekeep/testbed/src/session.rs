use statekeep_core::{FrameOutcome, Settings, StateError, StateManager, Toggle};
use thiserror::Error;

use crate::console::{DemoConsole, JoystickInput, PanelSwitches};

const DEMO_MD5: &str = "6e2a0a8b1a6b2e7ac4d0a5c5a2c4e8f1";
const DEMO_NAME: &str = "Statekeep Demo";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    State(#[from] StateError),
    #[error("movie did not start")]
    MovieNotStarted,
    #[error("{what} diverged: expected {expected:016x}, got {actual:016x}")]
    Desync {
        what: &'static str,
        expected: u64,
        actual: u64,
    },
    #[error("playback ran {played} frames, movie has {recorded}")]
    FrameCount { played: u64, recorded: u64 },
}

/// Summary of a scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub frames: u64,
    pub checksum: u64,
}

/// Deterministic input pattern for frame `n`.
fn scripted_inputs(n: u64) -> (JoystickInput, JoystickInput, PanelSwitches) {
    let left = JoystickInput {
        up: n % 7 < 3,
        down: n % 11 == 4,
        left: n % 5 == 0,
        right: n % 5 == 2,
        fire: n % 3 == 1,
    };
    let right = JoystickInput {
        fire: n % 13 < 2,
        ..Default::default()
    };
    let switches = PanelSwitches {
        select: n == 1,
        color: true,
        left_difficulty_a: n >= 60,
        ..Default::default()
    };
    (left, right, switches)
}

fn check(what: &'static str, expected: u64, actual: u64) -> Result<(), SessionError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SessionError::Desync {
            what,
            expected,
            actual,
        })
    }
}

fn started(toggle: Toggle) -> Result<(), SessionError> {
    match toggle {
        Toggle::Started => Ok(()),
        Toggle::Failed(err) => Err(err.into()),
        Toggle::Stopped => Err(SessionError::MovieNotStarted),
    }
}

/// Runs through every state operation against a [`DemoConsole`]:
/// slot save/load, movie recording of `frames` frames, and playback.
pub fn run_session<F: FnMut(&str) + 'static>(
    settings: Settings,
    frames: u64,
    on_message: F,
) -> Result<SessionReport, SessionError> {
    let mut console = DemoConsole::new(DEMO_MD5, DEMO_NAME);
    let mut manager = StateManager::new(settings);
    manager.set_message_handler(on_message);

    for _ in 0..30 {
        console.run_frame();
    }

    // slot round trip
    let saved = console.checksum();
    let slot = manager.save_state(&console, None)?;
    for n in 0..30 {
        let (left, right, switches) = scripted_inputs(n);
        console.joysticks[0].input = left;
        console.joysticks[1].input = right;
        console.switches = switches;
        console.run_frame();
    }
    manager.load_state(&mut console, Some(slot))?;
    check("slot state", saved, console.checksum())?;
    manager.change_state();

    // record
    let start = console.checksum();
    started(manager.toggle_record_mode(&console))?;
    for n in 0..frames {
        let (left, right, switches) = scripted_inputs(n);
        console.joysticks[0].input = left;
        console.joysticks[1].input = right;
        console.switches = switches;

        if let FrameOutcome::Failed(err) = manager.update(&mut console) {
            return Err(err.into());
        }
        console.run_frame();
    }
    let recorded = console.checksum();
    let _ = manager.toggle_record_mode(&console);

    // wipe the inputs, then play back from the movie's start
    console.joysticks = Default::default();
    console.switches = PanelSwitches::default();
    started(manager.toggle_rewind_mode(&mut console))?;
    check("movie start state", start, console.checksum())?;

    loop {
        match manager.update(&mut console) {
            FrameOutcome::Played => console.run_frame(),
            FrameOutcome::PlaybackFinished => break,
            FrameOutcome::Failed(err) => return Err(err.into()),
            FrameOutcome::Idle | FrameOutcome::Recorded => break,
        }
    }
    if manager.frame_count() != frames {
        return Err(SessionError::FrameCount {
            played: manager.frame_count(),
            recorded: frames,
        });
    }
    check("played back state", recorded, console.checksum())?;

    manager.reset();
    Ok(SessionReport {
        frames,
        checksum: recorded,
    })
}
