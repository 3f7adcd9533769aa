use std::mem;

use crate::{
    error::StateError,
    machine::Machine,
    message::{LogMessages, MessageHandler},
    settings::Settings,
    slot::Slot,
    vcr::{MovieReader, MovieWriter},
};

/// Movie mode. The open stream lives inside the active variant, so a stream
/// is open exactly when the mode is not `Off`.
#[derive(Debug)]
enum Mode {
    Off,
    Recording(MovieWriter),
    Playing(MovieReader),
}

/// Stream-less view of the current movie mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Off,
    Recording,
    Playing,
}

/// Result of toggling recording or playback.
#[derive(Debug)]
#[must_use]
pub enum Toggle {
    /// The mode was switched on.
    Started,
    /// The mode was on and has been switched off.
    Stopped,
    /// The mode could not be switched on. Movie mode is now `Off`.
    Failed(StateError),
}

impl Toggle {
    /// True if the requested mode is now active.
    pub fn is_active(&self) -> bool {
        matches!(self, Toggle::Started)
    }
}

/// What [`StateManager::update`] did this frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// No movie is active.
    Idle,
    /// The frame's inputs were appended to the movie.
    Recorded,
    /// The frame's inputs were read from the movie and applied.
    Played,
    /// The movie ran out of frames. Playback has been switched off.
    PlaybackFinished,
    /// The movie stream failed. Movie mode has been switched off.
    Failed(StateError),
}

/// Coordinates savestate slots and input movie recording/playback.
///
/// All calls are expected from the thread driving the emulation. [`StateManager::update`]
/// must be called exactly once per emulated frame.
pub struct StateManager {
    pub(crate) settings: Settings,
    pub(crate) current_slot: Slot,
    mode: Mode,
    frame_count: u64,
    messages: Box<dyn MessageHandler>,
}

impl StateManager {
    /// Creates a state manager that reports messages to the log.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            current_slot: Slot::default(),
            mode: Mode::Off,
            frame_count: 0,
            messages: Box::new(LogMessages),
        }
    }

    /// Sets the handler that receives status messages.
    pub fn set_message_handler<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.messages = Box::new(handler);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_slot(&self) -> Slot {
        self.current_slot
    }

    pub fn mode(&self) -> ModeKind {
        match self.mode {
            Mode::Off => ModeKind::Off,
            Mode::Recording(_) => ModeKind::Recording,
            Mode::Playing(_) => ModeKind::Playing,
        }
    }

    /// True if a movie is being recorded or played back.
    pub fn is_active(&self) -> bool {
        !matches!(self.mode, Mode::Off)
    }

    /// Frames recorded or played since the current (or last) movie started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub(crate) fn show_message(&mut self, message: &str) {
        self.messages.show_message(message);
    }

    /// Starts recording a movie from the machine's current state, or stops
    /// the recording in progress.
    pub fn toggle_record_mode<M: Machine + ?Sized>(&mut self, machine: &M) -> Toggle {
        if let Mode::Recording(_) = self.mode {
            self.close_stream();
            log::info!("movie recording stopped after {} frames", self.frame_count);
            self.show_message("Movie recording stopped");
            return Toggle::Stopped;
        }
        self.close_stream();

        match MovieWriter::create(&self.settings.movie_file, machine) {
            Ok(writer) => {
                self.mode = Mode::Recording(writer);
                self.frame_count = 0;
                log::info!("recording movie to {}", self.settings.movie_file.display());
                self.show_message("Movie recording started");
                Toggle::Started
            }
            Err(err) => {
                log::warn!("could not start movie recording: {}", err);
                self.show_message("Error starting movie recording");
                Toggle::Failed(err)
            }
        }
    }

    /// Starts playing back the movie, or stops the playback in progress.
    /// Starting playback loads the movie's initial state into the machine.
    pub fn toggle_rewind_mode<M: Machine + ?Sized>(&mut self, machine: &mut M) -> Toggle {
        if let Mode::Playing(_) = self.mode {
            self.close_stream();
            log::info!("movie playback stopped after {} frames", self.frame_count);
            self.show_message("Movie playback stopped");
            return Toggle::Stopped;
        }
        // any recording has to be closed before the file is reopened for reading
        self.close_stream();

        match MovieReader::open(&self.settings.movie_file, machine) {
            Ok(reader) => {
                self.mode = Mode::Playing(reader);
                self.frame_count = 0;
                log::info!("playing movie from {}", self.settings.movie_file.display());
                self.show_message("Movie playback started");
                Toggle::Started
            }
            Err(err) => {
                log::warn!("could not start movie playback: {}", err);
                self.show_message("Invalid movie file");
                Toggle::Failed(err)
            }
        }
    }

    /// Records or plays back one frame of input. Must be called once per emulated frame.
    pub fn update<M: Machine + ?Sized>(&mut self, machine: &mut M) -> FrameOutcome {
        let result = match &mut self.mode {
            Mode::Off => return FrameOutcome::Idle,
            Mode::Recording(writer) => writer
                .record_frame(machine)
                .map(|()| FrameOutcome::Recorded),
            Mode::Playing(reader) => reader.play_frame(machine).map(|played| match played {
                true => FrameOutcome::Played,
                false => FrameOutcome::PlaybackFinished,
            }),
        };

        match result {
            Ok(FrameOutcome::PlaybackFinished) => {
                self.close_stream();
                log::info!("movie playback finished after {} frames", self.frame_count);
                self.show_message("Movie playback finished");
                FrameOutcome::PlaybackFinished
            }
            Ok(outcome) => {
                log::debug!("{:?} movie frame {}", outcome, self.frame_count);
                self.frame_count += 1;
                outcome
            }
            Err(err) => {
                log::warn!("movie stream failed on frame {}: {}", self.frame_count, err);
                self.close_stream();
                self.show_message("Movie stopped: file error");
                FrameOutcome::Failed(err)
            }
        }
    }

    /// Cancels any active movie mode and returns to slot 0.
    /// Call whenever a program is loaded or unloaded.
    pub fn reset(&mut self) {
        self.current_slot = Slot::default();
        self.close_stream();
    }

    /// Closes the open movie stream, if any, and switches movie mode off.
    fn close_stream(&mut self) {
        match mem::replace(&mut self.mode, Mode::Off) {
            Mode::Recording(writer) => {
                if let Err(err) = writer.finish() {
                    log::warn!("movie file was not closed cleanly: {}", err);
                }
            }
            Mode::Playing(_) | Mode::Off => (),
        }
    }
}

impl Drop for StateManager {
    fn drop(&mut self) {
        self.close_stream();
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("settings", &self.settings)
            .field("current_slot", &self.current_slot)
            .field("mode", &self.mode)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}
