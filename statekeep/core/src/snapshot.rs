use std::fs;

use statekeep_stream::{Deserializer, Serializer};

use crate::{
    error::StateError,
    machine::{load_machine, Machine},
    manager::StateManager,
    slot::Slot,
};

/// Functions dealing with savestate slots.
impl StateManager {
    /// Saves the machine into `slot`, or the current slot if `None`.
    ///
    /// The slot file is replaced only once the whole state has been written.
    /// If auto-slot is enabled, a successful save moves to the next slot.
    pub fn save_state<M: Machine + ?Sized>(
        &mut self,
        machine: &M,
        slot: Option<Slot>,
    ) -> Result<Slot, StateError> {
        let slot = slot.unwrap_or(self.current_slot);
        let path = self.settings.state_path(machine.display_name(), slot);

        if let Err(source) = fs::create_dir_all(&self.settings.state_dir) {
            let dir = self.settings.state_dir.clone();
            log::warn!("could not create state directory {}: {}", dir.display(), source);
            self.show_message("Error saving state file");
            return Err(StateError::StreamOpenFailed { path: dir, source });
        }

        let mut out = match Serializer::create_atomic(&path) {
            Ok(out) => out,
            Err(err) => {
                log::warn!("could not open state file: {}", err);
                self.show_message("Error saving state file");
                return Err(err.into());
            }
        };

        let result =
            write_state(&mut out, machine).and_then(|()| out.finish().map_err(StateError::from));
        if let Err(err) = result {
            log::warn!("saving state {} failed: {}", slot, err);
            self.show_message(&format!("Error saving state {}", slot));
            return Err(err);
        }

        log::info!("saved state {} to {}", slot, path.display());
        let mut message = format!("State {} saved", slot);
        if self.settings.auto_slot {
            self.current_slot = slot.next();
            message.push_str(&format!(", switching to slot {}", self.current_slot));
        }
        self.show_message(&message);
        Ok(slot)
    }

    /// Loads the machine from `slot`, or the current slot if `None`.
    ///
    /// The file must have been saved with the same program. If it wasn't, or
    /// the state inside is damaged, the machine is left as it was. Never
    /// changes the current slot.
    pub fn load_state<M: Machine + ?Sized>(
        &mut self,
        machine: &mut M,
        slot: Option<Slot>,
    ) -> Result<Slot, StateError> {
        let slot = slot.unwrap_or(self.current_slot);
        let path = self.settings.state_path(machine.display_name(), slot);

        let mut input = match Deserializer::open(&path) {
            Ok(input) => input,
            Err(err) => {
                log::warn!("could not open state file: {}", err);
                self.show_message(&format!("Error loading state {}", slot));
                return Err(err.into());
            }
        };

        if let Err(err) = read_state(&mut input, machine) {
            log::warn!("state {} rejected: {}", slot, err);
            self.show_message(&format!("Invalid state {} file", slot));
            return Err(err);
        }

        log::info!("loaded state {} from {}", slot, path.display());
        self.show_message(&format!("State {} loaded", slot));
        Ok(slot)
    }

    /// Moves to the next slot, wrapping from 9 back to 0. No files are touched.
    pub fn change_state(&mut self) -> Slot {
        self.current_slot = self.current_slot.next();
        self.show_message(&format!("Changed to slot {}", self.current_slot));
        self.current_slot
    }
}

fn write_state<M: Machine + ?Sized>(out: &mut Serializer, machine: &M) -> Result<(), StateError> {
    // the tag ties this file to the program that made it
    out.put_string(machine.identity())?;
    machine.save(out)?;
    Ok(())
}

fn read_state<M: Machine + ?Sized>(
    input: &mut Deserializer,
    machine: &mut M,
) -> Result<(), StateError> {
    let found = input.get_string()?;
    if found != machine.identity() {
        return Err(StateError::IdentityMismatch {
            expected: machine.identity().to_owned(),
            found,
        });
    }
    load_machine(machine, input)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, path::Path, rc::Rc};

    use super::*;
    use crate::{settings::Settings, testing::FakeMachine};

    fn manager_in(dir: &Path, auto_slot: bool) -> (StateManager, Rc<RefCell<Vec<String>>>) {
        let mut manager = StateManager::new(Settings {
            state_dir: dir.join("state"),
            movie_file: dir.join("test.inp"),
            auto_slot,
        });
        let messages = Rc::new(RefCell::new(Vec::new()));
        {
            let messages = Rc::clone(&messages);
            manager.set_message_handler(move |msg: &str| messages.borrow_mut().push(msg.to_owned()));
        }
        (manager, messages)
    }

    fn last(messages: &Rc<RefCell<Vec<String>>>) -> String {
        messages.borrow().last().cloned().unwrap_or_default()
    }

    #[test]
    fn test_save_load_every_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, messages) = manager_in(dir.path(), false);
        let mut machine = FakeMachine::new("md5-a", "Pitfall");

        for n in 0..Slot::COUNT {
            let slot = Slot::new(n).unwrap();
            machine.cycles = u64::from(n) * 1000 + 7;
            machine.ram[n as usize] = n + 1;
            let saved = machine.clone();

            assert_eq!(manager.save_state(&machine, Some(slot)).unwrap(), slot);
            assert_eq!(last(&messages), format!("State {} saved", n));

            machine.cycles = 0;
            machine.ram.fill(0xAA);

            assert_eq!(manager.load_state(&mut machine, Some(slot)).unwrap(), slot);
            assert_eq!(last(&messages), format!("State {} loaded", n));
            assert_eq!(machine, saved);
        }
        assert_eq!(manager.current_slot().get(), 0);
    }

    #[test]
    fn test_current_slot_used_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = manager_in(dir.path(), false);
        let machine = FakeMachine::new("md5-a", "Pitfall");

        manager.change_state();
        manager.change_state();
        manager.change_state();
        assert_eq!(manager.save_state(&machine, None).unwrap().get(), 3);
        assert!(dir.path().join("state").join("Pitfall.st3").exists());
        assert_eq!(manager.current_slot().get(), 3);
    }

    #[test]
    fn test_auto_slot_advances_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, messages) = manager_in(dir.path(), true);
        let mut machine = FakeMachine::new("md5-a", "Pitfall");

        manager.save_state(&machine, Some(Slot::new(9).unwrap())).unwrap();
        assert_eq!(manager.current_slot().get(), 0);
        assert_eq!(last(&messages), "State 9 saved, switching to slot 0");

        machine.fail_save = true;
        assert!(manager.save_state(&machine, None).is_err());
        assert_eq!(manager.current_slot().get(), 0);
        assert_eq!(last(&messages), "Error saving state 0");
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = manager_in(dir.path(), false);
        let mut machine = FakeMachine::new("md5-a", "Pitfall");
        let slot = Some(Slot::new(2).unwrap());

        machine.cycles = 42;
        manager.save_state(&machine, slot).unwrap();

        machine.cycles = 43;
        machine.fail_save = true;
        assert!(manager.save_state(&machine, slot).is_err());

        machine.fail_save = false;
        machine.cycles = 0;
        manager.load_state(&mut machine, slot).unwrap();
        assert_eq!(machine.cycles, 42);

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("state"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("Pitfall.st2")]);
    }

    #[test]
    fn test_save_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        // a plain file where the state directory should be
        fs::write(dir.path().join("state"), b"").unwrap();
        let (mut manager, messages) = manager_in(dir.path(), true);
        let machine = FakeMachine::new("md5-a", "Pitfall");

        // the directory is reported, not the temporary file inside it
        match manager.save_state(&machine, None) {
            Err(StateError::StreamOpenFailed { path, .. }) => {
                assert_eq!(path, dir.path().join("state"))
            }
            other => panic!("expected open failure, got {:?}", other),
        }
        assert_eq!(last(&messages), "Error saving state file");
        assert_eq!(manager.current_slot().get(), 0);
    }

    #[test]
    fn test_load_missing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, messages) = manager_in(dir.path(), false);
        let mut machine = FakeMachine::new("md5-a", "Pitfall");

        assert!(matches!(
            manager.load_state(&mut machine, Some(Slot::new(5).unwrap())),
            Err(StateError::StreamOpenFailed { .. })
        ));
        assert_eq!(last(&messages), "Error loading state 5");
    }

    #[test]
    fn test_load_other_program_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, messages) = manager_in(dir.path(), false);

        let mut original = FakeMachine::new("md5-a", "Pitfall");
        original.cycles = 1;
        manager.save_state(&original, None).unwrap();

        // same display name, different program
        let mut other = FakeMachine::new("md5-b", "Pitfall");
        other.cycles = 2;
        assert!(matches!(
            manager.load_state(&mut other, None),
            Err(StateError::IdentityMismatch { .. })
        ));
        assert_eq!(last(&messages), "Invalid state 0 file");
        assert_eq!(other.cycles, 2);
    }

    #[test]
    fn test_load_corrupt_state_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, messages) = manager_in(dir.path(), false);
        let mut machine = FakeMachine::new("md5-a", "Pitfall");
        machine.cycles = 100;
        manager.save_state(&machine, None).unwrap();

        // cut the RAM blob short
        let path = dir.path().join("state").join("Pitfall.st0");
        let mut data = fs::read(&path).unwrap();
        data.truncate(data.len() - 10);
        fs::write(&path, data).unwrap();

        machine.cycles = 555;
        machine.ram[0] = 9;
        let before = machine.clone();
        assert!(matches!(
            manager.load_state(&mut machine, None),
            Err(StateError::MachineStateCorrupt(_))
        ));
        assert_eq!(last(&messages), "Invalid state 0 file");
        assert_eq!(machine, before);
    }

    #[test]
    fn test_change_state_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, messages) = manager_in(dir.path(), false);

        for expected in 1..Slot::COUNT {
            assert_eq!(manager.change_state().get(), expected);
        }
        assert_eq!(last(&messages), "Changed to slot 9");
        assert_eq!(manager.change_state().get(), 0);
        assert_eq!(last(&messages), "Changed to slot 0");
    }

    #[test]
    fn test_snapshots_ignore_movie_mode() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _) = manager_in(dir.path(), false);
        let mut machine = FakeMachine::new("md5-a", "Pitfall");

        assert!(manager.toggle_record_mode(&machine).is_active());
        machine.cycles = 64;
        manager.save_state(&machine, None).unwrap();
        machine.cycles = 0;
        manager.load_state(&mut machine, None).unwrap();

        assert_eq!(machine.cycles, 64);
        assert!(manager.is_active());
    }
}
