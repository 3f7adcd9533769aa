use std::{path::PathBuf, process::ExitCode};

use statekeep_core::Settings;

mod console;
mod session;

const MOVIE_FRAMES: u64 = 600;

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().filter_or("RUST_LOG", "warn"));

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("could not read {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };
    log::info!("state directory is {}", settings.state_dir.display());

    match session::run_session(settings, MOVIE_FRAMES, |msg: &str| println!("{}", msg)) {
        Ok(report) => {
            println!(
                "replayed {} frames, final checksum {:016x}",
                report.frames, report.checksum
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("session failed: {}", err);
            eprintln!("session failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
