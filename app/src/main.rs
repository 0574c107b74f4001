use std::process::ExitCode;

use gitech_app::{App, AppArgs, DefaultAppArgs};

fn main() -> ExitCode {
    match App::run(DefaultAppArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("virtual-museum: {err}");
            ExitCode::FAILURE
        }
    }
}
