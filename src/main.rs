//! Main entry point for the unblock CLI app

use unblock::{cli_runner, logging};

fn main() -> std::process::ExitCode {
    logging::init();
    match cli_runner::run_cli_app() {
        Ok(true) => std::process::ExitCode::SUCCESS,
        Ok(false) => std::process::ExitCode::FAILURE,
        Err(e) => {
            if e.downcast_ref::<clap::Error>().is_none() {
                eprintln!("Error: {}", e);
            }
            std::process::ExitCode::FAILURE
        }
    }
}
