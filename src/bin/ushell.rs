//! `ushell` -- an interactive pipeline-executing shell.

use std::io::{self, BufReader};
use std::process::ExitCode;

use sysprog_lab::shell::Shell;

fn main() -> ExitCode {
    env_logger::init();

    let shell = match Shell::new("$> ") {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to start shell: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = BufReader::new(io::stdin());
    match shell.run(stdin, io::stdout()) {
        Ok(code) => {
            if let Ok(code) = u8::try_from(code.rem_euclid(256)) {
                ExitCode::from(code)
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            log::error!("shell loop failed: {e}");
            ExitCode::FAILURE
        }
    }
}
