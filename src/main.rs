//! gitsnap binary entry point.

use std::process::ExitCode;

use gitsnap::ui::output;

fn main() -> ExitCode {
    match gitsnap::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
