//! gzr - record provenance for built container images and publish them

use std::process::ExitCode;

fn main() -> ExitCode {
    match gozer::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            gozer::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
