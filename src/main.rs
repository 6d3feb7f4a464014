//! Binary entrypoint for the Helix terminal client.

use std::process::ExitCode;

use helix::start_helix;

/// Connect to the Helix backend and run the terminal front-end.
fn main() -> ExitCode {
    start_helix::run()
}
