//! Startup for the `helix` terminal client.

use std::process::ExitCode;

use crate::config::HelixConfig;
use crate::terminal;

/// Run the terminal client until the user quits.
///
/// # Returns
/// `ExitCode::SUCCESS` on a clean exit, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Helix v{}", env!("CARGO_PKG_VERSION"));

    let config = HelixConfig::from_env();
    tracing::info!(
        socket = %config.transport.endpoint,
        api = %config.api.base_url,
        "Backend endpoints"
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(terminal::run(config)) {
        tracing::error!("Helix stopped: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
