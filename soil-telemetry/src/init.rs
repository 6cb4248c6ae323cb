//! Telemetry initialization

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize console logging at `info`, overridable through `RUST_LOG`.
///
/// # Example
/// ```
/// use soil_telemetry::init_telemetry;
/// init_telemetry("soil-advisor").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(service_name, false)
}

/// Initialize console logging, defaulting to `debug` when `debug_mode` is set.
///
/// Only the first call installs a subscriber; later calls return the first outcome.
pub fn init_with_level(
    service_name: &str,
    debug_mode: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directive(debug_mode)))
            .map_err(|e| e.to_string())?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| e.to_string())?;

        tracing::info!(service.name = service_name, debug = debug_mode, "Telemetry initialized");
        Ok(())
    });

    outcome.clone().map_err(Into::into)
}

pub(crate) fn default_directive(debug_mode: bool) -> &'static str {
    if debug_mode { "debug" } else { "info" }
}
