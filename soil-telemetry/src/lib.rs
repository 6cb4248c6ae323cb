//! # soil-telemetry
//!
//! Structured logging for the soil advisor built on `tracing`.
//!
//! ```rust
//! use soil_telemetry::{init_telemetry, info};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("soil-advisor")?;
//!     info!("ready");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use spans::*;

pub use init::{init_telemetry, init_with_level};
