//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility.
//! Log output always goes to stderr; stdout belongs to command results.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output, quiet by default
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    /// Pick a profile from CLI flags; `json` wins over `verbose`.
    pub fn from_flags(verbose: bool, json: bool) -> Self {
        if verbose && !json {
            Profile::Development
        } else {
            Profile::Production
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Call once at startup; later calls are ignored.
///
/// - **Development**: human-readable logs at debug level
/// - **Production**: JSON logs, warnings and errors only
/// - **Test**: bare registry; see `init_test_capture`
///
/// `RUST_LOG` overrides the profile's default filter.
///
/// # Example
///
/// ```
/// use rtk_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        match profile {
            Profile::Development => {
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(
                        EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| EnvFilter::new("rtk_core=debug,rtk=debug")),
                    )
                    .init();
            }
            Profile::Production => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_env_filter(
                        EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| EnvFilter::new("rtk_core=warn,rtk=warn")),
                    )
                    .init();
            }
            Profile::Test => {
                // capture is installed separately via init_test_capture()
                tracing_subscriber::registry().init();
            }
        }
    });
}
