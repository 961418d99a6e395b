//! Process-wide tracing setup shared by the binaries.

pub mod tracing;

pub use tracing::{LogFormat, ParseLogFormatError};

/// Initialize logging in the given format.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
