//! Test utilities shared by unit and integration tests
//!
//! Available under `cfg(test)` and the `test-utils` feature, which the
//! integration test target enables through a self dev-dependency.
//!
//! - [`fixtures`] - release archive builders and directory tree snapshots
//! - [`init_test_logging`] - one-time tracing setup for tests

pub mod fixtures;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests.
///
/// With an explicit `level` that level is used; otherwise `RUST_LOG` is
/// honored when set, and logging stays off when it is not. Safe to call from
/// every test.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
