//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Pulled {} files", n);
//! debug!("Fetching {}", path);
//! ```

pub use tracing::{debug, error, info, warn};

/// Filter used with `--verbose` when RUST_LOG is unset
pub const VERBOSE_FILTER: &str = "buildsync=debug,info";

/// Filter used when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs go to stderr so listings on stdout stay machine-readable.
/// `RUST_LOG` takes precedence over `verbose`:
///
/// ```bash
/// RUST_LOG=debug buildsync pull
/// RUST_LOG=buildsync::sync=trace buildsync push
/// ```
pub fn init_tracing(verbose: bool) {
	let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
		)
		.with_writer(std::io::stderr)
		.init();
}
