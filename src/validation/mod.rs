//! Validation for values that cross a trust boundary
//!
//! - Path validation (relative store paths, commit identifiers)
//! - Configuration validation (parallelism, remote URL)

use thiserror::Error;

pub mod config;
pub mod path;

pub use config::*;
pub use path::*;

/// Generic validation error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// Invalid configuration
	#[error("Config validation error: {0}")]
	ConfigError(String),
	/// Invalid path
	#[error("Path validation error: {0}")]
	PathError(String),
}

/// Trait for validatable types
pub trait Validator {
	/// Returns Ok(()) if valid, Err(ValidationError) if invalid
	fn validate(&self) -> Result<(), ValidationError>;
}
