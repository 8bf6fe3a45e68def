//! Configuration validation functions

use super::ValidationError;

/// Upper bound for concurrently active transfers
pub const MAX_PARALLEL_TRANSFERS: usize = 64;

/// Validate the number of concurrently active transfers
pub fn validate_parallel_transfers(count: usize) -> Result<(), ValidationError> {
	if count == 0 {
		return Err(ValidationError::ConfigError(
			"parallelTransfers must be at least 1".to_string(),
		));
	}
	if count > MAX_PARALLEL_TRANSFERS {
		return Err(ValidationError::ConfigError(format!(
			"parallelTransfers must be at most {}, got {}",
			MAX_PARALLEL_TRANSFERS, count
		)));
	}
	Ok(())
}

/// Validate the remote catalog base URL
pub fn validate_remote_url(remote_url: &str) -> Result<(), ValidationError> {
	if remote_url.trim().is_empty() {
		return Err(ValidationError::ConfigError("remoteUrl must not be empty".to_string()));
	}
	match url::Url::parse(remote_url) {
		Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
		Ok(url) => Err(ValidationError::ConfigError(format!(
			"remoteUrl must be http or https, got {}",
			url.scheme()
		))),
		Err(e) => Err(ValidationError::ConfigError(format!(
			"remoteUrl {:?} is not a valid URL: {}",
			remote_url, e
		))),
	}
}
