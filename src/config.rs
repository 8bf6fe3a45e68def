//! Layered configuration for buildsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`--config`, else ~/.config/buildsync/config.toml if present)
//! 3. Environment variables (BUILDSYNC_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::executor::DEFAULT_CONCURRENCY;
use crate::validation::{
	validate_parallel_transfers, validate_remote_url, ValidationError, Validator,
};

/// Directory name of the build-data cache inside a repository
pub const DEFAULT_CACHE_DIR: &str = ".srclib-cache";

/// Remote catalog used when nothing else is configured
pub const DEFAULT_REMOTE_URL: &str = "https://sourcegraph.com/.api";

pub const ENV_REMOTE_URL: &str = "BUILDSYNC_REMOTE_URL";
pub const ENV_CACHE_DIR: &str = "BUILDSYNC_CACHE_DIR";
pub const ENV_PARALLEL_TRANSFERS: &str = "BUILDSYNC_PARALLEL_TRANSFERS";
pub const ENV_AUTH_TOKEN: &str = "BUILDSYNC_AUTH_TOKEN";

/// Settings for pull/push runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Base URL of the remote build-data catalog
	pub remote_url: String,

	/// Build-data cache; relative paths are resolved against the repository root
	pub cache_dir: PathBuf,

	/// Number of concurrently active transfers
	pub parallel_transfers: usize,

	/// Bearer token sent to the remote catalog
	pub auth_token: Option<String>,

	/// Per-request timeout in seconds (0 = none)
	pub timeout_secs: u64,

	/// User-Agent header for remote requests
	pub user_agent: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			remote_url: DEFAULT_REMOTE_URL.to_string(),
			cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
			parallel_transfers: DEFAULT_CONCURRENCY,
			auth_token: None,
			timeout_secs: 0,
			user_agent: format!("buildsync/{}", env!("CARGO_PKG_VERSION")),
		}
	}
}

impl Config {
	/// Load defaults, the config file and the environment, then validate
	///
	/// An explicitly given `path` must exist; the default location is only
	/// read when present.
	pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
		let mut config = match path {
			Some(path) => Config::from_file(path)?,
			None => match default_config_path() {
				Some(path) if path.is_file() => Config::from_file(&path)?,
				_ => Config::default(),
			},
		};
		config.apply_env_from(|key| env::var(key).ok())?;
		config.validate()?;
		Ok(config)
	}

	/// Read a TOML config file
	pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
		let contents = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
		toml::from_str(&contents)
			.map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
	}

	/// Override fields from BUILDSYNC_* variables provided by `lookup`
	pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(url) = lookup(ENV_REMOTE_URL) {
			self.remote_url = url;
		}
		if let Some(dir) = lookup(ENV_CACHE_DIR) {
			self.cache_dir = PathBuf::from(dir);
		}
		if let Some(value) = lookup(ENV_PARALLEL_TRANSFERS) {
			self.parallel_transfers = value.trim().parse().map_err(|_| ConfigError::Env {
				key: ENV_PARALLEL_TRANSFERS.to_string(),
				value: value.clone(),
			})?;
		}
		if let Some(token) = lookup(ENV_AUTH_TOKEN) {
			self.auth_token = if token.is_empty() { None } else { Some(token) };
		}
		Ok(())
	}

	/// Cache directory for a repository checked out at `repo_root`
	pub fn cache_dir_for(&self, repo_root: &Path) -> PathBuf {
		if self.cache_dir.is_absolute() {
			self.cache_dir.clone()
		} else {
			repo_root.join(&self.cache_dir)
		}
	}
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		validate_remote_url(&self.remote_url)?;
		validate_parallel_transfers(self.parallel_transfers)?;
		if self.cache_dir.as_os_str().is_empty() {
			return Err(ValidationError::ConfigError("cacheDir must not be empty".to_string()));
		}
		Ok(())
	}
}

/// `$XDG_CONFIG_HOME/buildsync/config.toml`, falling back to `~/.config`
pub fn default_config_path() -> Option<PathBuf> {
	let base = match env::var("XDG_CONFIG_HOME") {
		Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
		_ => PathBuf::from(env::var("HOME").ok()?).join(".config"),
	};
	Some(base.join("buildsync").join("config.toml"))
}


// vim: ts=4
