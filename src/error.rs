//! Error types for buildsync operations
//!
//! Per-file faults are wrapped with the path they happened on so the single
//! error surfaced by a batch still says which transfer broke. Conditions that
//! are part of normal operation ("remote has nothing", "local file vanished")
//! are not errors at all; see [`crate::remote::Listing`] and
//! [`crate::store::Stat`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationError;

/// Main error type for pull/push operations
#[derive(Debug, Error)]
pub enum SyncError {
	/// Revision resolution or store initialization failed before any transfer
	#[error("Setup failed: {message}")]
	Setup { message: String },

	/// A single file's copy failed on the remote side
	#[error("Transfer of {path} failed: {source}")]
	Transfer {
		path: String,
		#[source]
		source: RemoteError,
	},

	/// A single file's copy failed on the local side
	#[error("Storage error on {}: {source}", path.display())]
	Storage {
		path: PathBuf,
		#[source]
		source: StoreError,
	},

	/// The local store could not be enumerated
	#[error("Store error: {0}")]
	Store(#[from] StoreError),

	/// The remote catalog could not be listed
	#[error("Remote error: {0}")]
	Remote(#[from] RemoteError),

	/// A listed path or commit cannot be mapped into the store
	#[error("Invalid path: {0}")]
	InvalidPath(#[from] ValidationError),

	/// A transfer task panicked or was aborted by the runtime
	#[error("Transfer task failed: {message}")]
	TaskPanicked { message: String },
}

impl SyncError {
	pub fn setup(message: impl Into<String>) -> Self {
		SyncError::Setup { message: message.into() }
	}
}

impl From<RevisionError> for SyncError {
	fn from(e: RevisionError) -> Self {
		SyncError::Setup { message: e.to_string() }
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Setup { message: e.to_string() }
	}
}

impl From<tokio::task::JoinError> for SyncError {
	fn from(e: tokio::task::JoinError) -> Self {
		SyncError::TaskPanicked { message: e.to_string() }
	}
}

/// Local store errors
#[derive(Debug, Error)]
pub enum StoreError {
	/// Underlying filesystem error
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	/// Store root exists but is not a directory
	#[error("Store root {} is not a directory", path.display())]
	NotADirectory { path: PathBuf },

	/// Directory walk failed while enumerating the store
	#[error("Walk failed: {message}")]
	Walk { message: String },

	/// Relative path or commit rejected before touching the filesystem
	#[error(transparent)]
	Invalid(#[from] ValidationError),
}

impl From<ignore::Error> for StoreError {
	fn from(e: ignore::Error) -> Self {
		let message = e.to_string();
		match e.into_io_error() {
			Some(io) => StoreError::Io(io),
			None => StoreError::Walk { message },
		}
	}
}

/// Remote catalog errors
#[derive(Debug, Error)]
pub enum RemoteError {
	/// Request could not be sent or the body could not be streamed
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// Remote answered with a non-success status
	#[error("Unexpected status {status} from {url}")]
	Status { status: u16, url: String },

	/// Listing payload could not be decoded
	#[error("Invalid listing: {message}")]
	Decode { message: String },

	/// Base URL or route could not be built
	#[error("Invalid URL: {0}")]
	Url(#[from] url::ParseError),

	/// Named file is not present in the catalog
	#[error("No such remote file: {path}")]
	NoSuchFile { path: String },

	/// Upload source could not be read
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Config file could not be read
	#[error("Cannot read config file {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	/// Config file is not valid TOML for this schema
	#[error("Cannot parse config file {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// Environment variable holds an unusable value
	#[error("Invalid value {value:?} for {key}")]
	Env { key: String, value: String },

	/// Loaded values failed validation
	#[error(transparent)]
	Invalid(#[from] ValidationError),
}

/// Working-copy revision resolution errors
#[derive(Debug, Error)]
pub enum RevisionError {
	/// `git` could not be spawned
	#[error("Failed to run git in {}: {source}", dir.display())]
	SpawnFailed {
		dir: PathBuf,
		#[source]
		source: io::Error,
	},

	/// `git` ran but reported failure
	#[error("git {command} failed: {stderr}")]
	CommandFailed { command: String, stderr: String },

	/// Output could not be interpreted
	#[error("Cannot determine {what}: {message}")]
	Unresolvable { what: String, message: String },
}


// vim: ts=4
