//! Local build-data store
//!
//! Files are addressed by (commit ID, relative path). The on-disk layout is
//! `<root>/<commit ID>/<relative path>`; it is the only contract a later pull
//! has to agree with an earlier push on.

pub mod local;

pub use self::local::LocalStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::StoreError;
use crate::types::FileSet;

/// Readable side of a stored file
pub type ReadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Writable side of a stored file
pub type WriteStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Result of looking a concrete path up in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
	/// A regular file is present
	Present { size: u64, modified: DateTime<Utc> },
	/// Nothing (or nothing regular) is at the path
	Absent,
}

impl Stat {
	pub fn is_absent(&self) -> bool {
		matches!(self, Stat::Absent)
	}
}

/// Addressed local store of build-data files
///
/// Implementations must be safe to use from several transfer tasks at once.
/// Each task only writes its own target, but parent directories overlap, so
/// `ensure_container_for` has to tolerate "already exists" races.
#[async_trait]
pub trait FileStore: Send + Sync {
	/// Concrete path of a file; the relative path is validated first
	fn address_of(&self, commit_id: &str, path: &str) -> Result<PathBuf, StoreError>;

	/// Create every missing ancestor directory of `path`
	async fn ensure_container_for(&self, path: &Path) -> Result<(), StoreError>;

	/// Open a stored file for reading
	async fn open(&self, path: &Path) -> Result<ReadStream, StoreError>;

	/// Create (or truncate) a stored file for writing
	async fn create(&self, path: &Path) -> Result<WriteStream, StoreError>;

	/// Snapshot every regular file under the store
	async fn list_all(&self) -> Result<FileSet, StoreError>;

	/// Look up a concrete path; a missing file is `Stat::Absent`, not an error
	async fn stat_or_absent(&self, path: &Path) -> Result<Stat, StoreError>;
}

// vim: ts=4
