//! Filesystem-backed build-data store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs as afs;

use super::{FileStore, ReadStream, Stat, WriteStream};
use crate::error::StoreError;
use crate::logging::*;
use crate::types::{FileRecord, FileSet};
use crate::validation::{normalize_relative, validate_commit_id};

/// Build-data store rooted at a cache directory (usually `<repo>/.srclib-cache`)
#[derive(Debug, Clone)]
pub struct LocalStore {
	root: PathBuf,
}

impl LocalStore {
	/// Open the store at `root`
	///
	/// A missing root is fine (it is created by the first download); a root
	/// that exists but is not a directory is a setup error.
	pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let root = root.into();
		match afs::metadata(&root).await {
			Ok(meta) if meta.is_dir() => {}
			Ok(_) => return Err(StoreError::NotADirectory { path: root }),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!("Store root {} does not exist yet", root.display());
			}
			Err(e) => return Err(e.into()),
		}
		Ok(LocalStore { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}
}

#[async_trait]
impl FileStore for LocalStore {
	fn address_of(&self, commit_id: &str, path: &str) -> Result<PathBuf, StoreError> {
		validate_commit_id(commit_id)?;
		let relative = normalize_relative(path)?;
		Ok(self.root.join(commit_id).join(relative))
	}

	async fn ensure_container_for(&self, path: &Path) -> Result<(), StoreError> {
		match path.parent() {
			// create_dir_all treats a directory created concurrently as success
			Some(parent) if !parent.as_os_str().is_empty() => {
				afs::create_dir_all(parent).await?;
				Ok(())
			}
			_ => Ok(()),
		}
	}

	async fn open(&self, path: &Path) -> Result<ReadStream, StoreError> {
		let file = afs::File::open(path).await?;
		Ok(Box::new(file))
	}

	async fn create(&self, path: &Path) -> Result<WriteStream, StoreError> {
		let file = afs::File::create(path).await?;
		Ok(Box::new(file))
	}

	async fn list_all(&self) -> Result<FileSet, StoreError> {
		let root = self.root.clone();
		tokio::task::spawn_blocking(move || scan_store(&root))
			.await
			.map_err(|e| StoreError::Walk { message: format!("Store scan aborted: {}", e) })?
	}

	async fn stat_or_absent(&self, path: &Path) -> Result<Stat, StoreError> {
		match afs::metadata(path).await {
			Ok(meta) if meta.is_file() => {
				let modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_default();
				Ok(Stat::Present { size: meta.len(), modified })
			}
			Ok(_) => Ok(Stat::Absent),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Stat::Absent),
			Err(e) => Err(e.into()),
		}
	}
}

/// Walk the store and turn `<commit>/<path>` files into records
fn scan_store(root: &Path) -> Result<FileSet, StoreError> {
	if !root.is_dir() {
		return Ok(FileSet::default());
	}

	let mut records = Vec::new();
	for entry in WalkBuilder::new(root).standard_filters(false).follow_links(false).build() {
		let entry = entry?;
		if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
			continue;
		}
		let relative = match entry.path().strip_prefix(root) {
			Ok(relative) => relative,
			Err(_) => continue,
		};
		let (commit_id, path) = match split_store_path(relative) {
			Some(split) => split,
			None => {
				debug!("Ignoring {} (not under a commit directory)", entry.path().display());
				continue;
			}
		};
		let meta = entry.metadata()?;
		records.push(FileRecord {
			path,
			commit_id,
			size: meta.len(),
			modified: meta.modified().map(DateTime::<Utc>::from).unwrap_or_default(),
		});
	}

	records.sort_by(|a, b| a.commit_id.cmp(&b.commit_id).then_with(|| a.path.cmp(&b.path)));
	Ok(FileSet::new(records))
}

/// Split `<commit>/<a>/<b>` into ("<commit>", "a/b")
fn split_store_path(relative: &Path) -> Option<(String, String)> {
	let mut parts = Vec::new();
	for component in relative.components() {
		match component {
			Component::Normal(part) => match part.to_str() {
				Some(s) => parts.push(s),
				None => {
					warn!("Skipping non UTF-8 store path {}", relative.display());
					return None;
				}
			},
			_ => return None,
		}
	}
	if parts.len() < 2 {
		return None;
	}
	Some((parts[0].to_string(), parts[1..].join("/")))
}


// vim: ts=4
