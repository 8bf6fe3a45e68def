//! In-process catalog
//!
//! Keeps every revision's files in memory. Used as the remote double in
//! tests and to exercise the sync paths without a server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ByteStream, Listing, RemoteCatalog};
use crate::error::RemoteError;
use crate::types::{FileRecord, FileSet, RevisionRef};

#[derive(Debug, Clone)]
struct StoredFile {
	data: Vec<u8>,
	modified: DateTime<Utc>,
}

/// Files keyed by (repository URI, commit ID), then by path
type Revisions = BTreeMap<(String, String), BTreeMap<String, StoredFile>>;

/// Catalog backed by a map in memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
	revisions: Mutex<Revisions>,
	failing: Mutex<BTreeSet<String>>,
	fetch_calls: AtomicUsize,
	store_calls: AtomicUsize,
}

impl MemoryCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed a file directly, bypassing `store`
	pub fn insert(&self, rev: &RevisionRef, path: &str, data: impl Into<Vec<u8>>) {
		let mut revisions = self.revisions.lock().unwrap_or_else(|e| e.into_inner());
		revisions
			.entry(key(rev))
			.or_default()
			.insert(path.to_string(), StoredFile { data: data.into(), modified: Utc::now() });
	}

	/// Make `fetch` and `store` of `path` fail with a 500
	pub fn fail_on(&self, path: &str) {
		self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(path.to_string());
	}

	/// Contents of a stored file
	pub fn get(&self, rev: &RevisionRef, path: &str) -> Option<Vec<u8>> {
		let revisions = self.revisions.lock().unwrap_or_else(|e| e.into_inner());
		revisions.get(&key(rev)).and_then(|files| files.get(path)).map(|f| f.data.clone())
	}

	/// Number of files held for a revision
	pub fn file_count(&self, rev: &RevisionRef) -> usize {
		let revisions = self.revisions.lock().unwrap_or_else(|e| e.into_inner());
		revisions.get(&key(rev)).map(|files| files.len()).unwrap_or(0)
	}

	pub fn fetch_calls(&self) -> usize {
		self.fetch_calls.load(Ordering::SeqCst)
	}

	pub fn store_calls(&self) -> usize {
		self.store_calls.load(Ordering::SeqCst)
	}

	fn check_failing(&self, path: &str) -> Result<(), RemoteError> {
		if self.failing.lock().unwrap_or_else(|e| e.into_inner()).contains(path) {
			return Err(RemoteError::Status { status: 500, url: format!("memory:{}", path) });
		}
		Ok(())
	}
}

fn key(rev: &RevisionRef) -> (String, String) {
	(rev.repo_uri.clone(), rev.commit_id.clone())
}

#[async_trait]
impl RemoteCatalog for MemoryCatalog {
	async fn list(&self, rev: &RevisionRef) -> Result<Listing, RemoteError> {
		let revisions = self.revisions.lock().unwrap_or_else(|e| e.into_inner());
		let files = match revisions.get(&key(rev)) {
			Some(files) => files,
			None => return Ok(Listing::NotFound),
		};
		let set: FileSet = files
			.iter()
			.map(|(path, file)| FileRecord {
				path: path.clone(),
				commit_id: rev.commit_id.clone(),
				size: file.data.len() as u64,
				modified: file.modified,
			})
			.collect();
		Ok(Listing::Found(set))
	}

	async fn fetch(&self, rev: &RevisionRef, path: &str) -> Result<ByteStream, RemoteError> {
		self.fetch_calls.fetch_add(1, Ordering::SeqCst);
		self.check_failing(path)?;
		let data = self
			.get(rev, path)
			.ok_or_else(|| RemoteError::NoSuchFile { path: path.to_string() })?;
		Ok(stream::iter(vec![Ok(data)]).boxed())
	}

	async fn store(
		&self,
		rev: &RevisionRef,
		path: &str,
		body: ByteStream,
		_size: u64,
	) -> Result<(), RemoteError> {
		self.store_calls.fetch_add(1, Ordering::SeqCst);
		self.check_failing(path)?;
		let chunks: Vec<Vec<u8>> = body.try_collect().await?;
		self.insert(rev, path, chunks.concat());
		Ok(())
	}
}


// vim: ts=4
