//! Core data types shared by the store, the remote catalog and the syncer

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// One immutable snapshot of a repository's build data
///
/// `rev` is what the user asked for, `commit_id` is what it resolved to.
/// They are usually equal because the working copy is resolved to a commit
/// before a sync starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionRef {
	pub repo_uri: String,
	pub rev: String,
	pub commit_id: String,
}

impl RevisionRef {
	/// Reference a commit directly, using the commit ID as the revision
	pub fn new(repo_uri: impl Into<String>, commit_id: impl Into<String>) -> Self {
		let commit_id = commit_id.into();
		RevisionRef { repo_uri: repo_uri.into(), rev: commit_id.clone(), commit_id }
	}

	/// Same repository, another commit
	pub fn at_commit(&self, commit_id: &str) -> Self {
		if commit_id == self.commit_id {
			return self.clone();
		}
		RevisionRef::new(self.repo_uri.clone(), commit_id)
	}
}

impl fmt::Display for RevisionRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.rev == self.commit_id {
			write!(f, "{}@{}", self.repo_uri, self.commit_id)
		} else {
			write!(f, "{}@{} ({})", self.repo_uri, self.rev, self.commit_id)
		}
	}
}

/// One build-data artifact, as seen at listing time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
	/// Path relative to the commit's build-data directory
	pub path: String,
	/// Commit the file belongs to
	pub commit_id: String,
	pub size: u64,
	pub modified: DateTime<Utc>,
}

impl FileRecord {
	pub fn size_kb(&self) -> f64 {
		self.size as f64 / 1024.0
	}
}

/// Ordered result of one listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet(Vec<FileRecord>);

impl FileSet {
	pub fn new(records: Vec<FileRecord>) -> Self {
		FileSet(records)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
		self.0.iter()
	}

	pub fn total_size(&self) -> u64 {
		self.0.iter().map(|r| r.size).sum()
	}

	pub fn into_records(self) -> Vec<FileRecord> {
		self.0
	}
}

impl IntoIterator for FileSet {
	type Item = FileRecord;
	type IntoIter = std::vec::IntoIter<FileRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a FileSet {
	type Item = &'a FileRecord;
	type IntoIter = std::slice::Iter<'a, FileRecord>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

impl FromIterator<FileRecord> for FileSet {
	fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
		FileSet(iter.into_iter().collect())
	}
}

/// Which way the bytes of a transfer flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Local store to remote catalog
	Upload,
	/// Remote catalog to local store
	Download,
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Direction::Upload => write!(f, "upload"),
			Direction::Download => write!(f, "download"),
		}
	}
}

/// One file's transfer, owned by the task that runs it
#[derive(Debug, Clone)]
pub struct TransferTask {
	pub record: FileRecord,
	pub direction: Direction,
	/// Concrete path in the local store
	pub local_path: PathBuf,
	/// Revision the remote side of the transfer is addressed by
	pub remote: RevisionRef,
}


// vim: ts=4
