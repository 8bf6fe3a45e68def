//! Pull and push of build data
//!
//! Both operations are a straight line: list the source, stop if asked to
//! only list, otherwise hand one transfer per file to a bounded executor and
//! wait for all of them. The first per-file error fails the whole operation;
//! there is no report of which files made it.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use buildsync::remote::HttpCatalog;
//! use buildsync::store::LocalStore;
//! use buildsync::sync::{SyncOptions, Syncer};
//!
//! let store = Arc::new(LocalStore::open(".srclib-cache").await?);
//! let remote = Arc::new(HttpCatalog::new("https://sourcegraph.com/.api")?);
//! let outcome = Syncer::new(store, remote).pull(&rev, SyncOptions::default()).await?;
//! ```

use futures::StreamExt;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;

use crate::error::{StoreError, SyncError};
use crate::executor::{BoundedExecutor, DEFAULT_CONCURRENCY};
use crate::logging::*;
use crate::remote::{read_stream, Listing, RemoteCatalog};
use crate::store::{FileStore, Stat};
use crate::types::{Direction, FileRecord, FileSet, RevisionRef, TransferTask};
use crate::util::bytes_string;

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
	/// Report the file set and transfer nothing
	pub list_only: bool,
}

/// Totals of a completed transfer batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
	pub direction: Direction,
	/// Files copied
	pub transferred: usize,
	/// Files listed but gone by the time their transfer ran
	pub skipped: usize,
	/// Bytes copied
	pub bytes: u64,
}

/// How a pull or push ended; failures are the `Err` side of the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
	/// The source had nothing for this revision
	Empty,
	/// List-only run; nothing was written anywhere
	Listed(FileSet),
	/// Every file was transferred or skipped
	Synced(SyncReport),
}

#[derive(Debug, Default)]
struct Counters {
	transferred: AtomicUsize,
	skipped: AtomicUsize,
	bytes: AtomicU64,
}

impl Counters {
	fn report(&self, direction: Direction) -> SyncReport {
		SyncReport {
			direction,
			transferred: self.transferred.load(Ordering::SeqCst),
			skipped: self.skipped.load(Ordering::SeqCst),
			bytes: self.bytes.load(Ordering::SeqCst),
		}
	}
}

/// Moves build data between a local store and a remote catalog
#[derive(Clone)]
pub struct Syncer {
	store: Arc<dyn FileStore>,
	remote: Arc<dyn RemoteCatalog>,
	concurrency: usize,
}

impl Syncer {
	pub fn new(store: Arc<dyn FileStore>, remote: Arc<dyn RemoteCatalog>) -> Self {
		Syncer { store, remote, concurrency: DEFAULT_CONCURRENCY }
	}

	/// Set the number of concurrently active transfers
	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency.max(1);
		self
	}

	pub fn concurrency(&self) -> usize {
		self.concurrency
	}

	/// Address of a remote file, when the catalog exposes one
	pub fn remote_url(&self, rev: &RevisionRef, record: &FileRecord) -> Option<String> {
		self.remote.file_url(&rev.at_commit(&record.commit_id), &record.path)
	}

	/// Fetch the remote build data of `rev` into the local store
	pub async fn pull(
		&self,
		rev: &RevisionRef,
		options: SyncOptions,
	) -> Result<SyncOutcome, SyncError> {
		debug!("Listing remote build files for {}", rev);
		let files = match self.remote.list(rev).await? {
			Listing::NotFound => {
				info!("No remote build files found");
				return Ok(SyncOutcome::Empty);
			}
			Listing::Found(files) => dedupe(files),
		};

		if options.list_only {
			return Ok(SyncOutcome::Listed(files));
		}

		let tasks = self.plan(rev, files, Direction::Download)?;
		self.run(tasks, Direction::Download).await
	}

	/// Upload the local build data to the remote catalog
	///
	/// Each file goes to the commit it is stored under; `rev` names the
	/// repository.
	pub async fn push(
		&self,
		rev: &RevisionRef,
		options: SyncOptions,
	) -> Result<SyncOutcome, SyncError> {
		debug!("Listing local build files for {}", rev);
		let files = self.store.list_all().await?;

		if options.list_only {
			return Ok(SyncOutcome::Listed(files));
		}
		if files.is_empty() {
			info!("No local build files found");
			return Ok(SyncOutcome::Empty);
		}

		let tasks = self.plan(rev, files, Direction::Upload)?;
		self.run(tasks, Direction::Upload).await
	}

	/// Resolve every record to a task before anything is transferred
	fn plan(
		&self,
		rev: &RevisionRef,
		files: FileSet,
		direction: Direction,
	) -> Result<Vec<TransferTask>, SyncError> {
		files
			.into_iter()
			.map(|record| {
				let local_path =
					self.store.address_of(&record.commit_id, &record.path).map_err(|e| match e {
						StoreError::Invalid(v) => SyncError::InvalidPath(v),
						other => SyncError::Store(other),
					})?;
				let remote = rev.at_commit(&record.commit_id);
				Ok(TransferTask { record, direction, local_path, remote })
			})
			.collect()
	}

	async fn run(
		&self,
		tasks: Vec<TransferTask>,
		direction: Direction,
	) -> Result<SyncOutcome, SyncError> {
		let started = Instant::now();
		let total = tasks.len();
		let counters = Arc::new(Counters::default());
		let mut executor: BoundedExecutor<SyncError> = BoundedExecutor::new(self.concurrency);

		for task in tasks {
			let store = self.store.clone();
			let remote = self.remote.clone();
			let counters = counters.clone();
			match task.direction {
				Direction::Download => {
					executor.submit(download(store, remote, task, counters)).await
				}
				Direction::Upload => executor.submit(upload(store, remote, task, counters)).await,
			}
		}

		if let Err(e) = executor.wait().await {
			error!("{} of {} files failed: {}", direction, total, e);
			return Err(e);
		}

		let report = counters.report(direction);
		info!(
			"{} finished: {} transferred, {} skipped, {} in {:.1}s",
			direction,
			report.transferred,
			report.skipped,
			bytes_string(report.bytes),
			started.elapsed().as_secs_f64()
		);
		Ok(SyncOutcome::Synced(report))
	}
}

/// Drop repeated (commit, path) pairs, keeping the first
fn dedupe(files: FileSet) -> FileSet {
	let mut seen = HashSet::new();
	files
		.into_iter()
		.filter(|record| {
			let fresh = seen.insert((record.commit_id.clone(), record.path.clone()));
			if !fresh {
				warn!("Ignoring duplicate listing entry {}/{}", record.commit_id, record.path);
			}
			fresh
		})
		.collect()
}

fn storage_error(path: &Path, source: impl Into<StoreError>) -> SyncError {
	SyncError::Storage { path: path.to_path_buf(), source: source.into() }
}

async fn download(
	store: Arc<dyn FileStore>,
	remote: Arc<dyn RemoteCatalog>,
	task: TransferTask,
	counters: Arc<Counters>,
) -> Result<(), SyncError> {
	let TransferTask { record, local_path, remote: rev, .. } = task;
	debug!("Fetching {} ({:.1}kb)", local_path.display(), record.size_kb());

	let mut body = remote
		.fetch(&rev, &record.path)
		.await
		.map_err(|source| SyncError::Transfer { path: record.path.clone(), source })?;

	store.ensure_container_for(&local_path).await.map_err(|e| storage_error(&local_path, e))?;
	let mut file = store.create(&local_path).await.map_err(|e| storage_error(&local_path, e))?;

	let mut written = 0u64;
	while let Some(chunk) = body.next().await {
		let chunk =
			chunk.map_err(|source| SyncError::Transfer { path: record.path.clone(), source })?;
		file.write_all(&chunk).await.map_err(|e| storage_error(&local_path, e))?;
		written += chunk.len() as u64;
	}
	file.shutdown().await.map_err(|e| storage_error(&local_path, e))?;

	counters.transferred.fetch_add(1, Ordering::SeqCst);
	counters.bytes.fetch_add(written, Ordering::SeqCst);
	debug!("Saved {} ({:.1}kb)", local_path.display(), written as f64 / 1024.0);
	Ok(())
}

async fn upload(
	store: Arc<dyn FileStore>,
	remote: Arc<dyn RemoteCatalog>,
	task: TransferTask,
	counters: Arc<Counters>,
) -> Result<(), SyncError> {
	let TransferTask { record, local_path, remote: rev, .. } = task;

	let size = match store.stat_or_absent(&local_path).await {
		Ok(Stat::Present { size, .. }) => size,
		Ok(Stat::Absent) => {
			warn!("Skipping nonexistent file {}", local_path.display());
			counters.skipped.fetch_add(1, Ordering::SeqCst);
			return Ok(());
		}
		Err(e) => return Err(storage_error(&local_path, e)),
	};

	debug!("Uploading {} ({:.1}kb)", local_path.display(), size as f64 / 1024.0);
	let reader = store.open(&local_path).await.map_err(|e| storage_error(&local_path, e))?;
	remote
		.store(&rev, &record.path, read_stream(reader), size)
		.await
		.map_err(|source| SyncError::Transfer { path: record.path.clone(), source })?;

	counters.transferred.fetch_add(1, Ordering::SeqCst);
	counters.bytes.fetch_add(size, Ordering::SeqCst);
	debug!("Uploaded {} ({:.1}kb)", local_path.display(), size as f64 / 1024.0);
	Ok(())
}


// vim: ts=4
