//! Pull/push tests against a real local store and the in-memory catalog
//!
//! Covers:
//! - Push then pull reproduces byte-identical files
//! - Pull is idempotent
//! - "No remote data" and "file vanished" are not failures
//! - List-only runs write nothing
//! - A failing file fails the batch without stopping its siblings

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use buildsync::error::{RemoteError, StoreError, SyncError};
use buildsync::remote::{ByteStream, Listing, MemoryCatalog, RemoteCatalog};
use buildsync::store::{FileStore, LocalStore, ReadStream, Stat, WriteStream};
use buildsync::sync::{SyncOptions, SyncOutcome, Syncer};
use buildsync::types::{Direction, FileSet, RevisionRef};

// ============================================================================
// Helpers
// ============================================================================

fn rev() -> RevisionRef {
	RevisionRef::new("github.com/foo/bar", "c1")
}

/// Write a file into the store layout `<root>/<commit>/<path>`
fn write_build_file(root: &Path, commit: &str, path: &str, content: &[u8]) {
	let full = root.join(commit).join(path);
	fs::create_dir_all(full.parent().unwrap()).unwrap();
	fs::write(full, content).unwrap();
}

fn read_build_file(root: &Path, commit: &str, path: &str) -> Option<Vec<u8>> {
	fs::read(root.join(commit).join(path)).ok()
}

/// Snapshot of every file under a directory, relative path -> contents
fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
	fn walk(base: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
		for entry in fs::read_dir(dir).unwrap() {
			let path = entry.unwrap().path();
			if path.is_dir() {
				walk(base, &path, out);
			} else {
				out.push((path.strip_prefix(base).unwrap().to_path_buf(), fs::read(&path).unwrap()));
			}
		}
	}
	let mut out = Vec::new();
	if root.exists() {
		walk(root, root, &mut out);
	}
	out.sort();
	out
}

async fn syncer_for(root: &Path, remote: Arc<dyn RemoteCatalog>) -> Syncer {
	let store = LocalStore::open(root).await.unwrap();
	Syncer::new(Arc::new(store), remote)
}

/// Store wrapper counting writes
struct CountingStore {
	inner: LocalStore,
	creates: AtomicUsize,
	ensures: AtomicUsize,
}

#[async_trait]
impl FileStore for CountingStore {
	fn address_of(&self, commit_id: &str, path: &str) -> Result<PathBuf, StoreError> {
		self.inner.address_of(commit_id, path)
	}

	async fn ensure_container_for(&self, path: &Path) -> Result<(), StoreError> {
		self.ensures.fetch_add(1, Ordering::SeqCst);
		self.inner.ensure_container_for(path).await
	}

	async fn open(&self, path: &Path) -> Result<ReadStream, StoreError> {
		self.inner.open(path).await
	}

	async fn create(&self, path: &Path) -> Result<WriteStream, StoreError> {
		self.creates.fetch_add(1, Ordering::SeqCst);
		self.inner.create(path).await
	}

	async fn list_all(&self) -> Result<FileSet, StoreError> {
		self.inner.list_all().await
	}

	async fn stat_or_absent(&self, path: &Path) -> Result<Stat, StoreError> {
		self.inner.stat_or_absent(path).await
	}
}

/// Store whose listing goes stale: a file is deleted right after being listed
struct VanishingStore {
	inner: LocalStore,
	vanish: PathBuf,
}

#[async_trait]
impl FileStore for VanishingStore {
	fn address_of(&self, commit_id: &str, path: &str) -> Result<PathBuf, StoreError> {
		self.inner.address_of(commit_id, path)
	}

	async fn ensure_container_for(&self, path: &Path) -> Result<(), StoreError> {
		self.inner.ensure_container_for(path).await
	}

	async fn open(&self, path: &Path) -> Result<ReadStream, StoreError> {
		self.inner.open(path).await
	}

	async fn create(&self, path: &Path) -> Result<WriteStream, StoreError> {
		self.inner.create(path).await
	}

	async fn list_all(&self) -> Result<FileSet, StoreError> {
		let files = self.inner.list_all().await?;
		tokio::fs::remove_file(&self.vanish).await?;
		Ok(files)
	}

	async fn stat_or_absent(&self, path: &Path) -> Result<Stat, StoreError> {
		self.inner.stat_or_absent(path).await
	}
}

/// Catalog wrapper that slows fetches down and records how many overlap
struct PeakCatalog {
	inner: MemoryCatalog,
	active: AtomicUsize,
	peak: AtomicUsize,
}

#[async_trait]
impl RemoteCatalog for PeakCatalog {
	async fn list(&self, rev: &RevisionRef) -> Result<Listing, RemoteError> {
		self.inner.list(rev).await
	}

	async fn fetch(&self, rev: &RevisionRef, path: &str) -> Result<ByteStream, RemoteError> {
		let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
		tokio::time::sleep(Duration::from_millis(10)).await;
		let result = self.inner.fetch(rev, path).await;
		self.active.fetch_sub(1, Ordering::SeqCst);
		result
	}

	async fn store(
		&self,
		rev: &RevisionRef,
		path: &str,
		body: ByteStream,
		size: u64,
	) -> Result<(), RemoteError> {
		self.inner.store(rev, path, body, size).await
	}
}

// ============================================================================
// Round trip and idempotence
// ============================================================================

#[tokio::test]
async fn test_push_then_pull_round_trip() {
	let source = TempDir::new().unwrap();
	let target = TempDir::new().unwrap();
	write_build_file(source.path(), "c1", "A", b"0123456789");
	write_build_file(source.path(), "c1", "dir/B", b"");

	let remote = Arc::new(MemoryCatalog::new());

	let pushed = syncer_for(source.path(), remote.clone())
		.await
		.push(&rev(), SyncOptions::default())
		.await
		.expect("push should succeed");
	match pushed {
		SyncOutcome::Synced(report) => {
			assert_eq!(report.direction, Direction::Upload);
			assert_eq!(report.transferred, 2);
			assert_eq!(report.skipped, 0);
			assert_eq!(report.bytes, 10);
		}
		other => panic!("unexpected outcome {:?}", other),
	}
	assert_eq!(remote.file_count(&rev()), 2);

	let pulled = syncer_for(target.path(), remote.clone())
		.await
		.pull(&rev(), SyncOptions::default())
		.await
		.expect("pull should succeed");
	assert!(matches!(pulled, SyncOutcome::Synced(report) if report.transferred == 2));

	assert_eq!(read_build_file(target.path(), "c1", "A"), Some(b"0123456789".to_vec()));
	assert_eq!(read_build_file(target.path(), "c1", "dir/B"), Some(Vec::new()));
	assert_eq!(snapshot(source.path()), snapshot(target.path()));
}

#[tokio::test]
async fn test_pull_twice_is_idempotent() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());
	remote.insert(&rev(), "graph.json", b"{\"defs\":[]}".to_vec());
	remote.insert(&rev(), "pkg/refs.json", vec![1u8; 100_000]);

	let syncer = syncer_for(target.path(), remote.clone()).await;
	syncer.pull(&rev(), SyncOptions::default()).await.unwrap();
	let first = snapshot(target.path());

	syncer.pull(&rev(), SyncOptions::default()).await.unwrap();
	let second = snapshot(target.path());

	assert_eq!(first.len(), 2);
	assert_eq!(first, second);
}

#[tokio::test]
async fn test_push_keeps_each_file_on_its_commit() {
	let source = TempDir::new().unwrap();
	write_build_file(source.path(), "c1", "a.json", b"one");
	write_build_file(source.path(), "c2", "a.json", b"two");

	let remote = Arc::new(MemoryCatalog::new());
	syncer_for(source.path(), remote.clone())
		.await
		.push(&rev(), SyncOptions::default())
		.await
		.unwrap();

	assert_eq!(remote.get(&rev(), "a.json"), Some(b"one".to_vec()));
	assert_eq!(remote.get(&rev().at_commit("c2"), "a.json"), Some(b"two".to_vec()));
}

// ============================================================================
// Absence is not failure
// ============================================================================

#[tokio::test]
async fn test_pull_not_found_is_empty_success() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());

	let outcome = syncer_for(target.path(), remote.clone())
		.await
		.pull(&rev(), SyncOptions::default())
		.await
		.expect("missing remote data is not an error");

	assert_eq!(outcome, SyncOutcome::Empty);
	assert_eq!(remote.fetch_calls(), 0);
	assert!(snapshot(target.path()).is_empty());
}

#[tokio::test]
async fn test_push_skips_file_deleted_after_listing() {
	let source = TempDir::new().unwrap();
	write_build_file(source.path(), "c1", "keep1.json", b"k1");
	write_build_file(source.path(), "c1", "gone.json", b"bye");
	write_build_file(source.path(), "c1", "keep2.json", b"k2");

	let store = VanishingStore {
		inner: LocalStore::open(source.path()).await.unwrap(),
		vanish: source.path().join("c1/gone.json"),
	};
	let remote = Arc::new(MemoryCatalog::new());
	let outcome = Syncer::new(Arc::new(store), remote.clone())
		.push(&rev(), SyncOptions::default())
		.await
		.expect("a vanished file is skipped, not an error");

	match outcome {
		SyncOutcome::Synced(report) => {
			assert_eq!(report.transferred, 2);
			assert_eq!(report.skipped, 1);
		}
		other => panic!("unexpected outcome {:?}", other),
	}
	assert_eq!(remote.get(&rev(), "keep1.json"), Some(b"k1".to_vec()));
	assert_eq!(remote.get(&rev(), "keep2.json"), Some(b"k2".to_vec()));
	assert_eq!(remote.get(&rev(), "gone.json"), None);
	assert_eq!(remote.store_calls(), 2);
}

#[tokio::test]
async fn test_push_empty_store() {
	let source = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());
	let outcome = syncer_for(&source.path().join("missing"), remote.clone())
		.await
		.push(&rev(), SyncOptions::default())
		.await
		.unwrap();
	assert_eq!(outcome, SyncOutcome::Empty);
	assert_eq!(remote.store_calls(), 0);
}

// ============================================================================
// List-only mode
// ============================================================================

#[tokio::test]
async fn test_pull_list_only_writes_nothing() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());
	remote.insert(&rev(), "a.json", b"aaaa".to_vec());
	remote.insert(&rev(), "b.json", b"bb".to_vec());

	let store = Arc::new(CountingStore {
		inner: LocalStore::open(target.path()).await.unwrap(),
		creates: AtomicUsize::new(0),
		ensures: AtomicUsize::new(0),
	});
	let outcome = Syncer::new(store.clone(), remote.clone())
		.pull(&rev(), SyncOptions { list_only: true })
		.await
		.unwrap();

	match outcome {
		SyncOutcome::Listed(files) => {
			let paths: Vec<&str> = files.iter().map(|r| r.path.as_str()).collect();
			assert_eq!(paths, vec!["a.json", "b.json"]);
			assert_eq!(files.total_size(), 6);
		}
		other => panic!("unexpected outcome {:?}", other),
	}
	assert_eq!(store.creates.load(Ordering::SeqCst), 0);
	assert_eq!(store.ensures.load(Ordering::SeqCst), 0);
	assert_eq!(remote.fetch_calls(), 0);
	assert!(snapshot(target.path()).is_empty());
}

#[tokio::test]
async fn test_push_list_only_uploads_nothing() {
	let source = TempDir::new().unwrap();
	write_build_file(source.path(), "c1", "a.json", b"a");

	let remote = Arc::new(MemoryCatalog::new());
	let outcome = syncer_for(source.path(), remote.clone())
		.await
		.push(&rev(), SyncOptions { list_only: true })
		.await
		.unwrap();

	match outcome {
		SyncOutcome::Listed(files) => assert_eq!(files.len(), 1),
		other => panic!("unexpected outcome {:?}", other),
	}
	assert_eq!(remote.store_calls(), 0);
}

// ============================================================================
// Failures and concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pull_failure_is_reported_and_siblings_finish() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());
	for i in 0..12 {
		remote.insert(&rev(), &format!("f{:02}.json", i), format!("file {}", i).into_bytes());
	}
	remote.fail_on("f03.json");

	let result = syncer_for(target.path(), remote.clone())
		.await
		.pull(&rev(), SyncOptions::default())
		.await;

	match result {
		Err(SyncError::Transfer { path, .. }) => assert_eq!(path, "f03.json"),
		other => panic!("expected transfer error, got {:?}", other.map(|_| ())),
	}
	assert_eq!(remote.fetch_calls(), 12);
	assert_eq!(read_build_file(target.path(), "c1", "f11.json"), Some(b"file 11".to_vec()));
	assert_eq!(read_build_file(target.path(), "c1", "f03.json"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_push_failure_is_reported_and_siblings_finish() {
	let source = TempDir::new().unwrap();
	for i in 0..5 {
		write_build_file(source.path(), "c1", &format!("f{}.json", i), format!("file {}", i).as_bytes());
	}

	let remote = Arc::new(MemoryCatalog::new());
	remote.fail_on("f2.json");

	let result = syncer_for(source.path(), remote.clone())
		.await
		.push(&rev(), SyncOptions::default())
		.await;

	match result {
		Err(SyncError::Transfer { path, .. }) => assert_eq!(path, "f2.json"),
		other => panic!("expected transfer error, got {:?}", other.map(|_| ())),
	}
	assert_eq!(remote.file_count(&rev()), 4);
	assert_eq!(remote.get(&rev(), "f4.json"), Some(b"file 4".to_vec()));
	assert_eq!(remote.get(&rev(), "f2.json"), None);
}

#[tokio::test]
async fn test_pull_storage_failure_is_reported() {
	let target = TempDir::new().unwrap();
	// A directory squats on the destination of a.json
	fs::create_dir_all(target.path().join("c1").join("a.json")).unwrap();

	let remote = Arc::new(MemoryCatalog::new());
	remote.insert(&rev(), "a.json", b"aaa".to_vec());
	remote.insert(&rev(), "b.json", b"bbb".to_vec());

	let result = syncer_for(target.path(), remote.clone())
		.await
		.pull(&rev(), SyncOptions::default())
		.await;

	match result {
		Err(SyncError::Storage { path, .. }) => {
			assert_eq!(path, target.path().join("c1").join("a.json"))
		}
		other => panic!("expected storage error, got {:?}", other.map(|_| ())),
	}
	assert_eq!(read_build_file(target.path(), "c1", "b.json"), Some(b"bbb".to_vec()));
}

#[tokio::test]
async fn test_failed_fetch_creates_no_directories() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());
	remote.insert(&rev(), "deep/nested/x.json", b"x".to_vec());
	remote.insert(&rev(), "top.json", b"t".to_vec());
	remote.fail_on("deep/nested/x.json");

	let result = syncer_for(target.path(), remote.clone())
		.await
		.pull(&rev(), SyncOptions::default())
		.await;

	assert!(matches!(result, Err(SyncError::Transfer { .. })));
	assert_eq!(read_build_file(target.path(), "c1", "top.json"), Some(b"t".to_vec()));
	assert!(!target.path().join("c1").join("deep").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pull_bounds_concurrent_fetches() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(PeakCatalog {
		inner: MemoryCatalog::new(),
		active: AtomicUsize::new(0),
		peak: AtomicUsize::new(0),
	});
	for i in 0..20 {
		remote.inner.insert(&rev(), &format!("f{}.json", i), vec![0u8; 16]);
	}

	let store = LocalStore::open(target.path()).await.unwrap();
	let outcome = Syncer::new(Arc::new(store), remote.clone())
		.with_concurrency(8)
		.pull(&rev(), SyncOptions::default())
		.await
		.unwrap();

	assert!(matches!(outcome, SyncOutcome::Synced(report) if report.transferred == 20));
	let peak = remote.peak.load(Ordering::SeqCst);
	assert!(peak <= 8, "peak concurrency was {}", peak);
	assert!(peak >= 1);
}

#[tokio::test]
async fn test_listing_urls_absent_for_memory_catalog() {
	let target = TempDir::new().unwrap();
	let remote = Arc::new(MemoryCatalog::new());
	remote.insert(&rev(), "a.json", b"a".to_vec());
	let syncer = syncer_for(target.path(), remote).await;

	if let SyncOutcome::Listed(files) = syncer.pull(&rev(), SyncOptions { list_only: true }).await.unwrap() {
		for record in &files {
			assert_eq!(syncer.remote_url(&rev(), record), None);
		}
	} else {
		panic!("expected a listing");
	}
}

// vim: ts=4
