//! Remote build-data catalog
//!
//! The syncer only talks to the remote through [`RemoteCatalog`], a value
//! that is built once and handed in, so tests can swap in
//! [`MemoryCatalog`] for the HTTP client.

pub mod http;
pub mod memory;

pub use self::http::HttpCatalog;
pub use self::memory::MemoryCatalog;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::AsyncReadExt;

use crate::error::RemoteError;
use crate::store::ReadStream;
use crate::types::{FileSet, RevisionRef};

/// Chunk size used when turning a local reader into an upload body
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Streamed file contents, one chunk at a time
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, RemoteError>>;

/// Outcome of listing a revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
	/// The remote knows this revision; the set may still be empty
	Found(FileSet),
	/// The remote has no build data for this revision
	NotFound,
}

/// Remote store of build data, addressed by revision and relative path
///
/// `fetch` and `store` are independent per call: a failing transfer must not
/// poison the ones running next to it.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
	/// List the files known for a revision
	async fn list(&self, rev: &RevisionRef) -> Result<Listing, RemoteError>;

	/// Stream the contents of one file
	async fn fetch(&self, rev: &RevisionRef, path: &str) -> Result<ByteStream, RemoteError>;

	/// Upload one file; `size` is the length of `body` in bytes
	async fn store(
		&self,
		rev: &RevisionRef,
		path: &str,
		body: ByteStream,
		size: u64,
	) -> Result<(), RemoteError>;

	/// Address a user can fetch the file from, if the catalog has one
	fn file_url(&self, _rev: &RevisionRef, _path: &str) -> Option<String> {
		None
	}
}

/// Turn a local reader into an upload body without buffering the whole file
pub fn read_stream(reader: ReadStream) -> ByteStream {
	stream::try_unfold(reader, |mut reader| async move {
		let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
		let n = reader.read(&mut buf).await?;
		let chunk = if n == 0 {
			None
		} else {
			buf.truncate(n);
			Some((buf, reader))
		};
		Ok::<_, RemoteError>(chunk)
	})
	.boxed()
}


// vim: ts=4
