//! # buildsync - Build Data Pull/Push
//!
//! Moves the build data of a commit (derived analysis files kept under
//! `.srclib-cache/<commit>/`) between a developer's checkout and a remote
//! catalog, with a bounded number of transfers in flight.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use buildsync::remote::HttpCatalog;
//! use buildsync::store::LocalStore;
//! use buildsync::sync::{SyncOptions, SyncOutcome, Syncer};
//! use buildsync::types::RevisionRef;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rev = RevisionRef::new("github.com/foo/bar", "2c4f…");
//!     let store = Arc::new(LocalStore::open(".srclib-cache").await?);
//!     let remote = Arc::new(HttpCatalog::new("https://sourcegraph.com/.api")?);
//!     if let SyncOutcome::Synced(report) =
//!         Syncer::new(store, remote).pull(&rev, SyncOptions::default()).await?
//!     {
//!         println!("Pulled {} files", report.transferred);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod remote;
pub mod revision;
pub mod store;
pub mod sync;
pub mod types;
pub mod util;
pub mod validation;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::{ConfigError, RemoteError, RevisionError, StoreError, SyncError};
pub use executor::BoundedExecutor;
pub use remote::{Listing, RemoteCatalog};
pub use store::{FileStore, Stat};
pub use sync::{SyncOptions, SyncOutcome, SyncReport, Syncer};
pub use types::{Direction, FileRecord, FileSet, RevisionRef, TransferTask};

// vim: ts=4
