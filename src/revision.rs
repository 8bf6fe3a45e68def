//! Working-copy revision resolution
//!
//! Finds the repository root, the checked-out commit and the repository URI
//! (derived from the `origin` remote) by asking `git`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::RevisionError;
use crate::logging::*;
use crate::types::RevisionRef;

/// Values that bypass git lookups
#[derive(Debug, Clone, Default)]
pub struct RevisionOverrides {
	pub repo_uri: Option<String>,
	pub commit_id: Option<String>,
}

impl RevisionOverrides {
	fn is_complete(&self) -> bool {
		self.repo_uri.is_some() && self.commit_id.is_some()
	}
}

/// A resolved checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
	pub root_dir: PathBuf,
	pub repo_uri: String,
	pub commit_id: String,
}

impl WorkingCopy {
	pub fn revision(&self) -> RevisionRef {
		RevisionRef::new(self.repo_uri.clone(), self.commit_id.clone())
	}
}

/// Resolve the working copy containing `dir`
///
/// Without a git checkout, resolution only succeeds when both the repository
/// URI and the commit are overridden; `dir` is then used as the root.
pub async fn resolve(dir: &Path, overrides: RevisionOverrides) -> Result<WorkingCopy, RevisionError> {
	let root_dir = match git(dir, &["rev-parse", "--show-toplevel"]).await {
		Ok(top) => PathBuf::from(top),
		Err(e) if overrides.is_complete() => {
			debug!("Not a git checkout ({}), using {}", e, dir.display());
			dir.to_path_buf()
		}
		Err(e) => return Err(e),
	};

	let commit_id = match overrides.commit_id {
		Some(commit_id) => commit_id,
		None => git(&root_dir, &["rev-parse", "HEAD"]).await?,
	};

	let repo_uri = match overrides.repo_uri {
		Some(uri) => uri,
		None => {
			let remote = git(&root_dir, &["config", "--get", "remote.origin.url"]).await?;
			repo_uri_from_remote(&remote).ok_or_else(|| RevisionError::Unresolvable {
				what: "repository URI".to_string(),
				message: format!("cannot derive a URI from remote {:?}", remote),
			})?
		}
	};

	Ok(WorkingCopy { root_dir, repo_uri, commit_id })
}

/// Run git in `dir` and return its trimmed stdout
async fn git(dir: &Path, args: &[&str]) -> Result<String, RevisionError> {
	let output = Command::new("git")
		.args(args)
		.current_dir(dir)
		.stdin(Stdio::null())
		.output()
		.await
		.map_err(|source| RevisionError::SpawnFailed { dir: dir.to_path_buf(), source })?;

	if !output.status.success() {
		return Err(RevisionError::CommandFailed {
			command: args.join(" "),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}

	let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
	if stdout.is_empty() {
		return Err(RevisionError::Unresolvable {
			what: args.join(" "),
			message: "git printed nothing".to_string(),
		});
	}
	Ok(stdout)
}

/// Derive `host/owner/name` from a clone URL
///
/// Handles `scheme://[user@]host[:port]/path` and scp-like `user@host:path`.
/// Local paths have no host and yield `None`.
pub fn repo_uri_from_remote(remote: &str) -> Option<String> {
	let remote = remote.trim().trim_end_matches('/');
	let remote = remote.strip_suffix(".git").unwrap_or(remote);

	let (host, path) = if let Some((_, rest)) = remote.split_once("://") {
		let (authority, path) = rest.split_once('/')?;
		let host = authority.rsplit('@').next()?;
		let host = host.split(':').next()?;
		(host, path)
	} else if let Some((authority, path)) = remote.split_once(':') {
		if authority.contains('/') {
			return None;
		}
		(authority.rsplit('@').next()?, path)
	} else {
		return None;
	};

	let path = path.trim_matches('/');
	if host.is_empty() || path.is_empty() {
		return None;
	}
	Some(format!("{}/{}", host, path))
}


// vim: ts=4
