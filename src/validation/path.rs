//! Path validation functions
//!
//! Store paths arrive from two untrusted places: remote listings and the
//! names of directories under the local cache. Both are checked here before
//! they are joined onto the cache root, so a listing can never address a
//! file outside of it.

use std::path::{Component, Path, PathBuf};

use super::ValidationError;

/// Check if a path is safe (no parent directory references)
pub fn is_path_safe(path: &Path) -> bool {
	!path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Validate a path is safe
pub fn validate_path_safe(path: &Path) -> Result<(), ValidationError> {
	if !is_path_safe(path) {
		return Err(ValidationError::PathError(format!(
			"Path {:?} contains parent directory reference (..)",
			path
		)));
	}
	Ok(())
}

/// Validate that path is relative (not absolute)
pub fn validate_path_relative(path: &Path) -> Result<(), ValidationError> {
	if path.is_absolute() || path.has_root() {
		return Err(ValidationError::PathError(format!(
			"Path must be relative, got absolute path: {:?}",
			path
		)));
	}
	Ok(())
}

/// Turn a build-data path into a relative path that stays under its root
///
/// `.` components are dropped. Empty paths, absolute paths and paths with
/// `..` are rejected.
pub fn normalize_relative(path: &str) -> Result<PathBuf, ValidationError> {
	if path.is_empty() {
		return Err(ValidationError::PathError("Path must not be empty".to_string()));
	}
	let path = Path::new(path);
	validate_path_relative(path)?;
	validate_path_safe(path)?;

	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::Normal(part) => normalized.push(part),
			Component::CurDir => {}
			_ => {
				return Err(ValidationError::PathError(format!(
					"Path {:?} has a non-relative component",
					path
				)))
			}
		}
	}

	if normalized.as_os_str().is_empty() {
		return Err(ValidationError::PathError(format!("Path {:?} names no file", path)));
	}
	Ok(normalized)
}

/// Validate a commit identifier used as the first level of the store layout
pub fn validate_commit_id(commit_id: &str) -> Result<(), ValidationError> {
	if commit_id.is_empty() {
		return Err(ValidationError::PathError("Commit ID must not be empty".to_string()));
	}
	if commit_id == "." || commit_id == ".." || commit_id.contains(['/', '\\']) {
		return Err(ValidationError::PathError(format!(
			"Commit ID {:?} is not a single path segment",
			commit_id
		)));
	}
	Ok(())
}
