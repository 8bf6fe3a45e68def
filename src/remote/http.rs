//! HTTP catalog client
//!
//! Routes, relative to the configured base URL:
//!
//! - `GET  repos/<uri>@<rev>===<commit>/.build-data/` lists a revision
//! - `GET  repos/<uri>@<rev>===<commit>/.build-data/<path>` fetches a file
//! - `PUT  repos/<uri>@<rev>===<commit>/.build-data/<path>` uploads a file
//!
//! A 404 on the listing means "no build data", anything else outside 2xx is
//! an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{ByteStream, Listing, RemoteCatalog};
use crate::config::Config;
use crate::error::RemoteError;
use crate::logging::*;
use crate::types::{FileRecord, FileSet, RevisionRef};

const BUILD_DATA_SEGMENT: &str = ".build-data";

/// One entry of a listing response
#[derive(Debug, Deserialize)]
struct WireFileInfo {
	#[serde(rename = "Path")]
	path: String,
	#[serde(rename = "CommitID", default)]
	commit_id: Option<String>,
	#[serde(rename = "Size", default)]
	size: u64,
	#[serde(rename = "ModTime")]
	mod_time: DateTime<Utc>,
}

/// Catalog served over HTTP
#[derive(Debug, Clone)]
pub struct HttpCatalog {
	client: Client,
	base_url: Url,
	auth_token: Option<String>,
}

impl HttpCatalog {
	/// Create a client for `base_url` with default transport settings
	pub fn new(base_url: &str) -> Result<Self, RemoteError> {
		Self::with_client(Client::new(), base_url, None)
	}

	/// Create a client with a custom reqwest client
	pub fn with_client(
		client: Client,
		base_url: &str,
		auth_token: Option<String>,
	) -> Result<Self, RemoteError> {
		let base_url = Url::parse(base_url)?;
		if base_url.cannot_be_a_base() {
			return Err(RemoteError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
		}
		Ok(HttpCatalog { client, base_url, auth_token })
	}

	/// Build a client from configuration
	pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
		let mut builder = Client::builder().user_agent(config.user_agent.clone());
		if config.timeout_secs > 0 {
			builder = builder.timeout(Duration::from_secs(config.timeout_secs));
		}
		Self::with_client(builder.build()?, &config.remote_url, config.auth_token.clone())
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn build_data_url(&self, rev: &RevisionRef, path: Option<&str>) -> Result<Url, RemoteError> {
		let mut url = self.base_url.clone();
		{
			let mut segments = url
				.path_segments_mut()
				.map_err(|_| RemoteError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
			segments.pop_if_empty().push("repos");

			let mut repo_parts: Vec<&str> = rev.repo_uri.split('/').filter(|s| !s.is_empty()).collect();
			let last = repo_parts.pop().unwrap_or_default();
			segments.extend(repo_parts);
			segments.push(&format!("{}@{}==={}", last, rev.rev, rev.commit_id));
			segments.push(BUILD_DATA_SEGMENT);

			match path {
				Some(path) => {
					segments.extend(path.split('/').filter(|s| !s.is_empty()));
				}
				None => {
					segments.push("");
				}
			}
		}
		Ok(url)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.auth_token {
			Some(token) => request.bearer_auth(token),
			None => request,
		}
	}
}

fn status_error(status: StatusCode, url: &Url) -> RemoteError {
	RemoteError::Status { status: status.as_u16(), url: url.to_string() }
}

#[async_trait]
impl RemoteCatalog for HttpCatalog {
	async fn list(&self, rev: &RevisionRef) -> Result<Listing, RemoteError> {
		let url = self.build_data_url(rev, None)?;
		debug!("GET {}", url);
		let response = self.authorize(self.client.get(url.clone())).send().await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(Listing::NotFound),
			status if status.is_success() => {
				let body = response.bytes().await?;
				let entries: Vec<WireFileInfo> = serde_json::from_slice(&body)
					.map_err(|e| RemoteError::Decode { message: format!("{}: {}", url, e) })?;
				let set: FileSet = entries
					.into_iter()
					.map(|entry| FileRecord {
						path: entry.path,
						commit_id: entry.commit_id.unwrap_or_else(|| rev.commit_id.clone()),
						size: entry.size,
						modified: entry.mod_time,
					})
					.collect();
				Ok(Listing::Found(set))
			}
			status => Err(status_error(status, &url)),
		}
	}

	async fn fetch(&self, rev: &RevisionRef, path: &str) -> Result<ByteStream, RemoteError> {
		let url = self.build_data_url(rev, Some(path))?;
		debug!("GET {}", url);
		let response = self.authorize(self.client.get(url.clone())).send().await?;

		match response.status() {
			StatusCode::NOT_FOUND => Err(RemoteError::NoSuchFile { path: path.to_string() }),
			status if status.is_success() => Ok(response
				.bytes_stream()
				.map_ok(|chunk| chunk.to_vec())
				.map_err(RemoteError::from)
				.boxed()),
			status => Err(status_error(status, &url)),
		}
	}

	async fn store(
		&self,
		rev: &RevisionRef,
		path: &str,
		body: ByteStream,
		size: u64,
	) -> Result<(), RemoteError> {
		let url = self.build_data_url(rev, Some(path))?;
		debug!("PUT {} ({} bytes)", url, size);
		let request = self
			.client
			.put(url.clone())
			.header(CONTENT_LENGTH, size)
			.body(Body::wrap_stream(body));
		let response = self.authorize(request).send().await?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(status_error(response.status(), &url))
		}
	}

	fn file_url(&self, rev: &RevisionRef, path: &str) -> Option<String> {
		self.build_data_url(rev, Some(path)).ok().map(|url| url.to_string())
	}
}


// vim: ts=4
