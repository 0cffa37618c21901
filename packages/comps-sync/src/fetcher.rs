use std::time::Duration;

use reqwest::{
	Client, StatusCode,
	header::{ETAG, HeaderMap, HeaderName, IF_NONE_MATCH},
};
use serde_json::{Map, Value};

use crate::{BoxFuture, Error, Result};
use comps_domain::PropertySnapshot;

#[derive(Debug)]
pub enum FetchOutcome {
	NotModified,
	Changed { version: String, snapshot: PropertySnapshot },
}

/// Conditional read of the polling endpoint.
pub trait SnapshotFetcher
where
	Self: Send + Sync,
{
	fn target(&self) -> &str;

	fn fetch<'a>(&'a self, version_tag: Option<&'a str>) -> BoxFuture<'a, Result<FetchOutcome>>;
}

pub struct HttpFetcher {
	client: Client,
	endpoint: String,
	headers: HeaderMap,
}
impl HttpFetcher {
	pub fn new(cfg: &comps_config::Polling) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = default_headers(&cfg.default_headers)?;

		Ok(Self { client, endpoint: cfg.endpoint.clone(), headers })
	}

	fn transport(&self, err: reqwest::Error) -> Error {
		Error::TransportFailure { target: self.endpoint.clone(), message: err.to_string() }
	}

	fn invalid(&self, message: impl Into<String>) -> Error {
		Error::InvalidResponse { target: self.endpoint.clone(), message: message.into() }
	}
}
impl SnapshotFetcher for HttpFetcher {
	fn target(&self) -> &str {
		&self.endpoint
	}

	fn fetch<'a>(&'a self, version_tag: Option<&'a str>) -> BoxFuture<'a, Result<FetchOutcome>> {
		Box::pin(async move {
			let mut request = self.client.get(&self.endpoint).headers(self.headers.clone());

			if let Some(tag) = version_tag {
				request = request.header(IF_NONE_MATCH, quote_etag(tag));
			}

			let res = request.send().await.map_err(|err| self.transport(err))?;

			if res.status() == StatusCode::NOT_MODIFIED {
				return Ok(FetchOutcome::NotModified);
			}

			let res = res.error_for_status().map_err(|err| self.transport(err))?;
			let header_version = res
				.headers()
				.get(ETAG)
				.and_then(|value| value.to_str().ok())
				.map(unquote_etag)
				.filter(|tag| !tag.is_empty());
			let snapshot: PropertySnapshot = res
				.json()
				.await
				.map_err(|err| self.invalid(format!("Snapshot body is not valid JSON: {err}.")))?;
			let version = match header_version {
				Some(version) => version,
				None if !snapshot.version.trim().is_empty() => snapshot.version.clone(),
				None => return Err(self.invalid("Response carries no version tag.")),
			};

			Ok(FetchOutcome::Changed { version, snapshot })
		})
	}
}

pub fn default_headers(default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub fn quote_etag(tag: &str) -> String {
	format!("\"{tag}\"")
}

/// Strips the weak prefix and surrounding quotes from an `ETag` header value.
pub fn unquote_etag(raw: &str) -> String {
	let trimmed = raw.trim();
	let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);

	trimmed.trim_matches('"').to_string()
}
