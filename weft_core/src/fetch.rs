use async_trait::async_trait;

use crate::WeftError;
use crate::WeftResult;

/// Transport for remote targets. The engine delegates any target classified
/// as remote to this collaborator wholesale; timeouts, redirects, and auth
/// are its responsibility, not the engine's.
#[async_trait]
pub trait Fetch: Send + Sync {
	/// Return the raw text behind a remote-resource identifier.
	async fn fetch(&self, target: &str) -> WeftResult<String>;
}

/// Whether a target names a remote resource (scheme-qualified identifier)
/// rather than a local path.
pub fn is_remote(target: &str) -> bool {
	let Some((scheme, rest)) = target.split_once("://") else {
		return false;
	};

	let mut chars = scheme.chars();
	let valid_scheme = chars.next().is_some_and(|first| first.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));

	valid_scheme && !rest.is_empty()
}

/// Default [`Fetch`] implementation over HTTP(S).
pub struct HttpFetch {
	client: reqwest::Client,
}

impl HttpFetch {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
		}
	}
}

impl Default for HttpFetch {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Fetch for HttpFetch {
	async fn fetch(&self, target: &str) -> WeftResult<String> {
		let failure = |err: reqwest::Error| {
			WeftError::RemoteFetch {
				target: target.to_string(),
				reason: err.to_string(),
			}
		};

		let response = self.client.get(target).send().await.map_err(failure)?;
		let response = response.error_for_status().map_err(failure)?;
		response.text().await.map_err(failure)
	}
}
