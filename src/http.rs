//! Transport seam for token endpoint calls.
//!
//! [`TokenHttpClient`] is the crate's only dependency on an HTTP stack. The token endpoint
//! builds a fully formed [`HttpRequest`] per attempt and hands it to the transport together with
//! the per-attempt timeout; the transport returns whatever response arrived (any status) or a
//! transport error when none did. Status classification and retries stay with the caller.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
pub use oauth2::{HttpRequest, HttpResponse};
// self
use crate::_prelude::*;

/// Blocking HTTP transport capable of executing token requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back endpoints shared
/// across threads.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted when no response was received.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request`, giving up after `timeout`.
	///
	/// Non-2xx responses are returned as `Ok`; only connection, TLS, or timeout failures are
	/// errors.
	fn execute(
		&self,
		request: HttpRequest,
		timeout: StdDuration,
	) -> Result<HttpResponse, Self::TransportError>;
}
/// Thin wrapper around reqwest's blocking client so shared HTTP behavior lives in one place.
///
/// Token endpoints return results directly, so [`ReqwestHttpClient::new`] disables redirect
/// following; apply the same policy to any client passed to [`ReqwestHttpClient::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub BlockingClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = BlockingClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing blocking client.
	pub fn with_client(client: BlockingClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<BlockingClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &BlockingClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = BlockingClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(
		&self,
		request: HttpRequest,
		timeout: StdDuration,
	) -> Result<HttpResponse, Self::TransportError> {
		let mut request = reqwest::blocking::Request::try_from(request)?;

		*request.timeout_mut() = Some(timeout);

		let response = self.0.execute(request)?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let mut response_new = HttpResponse::new(response.bytes()?.to_vec());

		*response_new.status_mut() = status;
		*response_new.headers_mut() = headers;

		Ok(response_new)
	}
}
