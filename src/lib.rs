//! Renew-if-stale credential keeper: Kerberos ticket files guarded by a file lock, and OAuth2/ACS
//! access tokens served through a cache-aside, backoff-retried token endpoint client.

#![deny(clippy::all, missing_docs)]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod auth;
pub mod backoff;
pub mod cache;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod kerberos;
pub mod lock;
pub mod obs;
pub mod process;
pub mod zulu;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;
	pub use tempfile::TempDir;

	// self
	use crate::backoff::{BackoffPolicy, ExponentialBackoff, Sleeper};
	#[cfg(feature = "reqwest")]
	use crate::{
		cache::{CredentialCache, MemoryCache},
		endpoint::{EndpointConfig, TokenEndpoint},
		http::ReqwestHttpClient,
	};

	/// Token endpoint type alias used by reqwest-backed integration tests.
	#[cfg(feature = "reqwest")]
	pub type ReqwestTestEndpoint = TokenEndpoint<ReqwestHttpClient>;

	/// Sleeper that records requested waits instead of blocking the test thread.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingSleeper(Arc<Mutex<Vec<StdDuration>>>);
	impl RecordingSleeper {
		/// Returns every wait requested so far, in order.
		pub fn recorded(&self) -> Vec<StdDuration> {
			self.0.lock().clone()
		}
	}
	impl Sleeper for RecordingSleeper {
		fn sleep(&self, duration: StdDuration) {
			self.0.lock().push(duration);
		}
	}

	/// Builds a reqwest HTTP client with a short default timeout for mock servers.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = BlockingClient::builder()
			.timeout(StdDuration::from_secs(5))
			.build()
			.expect("Failed to build blocking Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Backoff with `attempts` tries and one-second nominal waits, meant to pair with a
	/// [`RecordingSleeper`].
	pub fn test_backoff(attempts: u32) -> Arc<dyn BackoffPolicy> {
		Arc::new(ExponentialBackoff::new(attempts).with_initial_delay(StdDuration::from_secs(1)))
	}

	/// Constructs a [`TokenEndpoint`] backed by an in-memory cache, a recording sleeper, and the
	/// reqwest transport used across integration tests.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_endpoint(
		config: EndpointConfig,
		attempts: u32,
	) -> (ReqwestTestEndpoint, MemoryCache, RecordingSleeper) {
		let cache_backend = MemoryCache::default();
		let cache: Arc<dyn CredentialCache> = Arc::new(cache_backend.clone());
		let sleeper = RecordingSleeper::default();
		let endpoint = TokenEndpoint::with_http_client(
			config,
			test_reqwest_http_client(),
			test_backoff(attempts),
			cache,
		)
		.with_sleeper(Arc::new(sleeper.clone()));

		(endpoint, cache_backend, sleeper)
	}

	/// Creates a private temporary directory removed when the handle drops.
	pub fn test_temp_dir() -> TempDir {
		tempfile::Builder::new()
			.prefix("credential_lifecycle_")
			.tempdir()
			.expect("Failed to create a temporary test directory.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		path::{Path, PathBuf},
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Error as ReqwestError, blocking::Client as BlockingClient};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
