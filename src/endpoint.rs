//! Token endpoint client: cache-aside lookup in front of a backoff-retried fetch.
//!
//! [`TokenEndpoint::get_token`] consults the credential cache first and only calls the remote
//! endpoint on a miss. Every fetch walks a fresh [`BackoffSchedule`]: transport failures and
//! non-200 responses are retried after the scheduled wait (never after the last attempt), while
//! a 200 whose body cannot become a token fails immediately with
//! [`Error::MalformedResponse`]. Freshly fetched tokens are cached for their remaining lifetime
//! minus the configured safety margin.

pub mod config;
pub mod flavor;

pub use config::*;
pub use flavor::*;

// crates.io
use oauth2::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	backoff::{BackoffPolicy, BackoffSchedule, Sleeper, ThreadSleeper},
	cache::{CacheKey, CredentialCache},
	error::RequestFailure,
	http::{HttpResponse, TokenHttpClient},
	obs::{self, CredentialSpan, Operation, Outcome, obs_event},
};
#[cfg(feature = "reqwest")]
use crate::{backoff::ExponentialBackoff, cache::FileCache, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Token endpoint specialized for the crate's default reqwest transport.
pub type ReqwestTokenEndpoint = TokenEndpoint<ReqwestHttpClient>;

/// Client for one token endpoint.
///
/// The endpoint owns its configuration and shares the transport, backoff policy, cache, and
/// sleeper through `Arc`s, so a single instance can serve many threads.
pub struct TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	config: EndpointConfig,
	http_client: Arc<C>,
	flavor: Arc<dyn TokenFlavor>,
	backoff: Arc<dyn BackoffPolicy>,
	cache: Arc<dyn CredentialCache>,
	sleeper: Arc<dyn Sleeper>,
	cache_key: CacheKey,
}
impl<C> TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an endpoint over caller-provided collaborators.
	pub fn with_http_client(
		config: EndpointConfig,
		http_client: impl Into<Arc<C>>,
		backoff: Arc<dyn BackoffPolicy>,
		cache: Arc<dyn CredentialCache>,
	) -> Self {
		let cache_key = CacheKey::for_url(&config.url);

		Self {
			flavor: flavor::flavor_for(config.kind),
			config,
			http_client: http_client.into(),
			backoff,
			cache,
			sleeper: Arc::new(ThreadSleeper),
			cache_key,
		}
	}

	/// Replaces the sleeper used between attempts.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = sleeper;

		self
	}

	/// Replaces the backoff policy.
	pub fn with_backoff(mut self, backoff: Arc<dyn BackoffPolicy>) -> Self {
		self.backoff = backoff;

		self
	}

	/// Replaces the credential cache.
	pub fn with_cache(mut self, cache: Arc<dyn CredentialCache>) -> Self {
		self.cache = cache;

		self
	}

	/// Endpoint configuration.
	pub fn config(&self) -> &EndpointConfig {
		&self.config
	}

	/// Key this endpoint's tokens are cached under.
	pub fn cache_key(&self) -> &CacheKey {
		&self.cache_key
	}

	/// Returns a valid token, from the cache when possible.
	pub fn get_token(&self) -> Result<AccessToken> {
		self.get_token_with_expiry(None)
	}

	/// Like [`get_token`](Self::get_token), but a freshly fetched token gets `expires_at_override`
	/// as its expiry before it is cached.
	///
	/// The override only applies on a cache miss with caching enabled; cached tokens and
	/// uncached fetches are returned as issued.
	pub fn get_token_with_expiry(
		&self,
		expires_at_override: Option<OffsetDateTime>,
	) -> Result<AccessToken> {
		const OPERATION: Operation = Operation::TokenFetch;

		let _span = CredentialSpan::new(OPERATION, "get_token").entered();

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = self.cache_aside(expires_at_override);

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(e) => {
				obs_event!(error, error = %e, "Failed to obtain an access token.");
				obs::record_outcome(OPERATION, Outcome::Failure);
			},
		}

		result
	}

	fn cache_aside(&self, expires_at_override: Option<OffsetDateTime>) -> Result<AccessToken> {
		if !self.config.use_cache {
			obs_event!(debug, "Cache disabled; fetching a new access token.");

			return self.fetch();
		}
		if let Some(token) = self.cache.get(&self.cache_key)? {
			obs_event!(debug, cache_key = %self.cache_key, "Cache hit.");
			obs::record_outcome(Operation::TokenFetch, Outcome::CacheHit);

			return Ok(token);
		}

		obs_event!(debug, cache_key = %self.cache_key, "Cache miss.");
		obs::record_outcome(Operation::TokenFetch, Outcome::CacheMiss);

		let mut token = self.fetch()?;

		if let Some(instant) = expires_at_override {
			token.set_expires_at(instant);
		}

		let ttl = token.expires_in() - self.config.cache_margin;

		self.cache.set(&self.cache_key, &token, ttl)?;

		Ok(token)
	}

	fn fetch(&self) -> Result<AccessToken> {
		let response = self.request_with_retry()?;
		let token = self.flavor.parse_response(response.body(), OffsetDateTime::now_utc())?;

		obs_event!(info, token = %token, "Obtained a new access token.");

		Ok(token)
	}

	fn request_with_retry(&self) -> Result<HttpResponse> {
		let mut schedule = BackoffSchedule::new(self.backoff.as_ref());
		let mut last_error = RequestFailure::NotAttempted;

		while let Some(wait) = schedule.next() {
			let request = self.flavor.build_request(&self.config)?;

			match self.http_client.execute(request, self.config.timeout) {
				Ok(response) if response.status() == StatusCode::OK => return Ok(response),
				Ok(response) => last_error = RequestFailure::Status { code: response.status().as_u16() },
				Err(e) => last_error = RequestFailure::Transport { message: e.to_string() },
			}

			obs_event!(
				warn,
				attempt = schedule.counter(),
				total = schedule.total(),
				error = %last_error,
				"Token request attempt failed."
			);

			if schedule.is_last() {
				obs_event!(warn, "This was the last attempt; giving up.");
			} else {
				obs_event!(info, wait = ?wait, "Sleeping before retrying the token request.");
				self.sleeper.sleep(wait);
			}
		}

		Err(Error::TokenRequestFailed { attempts: schedule.counter(), last_error })
	}
}
#[cfg(feature = "reqwest")]
impl TokenEndpoint<ReqwestHttpClient> {
	/// Creates an endpoint with the default collaborators: a redirect-free reqwest transport,
	/// five-attempt exponential backoff, and the calling user's private file cache
	/// ([`FileCache::in_temp_dir`]).
	pub fn new(config: EndpointConfig) -> Result<Self> {
		Ok(Self::with_http_client(
			config,
			ReqwestHttpClient::new()?,
			Arc::new(ExponentialBackoff::default()),
			Arc::new(FileCache::in_temp_dir()?),
		))
	}
}
impl<C> Debug for TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenEndpoint")
			.field("kind", &self.config.kind)
			.field("url", &self.config.url.as_str())
			.field("use_cache", &self.config.use_cache)
			.field("cache_key", &self.cache_key)
			.finish()
	}
}
