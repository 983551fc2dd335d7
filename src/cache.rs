//! Cache contracts and built-in caches for issued access tokens.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::AccessToken};

/// Key-value store with per-entry expiration for access tokens.
///
/// Check-then-store is not atomic: two callers missing at once both fetch, and the last writer
/// wins. Backend failures are surfaced, never swallowed.
pub trait CredentialCache
where
	Self: Send + Sync,
{
	/// Returns the live entry under `key`, or `None` on a miss or after its deadline.
	fn get(&self, key: &CacheKey) -> Result<Option<AccessToken>, CacheError>;

	/// Stores `token` under `key` for `ttl`; a non-positive `ttl` stores nothing.
	fn set(&self, key: &CacheKey, token: &AccessToken, ttl: Duration) -> Result<(), CacheError>;

	/// Drops the entry under `key`, if any.
	fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}

/// Error type produced by [`CredentialCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Entry could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Cache key under which a token endpoint stores its tokens.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	const PREFIX: &'static str = "access_token_";

	/// Wraps an arbitrary key.
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// Derives `access_token_<sha256 hex of url>`.
	pub fn for_url(url: &Url) -> Self {
		Self(format!("{}{:x}", Self::PREFIX, Sha256::digest(url.as_str())))
	}

	/// Borrows the key string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for CacheKey {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Stored value plus the absolute instant after which it is treated as absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
	/// Cached token, persisted in its versioned form.
	pub value: AccessToken,
	/// Entry deadline (`stored_at + ttl`).
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl CacheEntry {
	/// Builds an entry stored at `now` that lives for `ttl`.
	pub fn new(value: AccessToken, ttl: Duration, now: OffsetDateTime) -> Self {
		Self { value, expires_at: now + ttl }
	}

	/// True while `instant` is strictly before the deadline.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn cache_key_is_prefixed_sha256_hex() {
		let url = Url::parse("https://auth.example.com/token").expect("Fixture URL should parse.");
		let key = CacheKey::for_url(&url);
		let hex = key
			.as_str()
			.strip_prefix("access_token_")
			.expect("Cache key should carry the access_token_ prefix.");

		assert_eq!(hex.len(), 64);
		assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
		assert_eq!(key, CacheKey::for_url(&url));

		let other = Url::parse("https://auth.example.com/token2").expect("Fixture URL should parse.");

		assert_ne!(key, CacheKey::for_url(&other));
	}

	#[test]
	fn cache_key_matches_known_digest() {
		let url = Url::parse("https://auth.example.com/token").expect("Fixture URL should parse.");

		assert_eq!(
			CacheKey::for_url(&url).as_str(),
			"access_token_27f4439380a643f3f500cfdf6e2ab9b707eeb6fe712e8b3d1dd726f2bb67100c"
		);
	}

	#[test]
	fn entry_deadline_is_exclusive() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::new("tok", now + Duration::hours(1)).expect("Fixture token.");
		let entry = CacheEntry::new(token, Duration::seconds(30), now);

		assert!(entry.is_live_at(now));
		assert!(entry.is_live_at(now + Duration::seconds(29)));
		assert!(!entry.is_live_at(now + Duration::seconds(30)));
	}

	#[test]
	fn entry_serializes_versioned_token() {
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::new("tok", now + Duration::hours(1)).expect("Fixture token.");
		let entry = CacheEntry::new(token, Duration::seconds(60), now);
		let payload = serde_json::to_value(&entry).expect("Entry should serialize.");

		assert_eq!(payload["value"]["version"], "1");
		assert_eq!(payload["value"]["token"], "tok");
		assert_eq!(payload["expires_at"], "2025-01-01T00:01:00Z");

		let restored: CacheEntry = serde_json::from_value(payload).expect("Entry should deserialize.");

		assert_eq!(restored, entry);
	}
}
