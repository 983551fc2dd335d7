//! Thread-safe in-memory [`CredentialCache`] for tests and single-process use.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::{CacheEntry, CacheError, CacheKey, CredentialCache},
};

type CacheMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

/// Process-local cache; clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Returns the raw entry under `key`, live or not.
	pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
		self.0.read().get(key).cloned()
	}

	/// Number of stored entries, including ones past their deadline.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// True when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_at(&self, key: &CacheKey, now: OffsetDateTime) -> Option<AccessToken> {
		{
			let guard = self.0.read();

			match guard.get(key) {
				Some(entry) if entry.is_live_at(now) => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		// Lazily evict; re-check so a concurrent refresh is not dropped.
		let mut guard = self.0.write();

		if guard.get(key).is_some_and(|entry| !entry.is_live_at(now)) {
			guard.remove(key);
		}

		None
	}
}
impl CredentialCache for MemoryCache {
	fn get(&self, key: &CacheKey) -> Result<Option<AccessToken>, CacheError> {
		Ok(self.get_at(key, OffsetDateTime::now_utc()))
	}

	fn set(&self, key: &CacheKey, token: &AccessToken, ttl: Duration) -> Result<(), CacheError> {
		if !ttl.is_positive() {
			return Ok(());
		}

		let entry = CacheEntry::new(token.clone(), ttl, OffsetDateTime::now_utc());

		self.0.write().insert(key.clone(), entry);

		Ok(())
	}

	fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
		self.0.write().remove(key);

		Ok(())
	}
}
