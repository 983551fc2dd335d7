//! File-backed [`CredentialCache`] shared by every process pointing at the same path.
//!
//! Reads always go to disk so a token stored by another process is visible immediately. Writes
//! take `<path>.lock` around the read-modify-write and publish through a randomly named temp file
//! plus rename, so readers never observe a half-written snapshot and concurrent writers for
//! different keys keep each other's entries. Snapshots are created owner-only (`0600` on Unix)
//! since they hold raw bearer tokens.

// std
#[cfg(unix)] use std::os::unix::fs::{DirBuilderExt, MetadataExt};
use std::{
	fs,
	io::{ErrorKind, Write},
};
// crates.io
use tempfile::NamedTempFile;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::{CacheEntry, CacheError, CacheKey, CredentialCache},
	lock::{self, FileLock},
};

type Snapshot = BTreeMap<CacheKey, CacheEntry>;

/// Persists cache entries as a JSON object keyed by [`CacheKey`].
#[derive(Clone, Debug)]
pub struct FileCache {
	path: PathBuf,
	lock: FileLock,
}
impl FileCache {
	const DEFAULT_DIR_PREFIX: &'static str = "credential-lifecycle";
	const DEFAULT_FILE_NAME: &'static str = "cache.json";
	const LOCK_TIMEOUT: StdDuration = StdDuration::from_secs(5);

	/// Opens (or lazily creates) a cache at `path`, creating missing parent directories.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let lock = FileLock::new(lock::lock_path_for(&path), Self::LOCK_TIMEOUT)
			.with_poll_interval(StdDuration::from_millis(10));

		Ok(Self { path, lock })
	}

	/// Opens the calling user's cache under the system temp directory.
	///
	/// On Unix the cache lives in `<temp>/credential-lifecycle-<uid>/`, a `0700` directory that
	/// must be owned by the caller; a directory planted by another user (or a symlink in its place)
	/// is rejected instead of reused.
	pub fn in_temp_dir() -> Result<Self, CacheError> {
		let dir = Self::private_dir(&std::env::temp_dir())?;

		Self::open(dir.join(Self::DEFAULT_FILE_NAME))
	}

	/// Cache file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	#[cfg(unix)]
	fn private_dir(base: &Path) -> Result<PathBuf, CacheError> {
		let uid = current_uid()?;
		let dir = base.join(format!("{}-{uid}", Self::DEFAULT_DIR_PREFIX));

		match fs::DirBuilder::new().mode(0o700).create(&dir) {
			Ok(()) => {},
			Err(e) if e.kind() == ErrorKind::AlreadyExists => {},
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to create cache directory {}: {e}", dir.display()),
				}),
		}

		ensure_private_dir(&dir, uid)?;

		Ok(dir)
	}

	#[cfg(not(unix))]
	fn private_dir(base: &Path) -> Result<PathBuf, CacheError> {
		let dir = base.join(Self::DEFAULT_DIR_PREFIX);

		fs::create_dir_all(&dir).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", dir.display()),
		})?;

		Ok(dir)
	}

	fn load_snapshot(&self) -> Result<Snapshot, CacheError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::new()),
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(Snapshot::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
			message: format!("Failed to parse {}: {e}", self.path.display()),
		})
	}

	fn persist(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| CacheError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
		let mut file = NamedTempFile::new_in(parent).map_err(|e| CacheError::Backend {
			message: format!("Failed to create a temp file in {}: {e}", parent.display()),
		})?;

		file.write_all(&serialized).map_err(|e| CacheError::Backend {
			message: format!("Failed to write {}: {e}", file.path().display()),
		})?;
		file.as_file().sync_all().map_err(|e| CacheError::Backend {
			message: format!("Failed to sync {}: {e}", file.path().display()),
		})?;
		file.persist(&self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {}", self.path.display(), e.error),
		})?;

		Ok(())
	}

	fn mutate<F>(&self, f: F) -> Result<(), CacheError>
	where
		F: FnOnce(&mut Snapshot),
	{
		let _guard = self
			.lock
			.acquire()
			.map_err(|e| CacheError::Backend { message: e.to_string() })?;
		let mut snapshot = self.load_snapshot()?;
		let now = OffsetDateTime::now_utc();

		snapshot.retain(|_, entry| entry.is_live_at(now));
		f(&mut snapshot);

		self.persist(&snapshot)
	}
}
impl CredentialCache for FileCache {
	fn get(&self, key: &CacheKey) -> Result<Option<AccessToken>, CacheError> {
		let now = OffsetDateTime::now_utc();

		Ok(self
			.load_snapshot()?
			.remove(key)
			.filter(|entry| entry.is_live_at(now))
			.map(|entry| entry.value))
	}

	fn set(&self, key: &CacheKey, token: &AccessToken, ttl: Duration) -> Result<(), CacheError> {
		if !ttl.is_positive() {
			return Ok(());
		}

		let entry = CacheEntry::new(token.clone(), ttl, OffsetDateTime::now_utc());

		self.mutate(|snapshot| {
			snapshot.insert(key.clone(), entry);
		})
	}

	fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
		self.mutate(|snapshot| {
			snapshot.remove(key);
		})
	}
}

#[cfg(unix)]
fn current_uid() -> Result<u32, CacheError> {
	// Anonymous temp files are owned by the effective uid.
	let scratch = tempfile::tempfile().map_err(|e| CacheError::Backend {
		message: format!("Failed to determine the current user: {e}"),
	})?;
	let metadata = scratch.metadata().map_err(|e| CacheError::Backend {
		message: format!("Failed to determine the current user: {e}"),
	})?;

	Ok(metadata.uid())
}

#[cfg(unix)]
fn ensure_private_dir(dir: &Path, uid: u32) -> Result<(), CacheError> {
	let metadata = fs::symlink_metadata(dir).map_err(|e| CacheError::Backend {
		message: format!("Failed to inspect cache directory {}: {e}", dir.display()),
	})?;

	if !metadata.is_dir() || metadata.uid() != uid || metadata.mode() & 0o077 != 0 {
		return Err(CacheError::Backend {
			message: format!(
				"Cache directory {} must be a directory owned by uid {uid} with mode 0700.",
				dir.display()
			),
		});
	}

	Ok(())
}
