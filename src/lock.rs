//! Path-keyed advisory file lock with a bounded wait.
//!
//! The lock is an exclusive OS lock on an open handle of the lock file, so it serializes both
//! separate processes and separate handles inside one process. Dropping the guard releases it.

// std
#[cfg(unix)] use std::os::unix::fs::OpenOptionsExt;
use std::{
	fs::{File, OpenOptions, TryLockError},
	thread,
	time::Instant,
};
// self
use crate::_prelude::*;

/// Returns `<path>.lock`, the conventional lock file guarding `path`.
pub fn lock_path_for(path: &Path) -> PathBuf {
	let mut raw = path.as_os_str().to_owned();

	raw.push(".lock");

	PathBuf::from(raw)
}

/// Acquisition policy for [`FileLock`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLock {
	path: PathBuf,
	timeout: StdDuration,
	poll_interval: StdDuration,
}
impl FileLock {
	const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);

	/// Creates a lock on `path` that gives up after `timeout`.
	pub fn new(path: impl Into<PathBuf>, timeout: StdDuration) -> Self {
		Self { path: path.into(), timeout, poll_interval: Self::DEFAULT_POLL_INTERVAL }
	}

	/// Overrides how often a contended lock is retried.
	pub fn with_poll_interval(mut self, interval: StdDuration) -> Self {
		self.poll_interval = interval;

		self
	}

	/// Lock file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Blocks until the lock is held or the timeout elapses.
	///
	/// Creates the lock file (owner-only on Unix) when missing. Fails with [`Error::LockTimeout`]
	/// when another holder keeps the lock past the bound.
	pub fn acquire(&self) -> Result<FileLockGuard> {
		let mut options = OpenOptions::new();

		options.create(true).truncate(false).write(true);
		#[cfg(unix)]
		options.mode(0o600);

		let file = options.open(&self.path).map_err(|e| Error::io(&self.path, e))?;
		let started = Instant::now();

		loop {
			match file.try_lock() {
				Ok(()) => return Ok(FileLockGuard { file, path: self.path.clone() }),
				Err(TryLockError::WouldBlock) => {},
				Err(TryLockError::Error(e)) => return Err(Error::io(&self.path, e)),
			}

			let elapsed = started.elapsed();

			if elapsed >= self.timeout {
				return Err(Error::LockTimeout { path: self.path.clone(), timeout: self.timeout });
			}

			thread::sleep(self.poll_interval.min(self.timeout - elapsed));
		}
	}
}

/// RAII guard returned by [`FileLock::acquire`].
pub struct FileLockGuard {
	file: File,
	path: PathBuf,
}
impl FileLockGuard {
	/// Lock file path.
	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl Drop for FileLockGuard {
	fn drop(&mut self) {
		// Closing the handle releases the lock as well.
		let _ = self.file.unlock();
	}
}
impl Debug for FileLockGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileLockGuard").field("path", &self.path).finish()
	}
}
