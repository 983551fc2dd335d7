//! Kerberos ticket-file lifecycle: staleness checks, lock-guarded renewal, pointer publication.
//!
//! A ticket file is stale when it is missing, empty, or older than the configured age limit.
//! Renewal runs the ticket-granting command (`kinit -k -t <keytab> -c <ticket> <principal>`)
//! while holding the lock file, so concurrent processes sharing a ticket path issue at most one
//! ticket per staleness window.

pub mod config;
pub mod sink;

pub use config::*;
pub use sink::*;

// std
use std::{ffi::OsString, fs, io::ErrorKind, time::SystemTime};
// self
use crate::{
	_prelude::*,
	lock::FileLock,
	obs::{self, CredentialSpan, Operation, Outcome, obs_event},
	process::{CommandRunner, SystemCommandRunner},
};

/// What [`TicketManager::renew_if_needed`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenewalOutcome {
	/// The ticket was fresh; nothing ran.
	Fresh,
	/// This call ran the ticket-granting command.
	Renewed,
	/// Another holder of the lock renewed the ticket while this call waited.
	RenewedByPeer,
}

/// Keeps one ticket file fresh.
pub struct TicketManager {
	config: TicketConfig,
	runner: Arc<dyn CommandRunner>,
	sink: Arc<dyn CredentialSink>,
}
impl TicketManager {
	/// Creates a manager that runs the real ticket-granting program and publishes through `sink`.
	pub fn new(config: TicketConfig, sink: Arc<dyn CredentialSink>) -> Self {
		Self { config, runner: Arc::new(SystemCommandRunner), sink }
	}

	/// Replaces the subprocess runner.
	pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
		self.runner = runner;

		self
	}

	/// Manager configuration.
	pub fn config(&self) -> &TicketConfig {
		&self.config
	}

	/// Pointer value published under [`KRB5CCNAME`]: `FILE:<ticket path>`.
	pub fn credential_pointer(&self) -> String {
		format!("FILE:{}", self.config.ticket_path.display())
	}

	/// True when the ticket file is missing, empty, or older than the age limit.
	pub fn needs_renewal(&self) -> bool {
		ticket_is_stale(&self.config.ticket_path, self.config.age_limit, SystemTime::now())
	}

	/// Renews the ticket when stale.
	///
	/// Fails with [`Error::LockTimeout`] when the lock stays contended past its bound (the ticket
	/// is left untouched) and with [`Error::CredentialIssuanceFailed`] when the command writes
	/// any error output. The lock is released on every path.
	pub fn renew_if_needed(&self) -> Result<RenewalOutcome> {
		const OPERATION: Operation = Operation::TicketRenewal;

		if !self.needs_renewal() {
			obs_event!(debug, ticket = %self.config.ticket_path.display(), "Ticket is fresh.");

			return Ok(RenewalOutcome::Fresh);
		}

		let _span = CredentialSpan::new(OPERATION, "renew_if_needed").entered();

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = self.renew_locked();

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(e) => {
				obs_event!(error, error = %e, "Ticket renewal failed.");
				obs::record_outcome(OPERATION, Outcome::Failure);
			},
		}

		result
	}

	/// Renews the ticket when stale, then publishes the credential pointer whatever the outcome,
	/// so a process inheriting a fresh ticket still points its Kerberos library at it.
	pub fn ensure_ticket(&self) -> Result<RenewalOutcome> {
		let outcome = self.renew_if_needed()?;

		if outcome == RenewalOutcome::Fresh {
			self.publish_pointer();
		}

		Ok(outcome)
	}

	/// Removes the ticket and lock files; missing files are fine.
	pub fn cleanup(&self) -> Result<()> {
		for path in [&self.config.ticket_path, &self.config.lock_path] {
			match fs::remove_file(path) {
				Ok(()) => {},
				Err(e) if e.kind() == ErrorKind::NotFound => {},
				Err(e) => return Err(Error::io(path, e)),
			}
		}

		Ok(())
	}

	fn renew_locked(&self) -> Result<RenewalOutcome> {
		let lock = FileLock::new(&self.config.lock_path, self.config.lock_timeout)
			.with_poll_interval(self.config.lock_poll_interval);
		let _guard = lock.acquire()?;

		obs_event!(debug, lock = %self.config.lock_path.display(), "Acquired the ticket lock.");

		if !self.needs_renewal() {
			obs_event!(debug, "Ticket was renewed by another holder of the lock.");
			self.publish_pointer();

			return Ok(RenewalOutcome::RenewedByPeer);
		}

		let output = self
			.runner
			.run(&self.config.program, &self.kinit_args())
			.map_err(|e| Error::io(&self.config.program, e))?;

		if !output.stderr.is_empty() {
			return Err(Error::CredentialIssuanceFailed { stderr: output.stderr });
		}

		obs_event!(info, ticket = %self.config.ticket_path.display(), "Renewed the Kerberos ticket.");
		self.publish_pointer();

		Ok(RenewalOutcome::Renewed)
	}

	fn kinit_args(&self) -> Vec<OsString> {
		vec![
			OsString::from("-k"),
			OsString::from("-t"),
			self.config.keytab_path.clone().into_os_string(),
			OsString::from("-c"),
			self.config.ticket_path.clone().into_os_string(),
			OsString::from(&self.config.principal),
		]
	}

	fn publish_pointer(&self) {
		self.sink.publish(KRB5CCNAME, &self.credential_pointer());
	}
}
impl Debug for TicketManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TicketManager").field("config", &self.config).finish()
	}
}

fn ticket_is_stale(path: &Path, age_limit: StdDuration, now: SystemTime) -> bool {
	let Ok(metadata) = fs::metadata(path) else {
		return true;
	};

	if !metadata.is_file() || metadata.len() == 0 {
		return true;
	}

	match metadata.modified() {
		// A modification time in the future counts as age zero.
		Ok(modified) => now.duration_since(modified).unwrap_or_default() > age_limit,
		Err(_) => true,
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::fs::File;
	// self
	use super::*;
	use crate::_preludet::test_temp_dir;

	#[test]
	fn staleness_covers_missing_empty_and_old_files() {
		let dir = test_temp_dir();
		let path = dir.path().join("krb5cc_staleness");
		let limit = StdDuration::from_secs(300);
		let now = SystemTime::now();

		assert!(ticket_is_stale(&path, limit, now));

		File::create(&path).expect("Failed to create empty ticket fixture.");

		assert!(ticket_is_stale(&path, limit, now));

		fs::write(&path, b"ticket").expect("Failed to write ticket fixture.");

		assert!(!ticket_is_stale(&path, limit, SystemTime::now()));
		assert!(!ticket_is_stale(&path, limit, SystemTime::now() + StdDuration::from_secs(299)));
		assert!(ticket_is_stale(&path, limit, SystemTime::now() + StdDuration::from_secs(301)));
	}

	#[test]
	fn directories_are_not_tickets() {
		let dir = test_temp_dir();

		assert!(ticket_is_stale(dir.path(), StdDuration::from_secs(300), SystemTime::now()));
	}
}
