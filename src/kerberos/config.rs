//! Ticket manager configuration and its validating builder.

// self
use crate::{_prelude::*, error::ConfigError, lock};

/// Immutable configuration owned by one [`TicketManager`](crate::kerberos::TicketManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TicketConfigBuilder")]
pub struct TicketConfig {
	/// Keytab holding the principal's keys.
	pub keytab_path: PathBuf,
	/// Principal the ticket is issued for.
	pub principal: String,
	/// Ticket cache file written by the ticket-granting command.
	pub ticket_path: PathBuf,
	/// Lock file serializing renewals across processes.
	pub lock_path: PathBuf,
	/// Tickets older than this are renewed.
	pub age_limit: StdDuration,
	/// Bound on the wait for the renewal lock.
	pub lock_timeout: StdDuration,
	/// Retry interval while the renewal lock is contended.
	pub lock_poll_interval: StdDuration,
	/// Ticket-granting program.
	pub program: PathBuf,
}
impl TicketConfig {
	/// Default ticket age limit.
	pub const DEFAULT_AGE_LIMIT: StdDuration = StdDuration::from_secs(300);
	/// Default bound on the renewal lock wait.
	pub const DEFAULT_LOCK_TIMEOUT: StdDuration = StdDuration::from_secs(10);
	/// Default lock poll interval.
	pub const DEFAULT_LOCK_POLL_INTERVAL: StdDuration = StdDuration::from_millis(50);
	/// Default ticket-granting program.
	pub const DEFAULT_PROGRAM: &'static str = "kinit";

	/// Starts an empty builder.
	pub fn builder() -> TicketConfigBuilder {
		TicketConfigBuilder::default()
	}
}

/// Builder for [`TicketConfig`] values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketConfigBuilder {
	/// Keytab path.
	#[serde(default)]
	pub keytab_path: Option<PathBuf>,
	/// Principal name.
	#[serde(default)]
	pub principal: Option<String>,
	/// Ticket cache file path.
	#[serde(default)]
	pub ticket_path: Option<PathBuf>,
	/// Lock file path; defaults to the ticket path plus `.lock`.
	#[serde(default)]
	pub lock_path: Option<PathBuf>,
	/// Ticket age limit.
	#[serde(default = "default_age_limit")]
	pub age_limit: StdDuration,
	/// Lock wait bound.
	#[serde(default = "default_lock_timeout")]
	pub lock_timeout: StdDuration,
	/// Lock poll interval.
	#[serde(default = "default_lock_poll_interval")]
	pub lock_poll_interval: StdDuration,
	/// Ticket-granting program.
	#[serde(default = "default_program")]
	pub program: PathBuf,
}
impl TicketConfigBuilder {
	/// Sets the keytab path.
	pub fn keytab_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.keytab_path = Some(path.into());

		self
	}

	/// Sets the principal.
	pub fn principal(mut self, principal: impl Into<String>) -> Self {
		self.principal = Some(principal.into());

		self
	}

	/// Sets the ticket cache file path.
	pub fn ticket_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.ticket_path = Some(path.into());

		self
	}

	/// Overrides the lock file path.
	pub fn lock_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.lock_path = Some(path.into());

		self
	}

	/// Overrides the ticket age limit (default 300 s).
	pub fn age_limit(mut self, limit: StdDuration) -> Self {
		self.age_limit = limit;

		self
	}

	/// Overrides the lock wait bound (default 10 s).
	pub fn lock_timeout(mut self, timeout: StdDuration) -> Self {
		self.lock_timeout = timeout;

		self
	}

	/// Overrides the lock poll interval (default 50 ms).
	pub fn lock_poll_interval(mut self, interval: StdDuration) -> Self {
		self.lock_poll_interval = interval;

		self
	}

	/// Overrides the ticket-granting program (default `kinit`).
	pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
		self.program = program.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<TicketConfig, ConfigError> {
		let keytab_path = self.keytab_path.ok_or(ConfigError::MissingField { field: "keytab_path" })?;
		let principal = self
			.principal
			.filter(|p| !p.is_empty())
			.ok_or(ConfigError::MissingField { field: "principal" })?;
		let ticket_path = self.ticket_path.ok_or(ConfigError::MissingField { field: "ticket_path" })?;
		let lock_path = self.lock_path.unwrap_or_else(|| lock::lock_path_for(&ticket_path));

		if self.lock_timeout.is_zero() {
			return Err(ConfigError::NonPositiveDuration { setting: "lock timeout" });
		}
		if self.lock_poll_interval.is_zero() {
			return Err(ConfigError::NonPositiveDuration { setting: "lock poll interval" });
		}

		Ok(TicketConfig {
			keytab_path,
			principal,
			ticket_path,
			lock_path,
			age_limit: self.age_limit,
			lock_timeout: self.lock_timeout,
			lock_poll_interval: self.lock_poll_interval,
			program: self.program,
		})
	}
}
impl Default for TicketConfigBuilder {
	fn default() -> Self {
		Self {
			keytab_path: None,
			principal: None,
			ticket_path: None,
			lock_path: None,
			age_limit: default_age_limit(),
			lock_timeout: default_lock_timeout(),
			lock_poll_interval: default_lock_poll_interval(),
			program: default_program(),
		}
	}
}
impl TryFrom<TicketConfigBuilder> for TicketConfig {
	type Error = ConfigError;

	fn try_from(builder: TicketConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

fn default_age_limit() -> StdDuration {
	TicketConfig::DEFAULT_AGE_LIMIT
}

fn default_lock_timeout() -> StdDuration {
	TicketConfig::DEFAULT_LOCK_TIMEOUT
}

fn default_lock_poll_interval() -> StdDuration {
	TicketConfig::DEFAULT_LOCK_POLL_INTERVAL
}

fn default_program() -> PathBuf {
	PathBuf::from(TicketConfig::DEFAULT_PROGRAM)
}
