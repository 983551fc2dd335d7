//! Optional observability helpers for credential operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `credential_lifecycle.operation` with the
//!   `operation` and `stage` (call site) fields, plus debug/info/warn events along the way.
//! - Enable `metrics` to increment the `credential_lifecycle_operation_total` counter for every
//!   attempt/success/failure/cache lookup, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event at the given level when the `tracing` feature is enabled.
macro_rules! obs_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	};
}
pub(crate) use obs_event;

/// Credential operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Kerberos ticket staleness check and renewal.
	TicketRenewal,
	/// Access token lookup and fetch.
	TokenFetch,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::TicketRenewal => "ticket_renewal",
			Operation::TokenFetch => "token_fetch",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation (or one network attempt).
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Cache returned a live token.
	CacheHit,
	/// Cache had nothing usable.
	CacheMiss,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::CacheHit => "cache_hit",
			Outcome::CacheMiss => "cache_miss",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
