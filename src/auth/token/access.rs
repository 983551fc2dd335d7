//! Issued access tokens, their expiry helpers, and the versioned persisted form.

// crates.io
use time::{
	PrimitiveDateTime, UtcOffset,
	format_description::{FormatItem, well_known::Rfc3339},
	macros::format_description,
};
// self
use crate::{_prelude::*, auth::TokenSecret, zulu};

const NAIVE_FORMAT: &[FormatItem<'static>] = format_description!(
	"[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// Validation failures raised while building an [`AccessToken`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AccessTokenError {
	/// The token string is empty.
	#[error("The token cannot be the empty string.")]
	InvalidToken,
	/// The expiry lacks an offset, so it cannot be placed on the UTC timeline.
	#[error("The expires_at value `{value}` must be offset aware.")]
	NaiveTimestamp {
		/// Offending text.
		value: String,
	},
	/// The expiry is not a timestamp at all.
	#[error("The expires_at value `{value}` is not a timestamp.")]
	InvalidTimestamp {
		/// Offending text.
		value: String,
	},
}

/// Access token returned by a token endpoint.
///
/// The token string is never empty and `expires_at` is always an offset-aware UTC instant.
/// Only `token` and `expires_at` are persisted; `expires_in` is derived from the clock on
/// demand and may be negative.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PersistedToken", into = "PersistedToken")]
pub struct AccessToken {
	token: TokenSecret,
	expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token expiring at `expires_at` (normalized to UTC).
	pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Result<Self, AccessTokenError> {
		let token = TokenSecret::new(token);

		if token.is_empty() {
			return Err(AccessTokenError::InvalidToken);
		}

		Ok(Self { token, expires_at: expires_at.to_offset(UtcOffset::UTC) })
	}

	/// Creates a token from a textual expiry (Zulu or any RFC 3339 offset form).
	///
	/// Text without an offset fails with [`AccessTokenError::NaiveTimestamp`].
	pub fn from_timestamp(
		token: impl Into<String>,
		expires_at: &str,
	) -> Result<Self, AccessTokenError> {
		Self::new(token, parse_aware_timestamp(expires_at)?)
	}

	/// Redacted token secret.
	pub fn secret(&self) -> &TokenSecret {
		&self.token
	}

	/// Raw token string. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		self.token.expose()
	}

	/// Expiry instant (UTC).
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Overwrites the expiry instant.
	pub fn set_expires_at(&mut self, instant: OffsetDateTime) {
		self.expires_at = instant.to_offset(UtcOffset::UTC);
	}

	/// Remaining lifetime relative to `instant`; negative once expired.
	pub fn expires_in_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}

	/// Remaining lifetime relative to the current UTC clock.
	pub fn expires_in(&self) -> Duration {
		self.expires_in_at(OffsetDateTime::now_utc())
	}

	/// Remaining whole seconds, truncated toward zero; negative once expired.
	pub fn expires_in_seconds(&self) -> i64 {
		self.expires_in().whole_seconds()
	}

	/// Returns `true` when the token is expired at `instant` (the expiry instant itself counts).
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at <= instant
	}

	/// Returns `true` when the token is expired relative to the current UTC clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Expiry rendered as a Zulu string.
	pub fn zulu_string(&self) -> String {
		zulu::format_zulu(self.expires_at)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("token", &self.token)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"<token: {}, expires_at (UTC): {}, expires_in (secs): {}>",
			self.token,
			self.zulu_string(),
			self.expires_in_seconds()
		)
	}
}

/// Versioned on-disk form of an [`AccessToken`].
///
/// Deserializing re-runs every [`AccessToken`] invariant, so a tampered or legacy record with an
/// empty token or a naive timestamp is rejected rather than trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum PersistedToken {
	/// First layout: token plus RFC 3339 expiry.
	#[serde(rename = "1")]
	V1 {
		/// Raw token string.
		token: String,
		/// RFC 3339 expiry with an explicit offset.
		expires_at: String,
	},
}
impl From<AccessToken> for PersistedToken {
	fn from(value: AccessToken) -> Self {
		let expires_at = value
			.expires_at
			.format(&Rfc3339)
			.unwrap_or_else(|_| zulu::format_zulu(value.expires_at));

		Self::V1 { token: value.token.into_inner(), expires_at }
	}
}
impl TryFrom<PersistedToken> for AccessToken {
	type Error = AccessTokenError;

	fn try_from(value: PersistedToken) -> Result<Self, Self::Error> {
		match value {
			PersistedToken::V1 { token, expires_at } => Self::from_timestamp(token, &expires_at),
		}
	}
}

fn parse_aware_timestamp(value: &str) -> Result<OffsetDateTime, AccessTokenError> {
	if let Ok(instant) = zulu::parse_zulu(value) {
		return Ok(instant);
	}
	if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
		return Ok(instant.to_offset(UtcOffset::UTC));
	}
	if PrimitiveDateTime::parse(value, NAIVE_FORMAT).is_ok() {
		return Err(AccessTokenError::NaiveTimestamp { value: value.to_owned() });
	}

	Err(AccessTokenError::InvalidTimestamp { value: value.to_owned() })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn rejects_empty_tokens() {
		let err = AccessToken::new("", macros::datetime!(2030-01-01 00:00 UTC))
			.expect_err("Empty tokens must be rejected.");

		assert_eq!(err, AccessTokenError::InvalidToken);
	}

	#[test]
	fn rejects_naive_and_garbage_timestamps() {
		for naive in ["2024-07-28T21:42:34", "2024-07-28T21:42:34.250"] {
			assert!(matches!(
				AccessToken::from_timestamp("tok", naive),
				Err(AccessTokenError::NaiveTimestamp { .. })
			));
		}

		assert!(matches!(
			AccessToken::from_timestamp("tok", "next tuesday"),
			Err(AccessTokenError::InvalidTimestamp { .. })
		));
	}

	#[test]
	fn normalizes_offsets_to_utc() {
		let token = AccessToken::from_timestamp("tok", "2024-07-28T14:42:34-07:00")
			.expect("Offset timestamps should be accepted.");

		assert_eq!(token.expires_at(), macros::datetime!(2024-07-28 21:42:34 UTC));
		assert_eq!(token.expires_at().offset(), UtcOffset::UTC);
		assert_eq!(token.zulu_string(), "2024-07-28T21:42:34Z");
	}

	#[test]
	fn expiry_boundary_counts_as_expired() {
		let expires_at = macros::datetime!(2025-01-01 01:00 UTC);
		let token = AccessToken::new("tok", expires_at).expect("Fixture token should be valid.");

		assert!(!token.is_expired_at(expires_at - Duration::seconds(1)));
		assert!(token.is_expired_at(expires_at));
		assert!(token.is_expired_at(expires_at + Duration::seconds(1)));
		assert_eq!(token.expires_in_at(expires_at - Duration::minutes(1)), Duration::minutes(1));
		assert_eq!(token.expires_in_at(expires_at + Duration::minutes(1)), -Duration::minutes(1));
	}

	#[test]
	fn clock_helpers_track_now() {
		let now = OffsetDateTime::now_utc();
		let live = AccessToken::new("live", now + Duration::hours(1)).expect("Live token fixture.");
		let dead = AccessToken::new("dead", now - Duration::hours(1)).expect("Dead token fixture.");

		assert!(!live.is_expired());
		assert!((3598..=3600).contains(&live.expires_in_seconds()));
		assert!(dead.is_expired());
		assert!(dead.expires_in_seconds() <= -3599);
	}

	#[test]
	fn persisted_form_round_trips_exactly() {
		let expires_at = macros::datetime!(2024-07-28 21:42:34.123_456_789 UTC);
		let token = AccessToken::new("tok123", expires_at).expect("Fixture token should be valid.");
		let payload = serde_json::to_string(&token).expect("Token should serialize.");

		assert_eq!(
			payload,
			r#"{"version":"1","token":"tok123","expires_at":"2024-07-28T21:42:34.123456789Z"}"#
		);

		let restored: AccessToken = serde_json::from_str(&payload).expect("Token should deserialize.");

		assert_eq!(restored, token);
		assert_eq!(restored.expose(), "tok123");
		assert_eq!(restored.expires_at(), expires_at);
	}

	#[test]
	fn persisted_form_is_revalidated() {
		let naive = r#"{"version":"1","token":"tok","expires_at":"2024-07-28T21:42:34"}"#;
		let empty = r#"{"version":"1","token":"","expires_at":"2024-07-28T21:42:34Z"}"#;

		assert!(serde_json::from_str::<AccessToken>(naive).is_err());
		assert!(serde_json::from_str::<AccessToken>(empty).is_err());
	}

	#[test]
	fn display_redacts_token() {
		let token = AccessToken::new("super-secret", macros::datetime!(2014-12-10 12:00 UTC))
			.expect("Fixture token should be valid.");
		let rendered = token.to_string();

		assert!(rendered.starts_with("<token: <redacted>, expires_at (UTC): 2014-12-10T12:00:00Z"));
		assert!(!rendered.contains("super-secret"));
		assert!(!format!("{token:?}").contains("super-secret"));
	}
}
