//! Redacting wrapper for bearer token strings.

// self
use crate::_prelude::*;

/// Bearer token string that never reaches `Debug`/`Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// True for the empty string.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Unwraps the raw token.
	pub fn into_inner(self) -> String {
		self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
