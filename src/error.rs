//! Crate-level error types shared by the ticket manager, the token endpoint client, and caches.

// self
use crate::{_prelude::*, auth::AccessTokenError, cache::CacheError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Malformed constructor input; fatal and never retried.
	#[error("Invalid credential configuration: {0}")]
	Config(#[from] ConfigError),
	/// The credential lock could not be acquired within its bound.
	#[error("Timed out after {timeout:?} waiting for the lock on {}.", .path.display())]
	LockTimeout {
		/// Lock file path.
		path: PathBuf,
		/// Bound that elapsed.
		timeout: StdDuration,
	},
	/// The external ticket-granting command reported an error.
	#[error("Error obtaining a Kerberos ticket: {stderr}")]
	CredentialIssuanceFailed {
		/// Raw error output of the command.
		stderr: String,
	},
	/// Every planned attempt against the token endpoint failed.
	#[error("Token request failed after {attempts} attempt(s); last error: {last_error}.")]
	TokenRequestFailed {
		/// Number of attempts made.
		attempts: u32,
		/// Last observed transport error or HTTP status.
		last_error: RequestFailure,
	},
	/// A 200 response lacked required fields; retrying would not help.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
	/// Cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		CacheError,
	),
	/// Filesystem or subprocess failure.
	#[error("I/O error on {}.", .path.display())]
	Io {
		/// Path (or program) involved in the failing operation.
		path: PathBuf,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
}
impl Error {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io { path: path.into(), source }
	}
}
impl From<AccessTokenError> for Error {
	fn from(e: AccessTokenError) -> Self {
		Self::Config(e.into())
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Access token input failed validation.
	#[error(transparent)]
	AccessToken(#[from] AccessTokenError),
	/// Endpoint flavor label is not recognized.
	#[error("Unrecognized endpoint type: `{flavor}`.")]
	UnsupportedFlavor {
		/// Label that failed to parse.
		flavor: String,
	},
	/// Endpoint URL could not be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required builder field was never set.
	#[error("Missing required setting `{field}`.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// Timeouts must be strictly positive.
	#[error("The {setting} must be greater than zero.")]
	NonPositiveDuration {
		/// Offending setting name.
		setting: &'static str,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Outcome of a failed token endpoint attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestFailure {
	/// No response was received (connection failure, timeout, TLS).
	Transport {
		/// Transport-provided message.
		message: String,
	},
	/// A response arrived with a status other than 200.
	Status {
		/// HTTP status code.
		code: u16,
	},
	/// The backoff policy planned zero attempts.
	NotAttempted,
}
impl Display for RequestFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Transport { message } => write!(f, "error making request: {message}"),
			Self::Status { code } => write!(f, "response code {code}"),
			Self::NotAttempted => f.write_str("no attempt was made"),
		}
	}
}

/// Successful (HTTP 200) token responses that cannot be turned into an access token.
#[derive(Debug, ThisError)]
pub enum MalformedResponseError {
	/// The body is not the expected JSON document.
	#[error("Token endpoint returned malformed JSON.")]
	Json {
		/// Structured parsing failure, including the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required field is missing or null.
	#[error("Got a 200 response but could not find `{field}` in the data.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// The `access_token` field is the empty string.
	#[error("Got a 200 response with an empty access token.")]
	EmptyAccessToken,
	/// `expires_at` is not a Zulu timestamp.
	#[error("The expires_at value `{value}` is not in Zulu time format.")]
	InvalidExpiresAt {
		/// Raw value.
		value: String,
	},
	/// `expires_in` is not a number of seconds.
	#[error("The expires_in value `{value}` is not a number of seconds.")]
	InvalidExpiresIn {
		/// Raw value rendered as JSON.
		value: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn access_token_errors_surface_as_config_errors() {
		let err: Error = AccessTokenError::InvalidToken.into();

		assert!(matches!(err, Error::Config(ConfigError::AccessToken(AccessTokenError::InvalidToken))));
		assert!(err.to_string().starts_with("Invalid credential configuration"));
	}

	#[test]
	fn request_failure_renders_last_error() {
		let err = Error::TokenRequestFailed {
			attempts: 3,
			last_error: RequestFailure::Status { code: 500 },
		};

		assert_eq!(
			err.to_string(),
			"Token request failed after 3 attempt(s); last error: response code 500."
		);

		let transport = RequestFailure::Transport { message: "connection refused".into() };

		assert_eq!(transport.to_string(), "error making request: connection refused");
	}

	#[test]
	fn cache_error_converts_with_source() {
		let cache_error = CacheError::Backend { message: "disk full".into() };
		let err: Error = cache_error.clone().into();

		assert!(matches!(err, Error::Cache(_)));

		let source = StdError::source(&err)
			.expect("Crate error should expose the original cache error as its source.");

		assert_eq!(source.to_string(), cache_error.to_string());
	}
}
