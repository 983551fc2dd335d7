//! Token endpoint configuration and its validating builder.

// crates.io
use oauth2::{ClientId, ClientSecret};
// self
use crate::{_prelude::*, error::ConfigError};

/// Wire flavor spoken by a token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
	/// Simple bearer API: `GET` with `client-id`/`client-secret` headers, Zulu `expires_at`.
	#[serde(rename = "acs_api")]
	AcsApi,
	/// OAuth 2.0 client credentials: `POST` with Basic auth and a form body, `expires_in`.
	#[serde(rename = "oauth2")]
	OAuth2,
}
impl EndpointKind {
	/// Returns the stable configuration label.
	pub const fn as_str(self) -> &'static str {
		match self {
			EndpointKind::AcsApi => "acs_api",
			EndpointKind::OAuth2 => "oauth2",
		}
	}
}
impl Display for EndpointKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for EndpointKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"acs_api" => Ok(Self::AcsApi),
			"oauth2" => Ok(Self::OAuth2),
			other => Err(ConfigError::UnsupportedFlavor { flavor: other.to_owned() }),
		}
	}
}

/// Immutable configuration owned by one token endpoint client.
///
/// Deserializing runs the same validation as [`EndpointConfigBuilder::build`], and every
/// setting except the flavor, URL, and client credentials may be omitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "EndpointConfigBuilder")]
pub struct EndpointConfig {
	/// Wire flavor.
	pub kind: EndpointKind,
	/// Token endpoint URL.
	pub url: Url,
	/// Client identifier.
	pub client_id: ClientId,
	/// Client secret; redacted in `Debug`.
	pub client_secret: ClientSecret,
	/// Per-attempt request timeout.
	pub timeout: StdDuration,
	/// Whether tokens go through the credential cache.
	pub use_cache: bool,
	/// Requested scopes (sent space-joined by the OAuth2 flavor).
	pub scopes: Vec<String>,
	/// Grant type sent by the OAuth2 flavor.
	pub grant_type: String,
	/// Safety margin subtracted from a token's lifetime when computing its cache TTL.
	pub cache_margin: StdDuration,
}
impl EndpointConfig {
	/// Default per-attempt request timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(15);
	/// Default cache safety margin.
	pub const DEFAULT_CACHE_MARGIN: StdDuration = StdDuration::from_secs(5);
	/// Default OAuth2 grant type.
	pub const DEFAULT_GRANT_TYPE: &'static str = "client_credentials";

	/// Starts a builder for the given flavor.
	pub fn builder(kind: EndpointKind) -> EndpointConfigBuilder {
		EndpointConfigBuilder::new(kind)
	}

	/// Scopes joined with single spaces.
	pub fn scope_param(&self) -> String {
		self.scopes.join(" ")
	}
}

/// Builder for [`EndpointConfig`] values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfigBuilder {
	/// Wire flavor.
	pub kind: EndpointKind,
	/// Endpoint URL text, parsed at build time.
	#[serde(default)]
	pub url: Option<String>,
	/// Client identifier.
	#[serde(default)]
	pub client_id: Option<ClientId>,
	/// Client secret.
	#[serde(default)]
	pub client_secret: Option<ClientSecret>,
	/// Per-attempt request timeout.
	#[serde(default = "default_timeout")]
	pub timeout: StdDuration,
	/// Whether tokens go through the credential cache.
	#[serde(default = "default_use_cache")]
	pub use_cache: bool,
	/// Requested scopes.
	#[serde(default)]
	pub scopes: Vec<String>,
	/// OAuth2 grant type.
	#[serde(default = "default_grant_type")]
	pub grant_type: String,
	/// Cache safety margin.
	#[serde(default = "default_cache_margin")]
	pub cache_margin: StdDuration,
}
impl EndpointConfigBuilder {
	/// Creates a builder seeded with defaults for `kind`.
	pub fn new(kind: EndpointKind) -> Self {
		Self {
			kind,
			url: None,
			client_id: None,
			client_secret: None,
			timeout: default_timeout(),
			use_cache: default_use_cache(),
			scopes: Vec::new(),
			grant_type: default_grant_type(),
			cache_margin: default_cache_margin(),
		}
	}

	/// Sets the token endpoint URL.
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(ClientId::new(client_id.into()));

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
		self.client_secret = Some(ClientSecret::new(client_secret.into()));

		self
	}

	/// Overrides the per-attempt request timeout (default 15 s).
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Enables or disables the credential cache (default enabled).
	pub fn use_cache(mut self, use_cache: bool) -> Self {
		self.use_cache = use_cache;

		self
	}

	/// Replaces the requested scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the OAuth2 grant type (default `client_credentials`).
	pub fn grant_type(mut self, grant_type: impl Into<String>) -> Self {
		self.grant_type = grant_type.into();

		self
	}

	/// Overrides the cache safety margin (default 5 s).
	pub fn cache_margin(mut self, margin: StdDuration) -> Self {
		self.cache_margin = margin;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<EndpointConfig, ConfigError> {
		let url = self.url.ok_or(ConfigError::MissingField { field: "url" })?;
		let url = Url::parse(&url).map_err(|source| ConfigError::InvalidUrl { source })?;
		let client_id = self.client_id.ok_or(ConfigError::MissingField { field: "client_id" })?;
		let client_secret =
			self.client_secret.ok_or(ConfigError::MissingField { field: "client_secret" })?;

		if self.timeout.is_zero() {
			return Err(ConfigError::NonPositiveDuration { setting: "request timeout" });
		}
		if self.grant_type.is_empty() {
			return Err(ConfigError::MissingField { field: "grant_type" });
		}

		Ok(EndpointConfig {
			kind: self.kind,
			url,
			client_id,
			client_secret,
			timeout: self.timeout,
			use_cache: self.use_cache,
			scopes: self.scopes,
			grant_type: self.grant_type,
			cache_margin: self.cache_margin,
		})
	}
}
impl TryFrom<EndpointConfigBuilder> for EndpointConfig {
	type Error = ConfigError;

	fn try_from(builder: EndpointConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

fn default_timeout() -> StdDuration {
	EndpointConfig::DEFAULT_TIMEOUT
}

fn default_use_cache() -> bool {
	true
}

fn default_grant_type() -> String {
	EndpointConfig::DEFAULT_GRANT_TYPE.into()
}

fn default_cache_margin() -> StdDuration {
	EndpointConfig::DEFAULT_CACHE_MARGIN
}
