//! Per-flavor request construction and response parsing.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	endpoint::{EndpointConfig, EndpointKind},
	error::{ConfigError, MalformedResponseError},
	http::HttpRequest,
	zulu,
};

const MIME_JSON: &str = "application/json";
const MIME_FORM: &str = "application/x-www-form-urlencoded";

/// Strategy describing one token endpoint wire format.
pub trait TokenFlavor
where
	Self: Send + Sync,
{
	/// Flavor implemented by this strategy.
	fn kind(&self) -> EndpointKind;

	/// Builds the request sent on every attempt.
	fn build_request(&self, config: &EndpointConfig) -> Result<HttpRequest, ConfigError>;

	/// Turns a 200 body into a token; `now` anchors relative lifetimes.
	fn parse_response(
		&self,
		body: &[u8],
		now: OffsetDateTime,
	) -> Result<AccessToken, MalformedResponseError>;
}

/// Returns the strategy for `kind`.
pub fn flavor_for(kind: EndpointKind) -> Arc<dyn TokenFlavor> {
	match kind {
		EndpointKind::AcsApi => Arc::new(AcsApiFlavor),
		EndpointKind::OAuth2 => Arc::new(OAuth2Flavor),
	}
}

/// `acs_api`: `GET` with client headers; the body carries a Zulu `expires_at`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcsApiFlavor;
impl TokenFlavor for AcsApiFlavor {
	fn kind(&self) -> EndpointKind {
		EndpointKind::AcsApi
	}

	fn build_request(&self, config: &EndpointConfig) -> Result<HttpRequest, ConfigError> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(config.url.as_str())
			.header(ACCEPT, MIME_JSON)
			.header("client-id", config.client_id.as_str())
			.header("client-secret", config.client_secret.secret())
			.body(Vec::new())?;

		Ok(request)
	}

	fn parse_response(
		&self,
		body: &[u8],
		_now: OffsetDateTime,
	) -> Result<AccessToken, MalformedResponseError> {
		// `expires_in` may be present too; the absolute expiry is authoritative.
		#[derive(Deserialize)]
		struct AcsApiTokenResponse {
			access_token: Option<String>,
			expires_at: Option<String>,
		}

		let payload: AcsApiTokenResponse = decode_json(body)?;
		let token = require_token(payload.access_token)?;
		let expires_at =
			payload.expires_at.ok_or(MalformedResponseError::MissingField { field: "expires_at" })?;
		let expires_at = zulu::parse_zulu(&expires_at)
			.map_err(|_| MalformedResponseError::InvalidExpiresAt { value: expires_at })?;

		into_token(token, expires_at)
	}
}

/// `oauth2`: client credentials `POST` with Basic auth; the body carries `expires_in` seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct OAuth2Flavor;
impl TokenFlavor for OAuth2Flavor {
	fn kind(&self) -> EndpointKind {
		EndpointKind::OAuth2
	}

	fn build_request(&self, config: &EndpointConfig) -> Result<HttpRequest, ConfigError> {
		let credentials = STANDARD
			.encode(format!("{}:{}", config.client_id.as_str(), config.client_secret.secret()));
		let form = form_urlencoded::Serializer::new(String::new())
			.append_pair("grant_type", &config.grant_type)
			.append_pair("scope", &config.scope_param())
			.finish();
		let request = Request::builder()
			.method(Method::POST)
			.uri(config.url.as_str())
			.header(ACCEPT, MIME_JSON)
			.header(AUTHORIZATION, format!("Basic {credentials}"))
			.header(CONTENT_TYPE, MIME_FORM)
			.body(form.into_bytes())?;

		Ok(request)
	}

	fn parse_response(
		&self,
		body: &[u8],
		now: OffsetDateTime,
	) -> Result<AccessToken, MalformedResponseError> {
		#[derive(Deserialize)]
		struct OAuth2TokenResponse {
			access_token: Option<String>,
			expires_in: Option<Value>,
		}

		let payload: OAuth2TokenResponse = decode_json(body)?;
		let token = require_token(payload.access_token)?;
		let expires_in =
			payload.expires_in.ok_or(MalformedResponseError::MissingField { field: "expires_in" })?;
		let seconds = expires_in_seconds(&expires_in)
			.ok_or_else(|| MalformedResponseError::InvalidExpiresIn { value: expires_in.to_string() })?;
		let expires_at = now
			.checked_add(Duration::seconds(seconds))
			.ok_or_else(|| MalformedResponseError::InvalidExpiresIn { value: expires_in.to_string() })?;

		into_token(token, expires_at)
	}
}

fn decode_json<T>(body: &[u8]) -> Result<T, MalformedResponseError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| MalformedResponseError::Json { source })
}

fn require_token(token: Option<String>) -> Result<String, MalformedResponseError> {
	match token {
		None => Err(MalformedResponseError::MissingField { field: "access_token" }),
		Some(token) if token.is_empty() => Err(MalformedResponseError::EmptyAccessToken),
		Some(token) => Ok(token),
	}
}

fn into_token(
	token: String,
	expires_at: OffsetDateTime,
) -> Result<AccessToken, MalformedResponseError> {
	AccessToken::new(token, expires_at).map_err(|_| MalformedResponseError::EmptyAccessToken)
}

// Integers pass through, floats truncate toward zero, numeric strings parse as either.
fn expires_in_seconds(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64().or_else(|| number.as_f64().and_then(truncate_secs)),
		Value::String(text) => {
			let text = text.trim();

			text.parse::<i64>().ok().or_else(|| text.parse::<f64>().ok().and_then(truncate_secs))
		},
		_ => None,
	}
}

fn truncate_secs(value: f64) -> Option<i64> {
	const LIMIT: f64 = i64::MAX as f64;

	if value.is_finite() && value.abs() < LIMIT { Some(value.trunc() as i64) } else { None }
}
