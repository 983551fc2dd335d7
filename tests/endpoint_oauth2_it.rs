// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use httpmock::prelude::*;
// self
use credential_lifecycle::{
	_preludet::*,
	cache::CacheKey,
	endpoint::{EndpointConfig, EndpointKind},
	error::{MalformedResponseError, RequestFailure},
};

const CLIENT_ID: &str = "oauth-client";
const CLIENT_SECRET: &str = "oauth-secret";

fn build_config(server: &MockServer, use_cache: bool) -> EndpointConfig {
	EndpointConfig::builder(EndpointKind::OAuth2)
		.url(server.url("/oauth2/token"))
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.scopes(["read:things", "write:things"])
		.use_cache(use_cache)
		.timeout(StdDuration::from_secs(2))
		.build()
		.expect("OAuth2 endpoint configuration should build successfully.")
}

fn basic_auth() -> String {
	format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}")))
}

#[test]
fn oauth2_posts_client_credentials_and_computes_expiry() -> color_eyre::Result<()> {
	let server = MockServer::start();
	let (endpoint, _cache, _sleeper) = build_reqwest_test_endpoint(build_config(&server, true), 3);
	let mock = server.mock(|when, then| {
		when.method(POST)
			.path("/oauth2/token")
			.header("accept", "application/json")
			.header("authorization", basic_auth())
			.header("content-type", "application/x-www-form-urlencoded")
			.body("grant_type=client_credentials&scope=read%3Athings+write%3Athings");
		then.status(200)
			.header("content-type", "application/json")
			.body(r#"{"access_token":"tokXYZ","token_type":"bearer","expires_in":3600}"#);
	});
	let requested_at = OffsetDateTime::now_utc();
	let token = endpoint.get_token()?;
	let drift = token.expires_at() - (requested_at + Duration::seconds(3600));

	assert_eq!(token.expose(), "tokXYZ");
	assert!(drift.abs() <= Duration::seconds(2), "expires_at drifted by {drift}");

	mock.assert_calls(1);

	Ok(())
}

#[test]
fn oauth2_cold_cache_fetches_once_and_stores_margin_adjusted_ttl() -> color_eyre::Result<()> {
	let server = MockServer::start();
	let config = build_config(&server, true);
	let key = CacheKey::for_url(&config.url);
	let (endpoint, cache, _sleeper) = build_reqwest_test_endpoint(config, 3);
	let mock = server.mock(|when, then| {
		when.method(POST).path("/oauth2/token");
		then.status(200).body(r#"{"access_token":"tok-cache","expires_in":3600}"#);
	});
	let first = endpoint.get_token()?;
	let second = endpoint.get_token()?;

	assert_eq!(first, second);

	mock.assert_calls(1);

	let entry = cache.entry(&key).expect("Fetched token should be cached under the URL key.");
	let drift = entry.expires_at - (first.expires_at() - Duration::seconds(5));

	assert_eq!(entry.value, first);
	assert!(drift.abs() < Duration::seconds(1), "cache deadline drifted by {drift}");

	Ok(())
}

#[test]
fn oauth2_without_cache_fetches_every_time() -> color_eyre::Result<()> {
	let server = MockServer::start();
	let (endpoint, cache, _sleeper) = build_reqwest_test_endpoint(build_config(&server, false), 1);
	let mock = server.mock(|when, then| {
		when.method(POST).path("/oauth2/token");
		then.status(200).body(r#"{"access_token":"tok-nocache","expires_in":"120"}"#);
	});

	endpoint.get_token()?;
	endpoint.get_token()?;

	mock.assert_calls(2);
	assert!(cache.is_empty());

	Ok(())
}

#[test]
fn oauth2_recovers_after_transient_failures() -> color_eyre::Result<()> {
	let server = MockServer::start();
	let (endpoint, _cache, sleeper) = build_reqwest_test_endpoint(build_config(&server, true), 4);
	let mut failing = server.mock(|when, then| {
		when.method(POST).path("/oauth2/token");
		then.status(503);
	});
	let err = endpoint.get_token().expect_err("Unavailable endpoint should exhaust attempts.");

	assert!(matches!(
		err,
		Error::TokenRequestFailed { attempts: 4, last_error: RequestFailure::Status { code: 503 } }
	));
	assert_eq!(sleeper.recorded().len(), 3);

	failing.assert_calls(4);
	failing.delete();

	let healthy = server.mock(|when, then| {
		when.method(POST).path("/oauth2/token");
		then.status(200).body(r#"{"access_token":"tok-recovered","expires_in":600}"#);
	});

	assert_eq!(endpoint.get_token()?.expose(), "tok-recovered");

	healthy.assert_calls(1);

	Ok(())
}

#[test]
fn oauth2_missing_expires_in_is_malformed_and_not_retried() {
	let server = MockServer::start();
	let (endpoint, cache, sleeper) = build_reqwest_test_endpoint(build_config(&server, true), 3);
	let mock = server.mock(|when, then| {
		when.method(POST).path("/oauth2/token");
		then.status(200).body(r#"{"access_token":"tok"}"#);
	});
	let err = endpoint.get_token().expect_err("Missing expires_in should be rejected.");

	assert!(matches!(
		err,
		Error::MalformedResponse(MalformedResponseError::MissingField { field: "expires_in" })
	));
	assert!(sleeper.recorded().is_empty());
	assert!(cache.is_empty());

	mock.assert_calls(1);
}

#[test]
fn oauth2_unreachable_endpoint_reports_transport_error() {
	let config = EndpointConfig::builder(EndpointKind::OAuth2)
		.url("http://127.0.0.1:9/oauth2/token")
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.timeout(StdDuration::from_secs(2))
		.build()
		.expect("Unreachable endpoint configuration should build successfully.");
	let (endpoint, _cache, sleeper) = build_reqwest_test_endpoint(config, 2);
	let err = endpoint.get_token().expect_err("Unreachable endpoint should fail.");

	assert!(matches!(
		err,
		Error::TokenRequestFailed { attempts: 2, last_error: RequestFailure::Transport { .. } }
	));
	assert_eq!(sleeper.recorded().len(), 1);
}
