// crates.io
use httpmock::prelude::*;
use time::macros::datetime;
// self
use credential_lifecycle::{
	_preludet::*,
	auth::AccessToken,
	cache::{CacheKey, CredentialCache},
	endpoint::{EndpointConfig, EndpointKind},
	error::{MalformedResponseError, RequestFailure},
};

const CLIENT_ID: &str = "acs-client";
const CLIENT_SECRET: &str = "acs-secret";

fn build_config(server: &MockServer) -> EndpointConfig {
	EndpointConfig::builder(EndpointKind::AcsApi)
		.url(server.url("/token"))
		.client_id(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.timeout(StdDuration::from_secs(2))
		.build()
		.expect("ACS endpoint configuration should build successfully.")
}

#[test]
fn acs_api_returns_token_with_zulu_expiry() {
	let server = MockServer::start();
	let (endpoint, _cache, sleeper) = build_reqwest_test_endpoint(build_config(&server), 3);
	let mock = server.mock(|when, then| {
		when.method(GET)
			.path("/token")
			.header("accept", "application/json")
			.header("client-id", CLIENT_ID)
			.header("client-secret", CLIENT_SECRET);
		then.status(200)
			.header("content-type", "application/json")
			.body(r#"{"access_token":"tok123","expires_at":"2024-07-28T21:42:34Z"}"#);
	});
	let token = endpoint.get_token().expect("ACS token request should succeed.");

	assert_eq!(token.expose(), "tok123");
	assert_eq!(token.expires_at(), datetime!(2024-07-28 21:42:34 UTC));
	assert!(sleeper.recorded().is_empty());

	mock.assert_calls(1);
}

#[test]
fn acs_api_accepts_fractional_seconds() {
	let server = MockServer::start();
	let (endpoint, _cache, _sleeper) = build_reqwest_test_endpoint(build_config(&server), 1);
	let mock = server.mock(|when, then| {
		when.method(GET).path("/token");
		then.status(200).body(
			r#"{"access_token":"tok-frac","expires_at":"2099-01-01T00:00:00.250Z","expires_in":10}"#,
		);
	});
	let token = endpoint.get_token().expect("Fractional Zulu expiry should be accepted.");

	assert_eq!(token.expires_at(), datetime!(2099-01-01 00:00:00.25 UTC));
	assert_eq!(token.zulu_string(), "2099-01-01T00:00:00Z");

	mock.assert_calls(1);
}

#[test]
fn acs_api_warm_cache_makes_no_network_calls() {
	let server = MockServer::start();
	let config = build_config(&server);
	let key = CacheKey::for_url(&config.url);
	let (endpoint, cache, _sleeper) = build_reqwest_test_endpoint(config, 3);
	let mock = server.mock(|when, then| {
		when.method(GET).path("/token");
		then.status(200).body(r#"{"access_token":"fresh","expires_at":"2099-01-01T00:00:00Z"}"#);
	});
	let cached = AccessToken::new("cached-token", OffsetDateTime::now_utc() + Duration::hours(1))
		.expect("Cached token fixture should be valid.");

	assert_eq!(endpoint.cache_key(), &key);

	cache.set(&key, &cached, Duration::minutes(30)).expect("Seeding the cache should succeed.");

	let token = endpoint.get_token().expect("Warm cache lookup should succeed.");

	assert_eq!(token, cached);

	mock.assert_calls(0);
}

#[test]
fn acs_api_server_errors_exhaust_attempts_and_cache_nothing() {
	let server = MockServer::start();
	let (endpoint, cache, sleeper) = build_reqwest_test_endpoint(build_config(&server), 3);
	let mock = server.mock(|when, then| {
		when.method(GET).path("/token");
		then.status(500).body("boom");
	});
	let err = endpoint.get_token().expect_err("Three 500 responses should fail the request.");

	assert!(matches!(
		err,
		Error::TokenRequestFailed { attempts: 3, last_error: RequestFailure::Status { code: 500 } }
	));
	assert_eq!(sleeper.recorded(), vec![StdDuration::from_secs(1), StdDuration::from_secs(2)]);
	assert!(cache.is_empty());

	mock.assert_calls(3);
}

#[test]
fn acs_api_non_zulu_expiry_is_malformed() {
	let server = MockServer::start();
	let (endpoint, cache, _sleeper) = build_reqwest_test_endpoint(build_config(&server), 3);
	let mock = server.mock(|when, then| {
		when.method(GET).path("/token");
		then.status(200).body(r#"{"access_token":"tok","expires_at":"2024-07-28 21:42:34"}"#);
	});
	let err = endpoint.get_token().expect_err("Non-Zulu expiry should be rejected.");

	assert!(matches!(
		err,
		Error::MalformedResponse(MalformedResponseError::InvalidExpiresAt { .. })
	));
	assert!(cache.is_empty());

	mock.assert_calls(1);
}
