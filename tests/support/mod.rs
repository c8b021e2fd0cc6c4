//! Shared helpers for wiremock-backed integration tests.
#![allow(dead_code)]

use std::time::Duration;

use backoffice_client::ApiClient;
use wiremock::{Match, MockServer, Request};

/// Client pointed at the mock server, with a short timeout so a wedged test
/// fails fast instead of hanging.
pub fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::builder(server.uri())
        .with_timeout(Duration::from_secs(5))
        .build()
        .expect("client for mock server")
}

/// Matches requests carrying exactly `Authorization: Bearer <token>`.
pub struct BearerToken(String);

pub fn bearer(token: &str) -> BearerToken {
    BearerToken(token.to_string())
}

impl Match for BearerToken {
    fn matches(&self, request: &Request) -> bool {
        let expected = format!("Bearer {}", self.0);
        request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some(expected.as_str())
    }
}

/// Matches requests with no Authorization header at all.
pub struct NoAuthorization;

pub fn no_authorization() -> NoAuthorization {
    NoAuthorization
}

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// Matches requests whose Cookie header carries `name=value`.
pub struct HasCookie {
    name: String,
    value: String,
}

pub fn has_cookie(name: &str, value: &str) -> HasCookie {
    HasCookie {
        name: name.to_string(),
        value: value.to_string(),
    }
}

impl Match for HasCookie {
    fn matches(&self, request: &Request) -> bool {
        let expected = format!("{}={}", self.name, self.value);
        request
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .map(|cookies| cookies.split(';').any(|pair| pair.trim() == expected))
            .unwrap_or(false)
    }
}
