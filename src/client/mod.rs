//! Authenticated request dispatch.
//!
//! [`ApiClient`] owns one HTTP connection pool with a browser-style cookie
//! jar, the in-memory token store, and the refresh coordinator. Every
//! authenticated call attaches the current bearer token; a 401 on a first
//! delivery triggers (or joins) a single coordinated refresh and the request
//! is replayed once with the token the refresh produced. The public path
//! skips both the bearer header and the interceptor.

pub mod request;
pub mod response;

pub use request::{ApiRequest, Attempt, RequestBody};
pub use response::ApiResponse;

pub use reqwest::{Method, StatusCode};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use serde::Serialize;

use crate::auth::refresh::RefreshCoordinator;
use crate::auth::token::{AccessToken, TokenResponse, TokenStore};
use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("backoffice-client/", env!("CARGO_PKG_VERSION"));

/// Async client for the back-office API.
///
/// Clones are cheap handles to the same connection pool, cookie jar, token
/// store, and refresh state, so a whole application can share one session.
///
/// # Example
/// ```no_run
/// use backoffice_client::ApiClient;
///
/// # async fn example() -> backoffice_client::error::Result<()> {
/// let client = ApiClient::builder("https://backoffice.example.com/api")
///     .with_timeout(std::time::Duration::from_secs(10))
///     .build()?;
/// client.login("admin@example.com", "secret").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenStore,
    refresher: RefreshCoordinator,
}

/// Configuration for [`ApiClient`], in the usual `with_*` style.
#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl ApiClientBuilder {
    /// Request timeout, applied to every call including the refresh call
    /// itself, so a hung refresh cannot stall queued requests forever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = Url::parse(&self.base_url).map_err(|err| {
            Error::Configuration(format!("invalid base URL {}: {err}", self.base_url))
        })?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()
            .map_err(|err| Error::Configuration(format!("failed to build HTTP client: {err}")))?;
        let tokens = TokenStore::new();
        let refresh_url = join_path(&base_url, "/auth/refresh")?;
        let refresher = RefreshCoordinator::new(http.clone(), refresh_url, tokens.clone());
        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                tokens,
                refresher,
            }),
        })
    }
}

impl ApiClient {
    /// Client with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Shared token store. The login success handler and logout handler may
    /// seed or clear it directly; nothing else should mutate it.
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Start an authenticated request.
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, path, Channel::Authenticated)
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> RequestBuilder {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Start a request on the credential-less path: no bearer header, no
    /// refresh interception. Cookies still travel, which is what
    /// pre-authentication endpoints rely on.
    pub fn public_request(&self, method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, path, Channel::Public)
    }

    /// Authenticate against `POST /auth/login` and seed the token store.
    ///
    /// The backend sets the httpOnly refresh cookie on this response; the
    /// cookie jar keeps it for later refresh calls.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken> {
        let response = self
            .public_request(Method::POST, "/auth/login")
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let body: TokenResponse = response.json()?;
        let token = AccessToken::new(body.access_token);
        self.inner.tokens.set(Some(token.clone()));
        Ok(token)
    }

    /// End the session. The local token is dropped unconditionally before
    /// the backend is asked to expire the refresh cookie, so credentials die
    /// even when `POST /auth/logout` fails.
    pub async fn logout(&self) -> Result<()> {
        self.inner.tokens.clear();
        self.public_request(Method::POST, "/auth/logout")
            .send()
            .await?;
        Ok(())
    }

    /// Force a token refresh outside the 401 path, e.g. at startup when only
    /// the refresh cookie survives. Joins any refresh already in flight.
    pub async fn refresh_session(&self) -> Result<AccessToken> {
        self.inner.refresher.refresh().await.map_err(Error::Auth)
    }

    /// Send an authenticated request, transparently refreshing the access
    /// token once if the backend answers 401.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let attempt = Attempt::first(&request);
        let response = self.dispatch(&attempt, self.inner.tokens.get()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return finish(response).await;
        }

        // Expired session: join (or start) the single-flight refresh, then
        // replay once with the token the refresh produced. A failed refresh
        // has already cleared the store.
        let token = self.inner.refresher.refresh().await.map_err(Error::Auth)?;
        let replay = attempt.replay();
        tracing::debug!(path = %request.path, "replaying request after token refresh");
        let response = self.dispatch(&replay, Some(token)).await?;
        // A second 401 falls through here as a plain API error.
        finish(response).await
    }

    /// Send a request without bearer credentials and without the refresh
    /// interceptor. A 401 here surfaces to the caller as-is.
    pub async fn execute_public(&self, request: ApiRequest) -> Result<ApiResponse> {
        let attempt = Attempt::first(&request);
        let response = self.dispatch(&attempt, None).await?;
        finish(response).await
    }

    async fn dispatch(
        &self,
        attempt: &Attempt<'_>,
        token: Option<AccessToken>,
    ) -> Result<reqwest::Response> {
        let request = attempt.request();
        let url = self.endpoint(&request.path)?;
        tracing::trace!(
            method = %request.method,
            path = %request.path,
            attempt = attempt.number(),
            "dispatching request"
        );
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }
        Ok(builder.send().await?)
    }

    /// Resolve an endpoint path under the configured base URL, keeping any
    /// base path prefix (e.g. `/api`) intact.
    fn endpoint(&self, path: &str) -> Result<Url> {
        join_path(&self.inner.base_url, path)
    }
}

fn join_path(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|err| Error::Configuration(format!("invalid request path {path}: {err}")))
}

/// Terminal response mapping: 2xx bodies pass through, anything else becomes
/// [`Error::Api`] with the body preserved as the message.
async fn finish(response: reqwest::Response) -> Result<ApiResponse> {
    let status = response.status();
    if status.is_success() {
        return ApiResponse::from_http(response).await;
    }
    let message = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Authenticated,
    Public,
}

/// Fluent builder for one API call.
pub struct RequestBuilder {
    client: ApiClient,
    request: ApiRequest,
    channel: Channel,
    error: Option<Error>,
}

impl RequestBuilder {
    fn new(client: ApiClient, method: Method, path: impl Into<String>, channel: Channel) -> Self {
        Self {
            client,
            request: ApiRequest::new(method, path),
            channel,
            error: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.request.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.request.headers.insert(name, value);
            }
            _ => {
                self.error
                    .get_or_insert(Error::Configuration(format!("invalid header {name}")));
            }
        }
        self
    }

    /// JSON body. Serialization failures surface when the request is sent.
    pub fn json(mut self, body: &impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.request.body = RequestBody::Json(value),
            Err(err) => {
                self.error.get_or_insert(Error::Serialization(err));
            }
        }
        self
    }

    /// URL-encoded form body.
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.request.body = RequestBody::Form(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        );
        self
    }

    pub async fn send(self) -> Result<ApiResponse> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.channel {
            Channel::Authenticated => self.client.execute(self.request).await,
            Channel::Public => self.client.execute_public(self.request).await,
        }
    }
}
