use reqwest::header::HeaderMap;
use reqwest::Method;

/// Replayable description of one API call.
///
/// Bodies are captured as values (JSON or form pairs) rather than streams so
/// the dispatcher can re-issue the request unchanged after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }
}

/// Captured request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// One delivery of an [`ApiRequest`].
///
/// The attempt number replaces a mutable "already retried" marker: only
/// attempt 1 may enter the refresh path on a 401, and [`Attempt::replay`]
/// produces attempt 2, so retries are bounded to exactly one per logical
/// request by construction.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    request: &'a ApiRequest,
    number: u8,
}

impl<'a> Attempt<'a> {
    pub fn first(request: &'a ApiRequest) -> Self {
        Self { request, number: 1 }
    }

    /// The single permitted re-delivery after a successful refresh.
    pub fn replay(&self) -> Self {
        Self {
            request: self.request,
            number: self.number + 1,
        }
    }

    pub fn request(&self) -> &ApiRequest {
        self.request
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn is_first(&self) -> bool {
        self.number == 1
    }
}
