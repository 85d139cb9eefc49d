//! CORS policy evaluation for the subscribe endpoint.
//!
//! The policy is a pure function of the request origin and the configured
//! exact-match allow-list. A disallowed origin does not fail the request;
//! the response simply carries no CORS headers and the browser enforces.

use axum::http::{HeaderMap, HeaderValue, header};
use tracing::{debug, warn};

const ALLOWED_METHODS: &str = "GET, OPTIONS";
const ALLOWED_HEADERS: &str =
    "Content-Type, Authorization, X-Requested-With, Accept, Origin, Cache-Control";
const MAX_AGE_SECS: &str = "3600";

/// Exact-match allow-list policy evaluated per request origin.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allow_credentials: bool,
}

/// Outcome of evaluating a request origin against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// No `Origin` header, likely a same-origin request.
    NoOrigin,
    Allowed { origin: String, credentials: bool },
    Disallowed,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, allow_credentials: bool) -> Self {
        Self {
            allowed_origins,
            allow_credentials,
        }
    }

    pub fn evaluate(&self, origin: Option<&str>) -> CorsDecision {
        let Some(origin) = origin.filter(|origin| !origin.is_empty()) else {
            return CorsDecision::NoOrigin;
        };

        if self.allowed_origins.is_empty() {
            warn!(origin, "origin header present but no allowed origins configured");
            return CorsDecision::Disallowed;
        }

        if self.allowed_origins.iter().any(|allowed| allowed == origin) {
            debug!(origin, "CORS headers set for allowed origin");
            CorsDecision::Allowed {
                origin: origin.to_string(),
                credentials: self.allow_credentials,
            }
        } else {
            warn!(
                origin,
                allowed = ?self.allowed_origins,
                "CORS request from disallowed origin"
            );
            CorsDecision::Disallowed
        }
    }

    /// Compute the CORS response headers for a request carrying `origin`.
    /// Empty when the origin is absent or not allowed.
    pub fn response_headers(&self, origin: Option<&str>) -> HeaderMap {
        match self.evaluate(origin) {
            CorsDecision::Allowed {
                origin,
                credentials,
            } => allow_headers(&origin, credentials),
            CorsDecision::NoOrigin | CorsDecision::Disallowed => HeaderMap::new(),
        }
    }
}

fn allow_headers(origin: &str, credentials: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Ok(origin_value) = HeaderValue::from_str(origin) else {
        return headers;
    };
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
    if credentials {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    headers
}
