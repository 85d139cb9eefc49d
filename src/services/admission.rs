//! Admission control deciding whether a subscriber may enter streaming mode.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use tracing::{debug, warn};

use crate::config::AppConfig;

/// Message returned to clients rejected by the session-backed policy.
const AUTHENTICATION_REQUIRED: &str =
    "Authentication required - session not found. For development, enable bypass-authentication.";

/// Identity resolved for an admitted subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Admission checks bypassed; the connection runs anonymously.
    Anonymous,
    /// Connection backed by a pre-existing session.
    Session { id: String },
}

/// Rejection returned when a subscriber may not enter streaming mode.
#[derive(Debug, Clone)]
pub struct AdmissionDenied {
    pub reason: String,
}

/// Pluggable hook resolving or rejecting a subscriber's identity.
pub trait AdmissionPolicy: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> Result<Identity, AdmissionDenied>;
}

/// Build the admission policy selected by configuration.
pub fn policy_from_config(config: &AppConfig) -> Arc<dyn AdmissionPolicy> {
    if config.bypass_authentication() {
        Arc::new(BypassAdmission)
    } else {
        Arc::new(SessionAdmission::new(config.session_cookie()))
    }
}

/// Development-mode policy admitting every request anonymously.
pub struct BypassAdmission;

impl AdmissionPolicy for BypassAdmission {
    fn authorize(&self, _headers: &HeaderMap) -> Result<Identity, AdmissionDenied> {
        debug!("authentication bypass enabled, admitting anonymously");
        Ok(Identity::Anonymous)
    }
}

/// Policy requiring a pre-existing session cookie on the request. The
/// session itself lives in an external collaborator; presence of the cookie
/// is the admission criterion.
pub struct SessionAdmission {
    cookie_name: String,
}

impl SessionAdmission {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

impl AdmissionPolicy for SessionAdmission {
    fn authorize(&self, headers: &HeaderMap) -> Result<Identity, AdmissionDenied> {
        match session_cookie(headers, &self.cookie_name) {
            Some(id) => {
                debug!(session = %id, "session found on request");
                Ok(Identity::Session { id })
            }
            None => {
                warn!(
                    cookie = %self.cookie_name,
                    "no session on request, authentication required"
                );
                Err(AdmissionDenied {
                    reason: AUTHENTICATION_REQUIRED.to_string(),
                })
            }
        }
    }
}

/// Extract the value of the cookie named `name` from the request headers.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Per-connection identity scope. Opened just before streaming starts and
/// closed (via `Drop`) exactly once when the connection tears down.
pub struct IdentityScope {
    channel: String,
    identity: Identity,
}

impl IdentityScope {
    pub fn open(channel: impl Into<String>, identity: Identity) -> Self {
        let scope = Self {
            channel: channel.into(),
            identity,
        };
        debug!(channel = %scope.channel, identity = ?scope.identity, "identity scope opened");
        scope
    }
}

impl Drop for IdentityScope {
    fn drop(&mut self) {
        debug!(channel = %self.channel, identity = ?self.identity, "identity scope closed");
    }
}
