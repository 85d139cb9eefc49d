use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process is serving.
    pub status: String,
    /// Number of currently registered broadcast channels.
    pub channels: usize,
}

impl HealthResponse {
    /// Create a health response for a hub currently holding `channels` channels.
    pub fn ok(channels: usize) -> Self {
        Self {
            status: "ok".to_string(),
            channels,
        }
    }
}
