use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters accepted by the broadcast subscribe endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscribeParams {
    /// Name of the channel to subscribe to.
    pub channel: Option<String>,
}

/// Render an event frame carrying `payload` verbatim.
///
/// The payload stays a single `data:` line even when it embeds newlines;
/// publishers are expected to send single-line documents (typically JSON).
pub fn data_frame(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// Render a comment frame, used for the connection preamble and heartbeats.
pub fn comment_frame(text: &str) -> String {
    format!(": {text}\n\n")
}

/// Render a named error event, used on the authentication failure path.
pub fn error_frame(reason: &str) -> String {
    format!("event: error\ndata: {reason}\n\n")
}
