/// Opaque payload carried by a single broadcast.
///
/// The hub never inspects the payload; publishers typically send
/// single-line JSON documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEvent {
    payload: String,
}

impl BroadcastEvent {
    /// Wrap a payload string into an event.
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Borrow the payload verbatim.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}
