//! Validation helpers for channel names and broadcast payloads.

use validator::ValidationError;

/// Maximum accepted channel name length.
pub const MAX_CHANNEL_NAME_LEN: usize = 100;
/// Maximum accepted payload size in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Channel names starting with this prefix are reserved for internal use.
const RESERVED_PREFIX: &str = "_system";

/// Validates a broadcast channel name: 1-100 characters drawn from
/// `[A-Za-z0-9._:-]`, not starting with the reserved `_system` prefix.
///
/// # Examples
///
/// ```ignore
/// validate_channel_name("device:barrier-01") // Ok
/// validate_channel_name("_system.audit")     // Err - reserved prefix
/// validate_channel_name("a b")               // Err - whitespace
/// ```
pub fn validate_channel_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_CHANNEL_NAME_LEN {
        let mut err = ValidationError::new("channel_name_length");
        err.message = Some(
            format!(
                "Channel name must be 1-{} characters (got {})",
                MAX_CHANNEL_NAME_LEN,
                name.len()
            )
            .into(),
        );
        return Err(err);
    }

    if name.starts_with(RESERVED_PREFIX) {
        let mut err = ValidationError::new("channel_name_reserved");
        err.message =
            Some(format!("Channel name must not start with '{RESERVED_PREFIX}'").into());
        return Err(err);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'))
    {
        let mut err = ValidationError::new("channel_name_format");
        err.message =
            Some("Channel name must contain only alphanumeric characters and -_:.".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a broadcast payload: an opaque string of at most 64 KiB.
pub fn validate_payload(payload: &str) -> Result<(), ValidationError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        let mut err = ValidationError::new("payload_size");
        err.message = Some(
            format!(
                "Payload size exceeds maximum: {} > {}",
                payload.len(),
                MAX_PAYLOAD_BYTES
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_channel_name_valid() {
        assert!(validate_channel_name("a").is_ok());
        assert!(validate_channel_name("A1").is_ok());
        assert!(validate_channel_name("a.b").is_ok());
        assert!(validate_channel_name("a-b").is_ok());
        assert!(validate_channel_name("a_b").is_ok());
        assert!(validate_channel_name("a:b").is_ok());
        assert!(validate_channel_name("device:barrier-01").is_ok());
        assert!(validate_channel_name(&"x".repeat(100)).is_ok()); // boundary
    }

    #[test]
    fn test_validate_channel_name_invalid_length() {
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_channel_name_invalid_format() {
        assert!(validate_channel_name(" a").is_err()); // leading space
        assert!(validate_channel_name("a b").is_err()); // embedded space
        assert!(validate_channel_name("é").is_err()); // non-ascii
        assert!(validate_channel_name("a/b").is_err()); // slash
    }

    #[test]
    fn test_validate_channel_name_reserved_prefix() {
        assert!(validate_channel_name("_system").is_err());
        assert!(validate_channel_name("_systemX").is_err());
        assert!(validate_channel_name("_system.audit").is_err());
        // An underscore on its own is fine, only the prefix is reserved.
        assert!(validate_channel_name("_other").is_ok());
    }

    #[test]
    fn test_validate_payload_boundaries() {
        assert!(validate_payload("").is_ok());
        assert!(validate_payload(&"x".repeat(MAX_PAYLOAD_BYTES)).is_ok());
        assert!(validate_payload(&"x".repeat(MAX_PAYLOAD_BYTES + 1)).is_err());
    }
}
