//! Input validation for capability identifiers.
//!
//! Every capability checks its resource names and keys here before any
//! provider call, so a blank identifier never reaches the network.
//! Provider-specific naming rules are left to the provider.

use crate::capability::CapabilityError;

/// Length limits for validated fields.
pub mod limits {
    /// Maximum resource name length (bucket, queue, topic, table).
    pub const MAX_RESOURCE_NAME_LENGTH: usize = 255;
    /// Maximum object key length in bytes.
    pub const MAX_OBJECT_KEY_LENGTH: usize = 1024;
}

/// Error constants for validation failures.
pub mod errmsg {
    pub const NAME_BLANK: &str = "name cannot be blank";
    pub const NAME_TOO_LONG: &str = "name exceeds maximum length";
    pub const NAME_CONTROL_CHARS: &str = "name contains control characters";

    pub const KEY_BLANK: &str = "key cannot be blank";
    pub const KEY_TOO_LONG: &str = "key exceeds maximum length";
}

/// Validate a resource name.
///
/// Rules:
/// - Must not be empty or whitespace only
/// - Maximum 255 bytes
/// - No control characters
///
/// `what` names the resource kind in the error ("bucket", "queue", ...).
pub fn validate_name(what: &str, name: &str) -> Result<(), CapabilityError> {
    if name.trim().is_empty() {
        return Err(CapabilityError::InvalidArgument(format!(
            "{what} {}",
            errmsg::NAME_BLANK
        )));
    }
    if name.len() > limits::MAX_RESOURCE_NAME_LENGTH {
        return Err(CapabilityError::InvalidArgument(format!(
            "{what} {} (max: {}, got: {})",
            errmsg::NAME_TOO_LONG,
            limits::MAX_RESOURCE_NAME_LENGTH,
            name.len()
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(CapabilityError::InvalidArgument(format!(
            "{what} {}",
            errmsg::NAME_CONTROL_CHARS
        )));
    }
    Ok(())
}

/// Validate an object key or key-attribute value.
///
/// Rules:
/// - Must not be empty or whitespace only
/// - Maximum 1024 bytes
pub fn validate_key(what: &str, key: &str) -> Result<(), CapabilityError> {
    if key.trim().is_empty() {
        return Err(CapabilityError::InvalidArgument(format!(
            "{what} {}",
            errmsg::KEY_BLANK
        )));
    }
    if key.len() > limits::MAX_OBJECT_KEY_LENGTH {
        return Err(CapabilityError::InvalidArgument(format!(
            "{what} {} (max: {}, got: {})",
            errmsg::KEY_TOO_LONG,
            limits::MAX_OBJECT_KEY_LENGTH,
            key.len()
        )));
    }
    Ok(())
}

/// Validate an optional sort key: `None` is fine, `Some` must be non-blank.
pub fn validate_optional_key(what: &str, key: Option<&str>) -> Result<(), CapabilityError> {
    match key {
        Some(k) => validate_key(what, k),
        None => Ok(()),
    }
}
