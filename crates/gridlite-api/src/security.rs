/// Input validation for grid requests
///
/// Every request passes through these checks before any connection is
/// opened, so a rejected request never reaches the database.
use gridlite_core::error::{Error, Result};

/// Maximum length of the raw request document (1 MB)
pub const MAX_REQUEST_LENGTH: usize = 1024 * 1024;

/// Maximum length of a table or column identifier
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validates the raw request document
///
/// # Security
///
/// - Prevents empty requests
/// - Prevents oversized requests (>1MB)
///
/// # Errors
///
/// Returns Error::MalformedRequest if validation fails
#[inline]
pub fn validate_request(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(Error::MalformedRequest(
            "Request cannot be empty".to_string(),
        ));
    }

    if raw.len() > MAX_REQUEST_LENGTH {
        return Err(Error::MalformedRequest(format!(
            "Request length {} exceeds maximum {}",
            raw.len(),
            MAX_REQUEST_LENGTH
        )));
    }

    Ok(())
}

/// Validates a table or column identifier
///
/// # Security
///
/// - Prevents empty and oversized names
/// - Allows only ASCII letters, digits and underscores, not starting with
///   a digit, so the name is safe to embed in SQL text
///
/// # Errors
///
/// Returns Error::InvalidInput if validation fails
#[inline]
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Identifier length {} exceeds maximum {}",
            name.len(),
            MAX_IDENTIFIER_LENGTH
        )));
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "Identifier '{}' cannot start with a digit",
            name
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidInput(format!(
            "Identifier '{}' may only contain letters, digits and '_'",
            name.escape_default()
        )));
    }

    Ok(())
}

/// Validates a table name against the allow-list
///
/// # Errors
///
/// Returns Error::UnknownTable if the table is not configured
#[inline]
pub fn validate_table(name: &str, allowed: &[String]) -> Result<()> {
    if allowed.iter().any(|t| t == name) {
        Ok(())
    } else {
        Err(Error::UnknownTable(name.to_string()))
    }
}

/// Caps the requested page size at `max`
#[inline]
pub fn clamp_limit(limit: u64, max: u64) -> u64 {
    limit.min(max)
}
