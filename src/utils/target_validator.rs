//! ShortLink spec validation: code character set and redirect target.
//!
//! Validation failures are terminal for a given generation; the reconciler
//! surfaces them as an `Invalid` condition instead of retrying.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Path-safe character set for short codes (URL "unreserved" characters).
static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~-]+$").expect("static pattern is valid"));

/// Maximum accepted code length.
const MAX_CODE_LENGTH: usize = 64;

/// Codes reserved for system endpoints to prevent routing conflicts.
const RESERVED_CODES: &[&str] = &["healthz", "readyz"];

/// Errors that fail a ShortLink spec validation.
#[derive(Debug, thiserror::Error)]
pub enum TargetValidationError {
    #[error("code must be 1-{MAX_CODE_LENGTH} characters from [A-Za-z0-9._~-]")]
    InvalidCode,

    #[error("code '{0}' is reserved")]
    ReservedCode(String),

    #[error("target is not a valid absolute URL: {0}")]
    InvalidTarget(String),

    #[error("target scheme '{0}' is not allowed")]
    SchemeNotAllowed(String),

    #[error("target redirects back to its own short code")]
    SelfReference,
}

/// Validates a short code against the path-safe character set.
///
/// # Errors
///
/// Returns [`TargetValidationError::InvalidCode`] for empty, over-long, or
/// out-of-charset codes and [`TargetValidationError::ReservedCode`] for
/// system endpoint names.
pub fn validate_code(code: &str) -> Result<(), TargetValidationError> {
    if code.is_empty() || code.len() > MAX_CODE_LENGTH || !CODE_PATTERN.is_match(code) {
        return Err(TargetValidationError::InvalidCode);
    }

    if RESERVED_CODES.contains(&code) {
        return Err(TargetValidationError::ReservedCode(code.to_string()));
    }

    Ok(())
}

/// Validates a redirect target for the given code.
///
/// # Rules
///
/// 1. **Syntax**: must parse as an absolute URL
/// 2. **Scheme**: must be in `allowed_schemes` (compared lowercase)
/// 3. **No self-loop**: when `public_host` is configured, a target pointing
///    at `{public_host}/{code}` is rejected; such a link would redirect to
///    itself forever
///
/// The target string is never rewritten; parsing is for validation only, so
/// the served `Location` matches the declared spec byte for byte.
///
/// # Errors
///
/// Returns the matching [`TargetValidationError`] variant; all are terminal
/// for the current spec generation.
pub fn validate_target(
    code: &str,
    target: &str,
    allowed_schemes: &[String],
    public_host: Option<&str>,
) -> Result<(), TargetValidationError> {
    let url =
        Url::parse(target).map_err(|e| TargetValidationError::InvalidTarget(e.to_string()))?;

    let scheme = url.scheme().to_ascii_lowercase();
    if !allowed_schemes.iter().any(|s| *s == scheme) {
        return Err(TargetValidationError::SchemeNotAllowed(scheme));
    }

    if let (Some(own_host), Some(target_host)) = (public_host, url.host_str()) {
        let first_segment = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .unwrap_or("");
        if target_host.eq_ignore_ascii_case(own_host) && first_segment == code {
            return Err(TargetValidationError::SelfReference);
        }
    }

    Ok(())
}
