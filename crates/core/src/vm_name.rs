//! VM hostname normalization.
//!
//! Windows hostnames are capped at 15 characters (NetBIOS limit). Names are
//! lowercased and stripped of anything outside `[a-z0-9-]` before use.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum hostname length accepted by Windows.
pub const MAX_VM_NAME_LEN: usize = 15;

static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));

/// Trim, lowercase, and remove disallowed characters.
pub fn sanitize_vm_name(raw: &str) -> String {
    DISALLOWED_RE
        .replace_all(&raw.trim().to_lowercase(), "")
        .into_owned()
}

/// Sanitize `raw` and check the result is a usable hostname.
///
/// `field` names the request field in error messages (e.g. `vmName`).
pub fn validate_vm_name(field: &str, raw: &str) -> Result<String, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }

    let sanitized = sanitize_vm_name(raw);
    if sanitized.is_empty() || sanitized.len() > MAX_VM_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must be 1-{MAX_VM_NAME_LEN} alphanumeric/dash characters"
        )));
    }

    Ok(sanitized)
}
