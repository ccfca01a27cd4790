//! Name derivation for jobs and downloaded files.

use chrono::{DateTime, Utc};

/// Job name of the form `"<client name> 2025-03-12T14:23:45"` (UTC).
pub fn timestamped_name(client_name: &str, now: DateTime<Utc>) -> String {
    format!("{client_name} {}", now.format("%Y-%m-%dT%H:%M:%S"))
}

/// Display name for an uploaded G-code: the last segment of its storage key.
pub fn gcode_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Strip the query string and fragment from a URL.
///
/// Presigned URLs carry their signature in the query, so only the path is
/// safe to log or embed in errors.
pub fn redact_query(url: &str) -> &str {
    let clean = url.split('?').next().unwrap_or(url);
    clean.split('#').next().unwrap_or(clean)
}
