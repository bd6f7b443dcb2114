//! Shared utility functions for the casedesk application.

use axum::http::HeaderMap;
use rand::Rng;

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Generate a unique storage file name: `{user_id}-{millis}-{rand}.{ext}`.
/// The original extension is preserved when present.
pub fn generate_file_name(original_name: &str, user_id: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(7)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();

    match original_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            format!("{}-{}-{}.{}", user_id, timestamp, random, ext)
        }
        _ => format!("{}-{}-{}", user_id, timestamp, random),
    }
}
