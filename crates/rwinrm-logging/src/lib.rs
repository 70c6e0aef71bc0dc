// Logging module - verbose wire debugging for WS-Management exchanges
pub mod request_logger;

pub use request_logger::{log_request, log_response, log_session_summary};

/// Body previews longer than this are truncated in debug output
pub const MAX_LOGGED_BODY_CHARS: usize = 5000;

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = if max_chars >= 3 { max_chars - 3 } else { 0 };
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Mask the credential part of an `Authorization` header value
pub fn redact_authorization(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, _)) => format!("{} ***", scheme),
        None => "***".to_string(),
    }
}
