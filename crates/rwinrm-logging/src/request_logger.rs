use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::{redact_authorization, safe_truncate, MAX_LOGGED_BODY_CHARS};

/// Log an outgoing SOAP request (stderr, verbose only)
pub fn log_request(url: &str, action: &str, authorization: Option<&str>, body: &str, verbose: bool) {
    if !verbose {
        return;
    }

    eprintln!("\n{}", "═".repeat(80).bright_cyan());
    eprintln!("{} {}", "🔍 WSMAN REQUEST".bright_cyan().bold(), Utc::now().to_rfc3339().bright_black());
    eprintln!("{}", "═".repeat(80).bright_cyan());

    // Parse URL to show host and port
    if let Ok(parsed_url) = reqwest::Url::parse(url) {
        eprintln!("{}: {}", "URL".bright_yellow(), url);
        eprintln!("{}: {}", "Host".bright_yellow(), parsed_url.host_str().unwrap_or("unknown"));
        eprintln!(
            "{}: {}",
            "Port".bright_yellow(),
            parsed_url
                .port_or_known_default()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        eprintln!("{}: {}", "Scheme".bright_yellow(), parsed_url.scheme());
    } else {
        eprintln!("{}: {}", "URL".bright_yellow(), url);
    }
    eprintln!("{}: {}", "Action".bright_yellow(), action);

    eprintln!("\n{}", "Headers:".bright_yellow());
    eprintln!("  Content-Type: application/soap+xml;charset=UTF-8");
    if let Some(value) = authorization {
        eprintln!("  Authorization: {}", redact_authorization(value));
    }

    eprintln!("\n{}", "Request Body:".bright_yellow());
    print_body(body);
    eprintln!("{}", "═".repeat(80).bright_cyan());
}

/// Log the reply to a SOAP request (stderr, verbose only)
pub fn log_response(status: reqwest::StatusCode, body: &str, verbose: bool) {
    if !verbose {
        return;
    }

    let status_text = if status.is_success() {
        status.to_string().bright_green()
    } else {
        status.to_string().bright_red()
    };

    eprintln!("{}", "─".repeat(80).bright_black());
    eprintln!("{} {}", "📥 WSMAN RESPONSE".bright_cyan().bold(), status_text);
    print_body(body);
    eprintln!("{}", "═".repeat(80).bright_cyan());
    eprintln!();
}

/// Pretty-print a serializable summary of the session (stderr, verbose only)
pub fn log_session_summary<T: Serialize>(summary: &T, verbose: bool) {
    if !verbose {
        return;
    }

    match serde_json::to_string_pretty(summary) {
        Ok(json) => {
            eprintln!("{}", "🔧 Session configuration:".bright_cyan());
            eprintln!("{}", json.bright_black());
        }
        Err(e) => eprintln!("{}", format!("Error serializing session summary: {}", e).red()),
    }
}

fn print_body(body: &str) {
    // Truncate very long envelopes for readability
    if body.chars().count() > MAX_LOGGED_BODY_CHARS {
        eprintln!("{}", safe_truncate(body, MAX_LOGGED_BODY_CHARS));
        eprintln!("\n{}", format!("... (truncated, total {} bytes)", body.len()).bright_black());
    } else {
        eprintln!("{}", body);
    }
}
