use regex::Regex;
use rwinrm_types::{Encryption, SessionError, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT, DEFAULT_WSMAN_PATH};
use std::sync::OnceLock;

fn target_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?P<scheme>https?)://)?(?P<host>\[[0-9a-f:.]+\]|[0-9a-z\-_.]+)(?::(?P<port>\d+))?(?P<path>/\S*)?$",
        )
        .expect("endpoint pattern is valid")
    })
}

/// Build the WS-Management endpoint URL for a target
///
/// Accepts `host`, `host:port` or `scheme://host[:port][/path]`. Missing parts
/// are filled from the encryption policy: `https`/5986 or `http`/5985, and the
/// `wsman` path.
pub fn build_endpoint(target: &str, encryption: Encryption) -> Result<String, SessionError> {
    let target = target.trim();
    let caps = target_regex()
        .captures(target)
        .ok_or_else(|| SessionError::ConnectionSetup(format!("invalid target host '{}'", target)))?;

    let scheme = match caps.name("scheme") {
        Some(m) => m.as_str().to_lowercase(),
        None => match encryption {
            Encryption::Ssl => "https".to_string(),
            Encryption::Plaintext => "http".to_string(),
        },
    };

    let port = match caps.name("port") {
        Some(m) => match m.as_str().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                return Err(SessionError::ConnectionSetup(format!(
                    "invalid port '{}' in target '{}'",
                    m.as_str(),
                    target
                )))
            }
        },
        None if scheme == "https" => DEFAULT_HTTPS_PORT,
        None => DEFAULT_HTTP_PORT,
    };

    let path = caps
        .name("path")
        .map(|m| m.as_str().trim_start_matches('/'))
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_WSMAN_PATH);

    Ok(format!("{}://{}:{}/{}", scheme, &caps["host"], port, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_uses_encryption_defaults() {
        assert_eq!(
            build_endpoint("winbox", Encryption::Ssl).unwrap(),
            "https://winbox:5986/wsman"
        );
        assert_eq!(
            build_endpoint("winbox", Encryption::Plaintext).unwrap(),
            "http://winbox:5985/wsman"
        );
    }

    #[test]
    fn test_explicit_parts_are_kept() {
        assert_eq!(
            build_endpoint("10.0.0.5:8443", Encryption::Ssl).unwrap(),
            "https://10.0.0.5:8443/wsman"
        );
        assert_eq!(
            build_endpoint("HTTP://winbox/custom/path", Encryption::Ssl).unwrap(),
            "http://winbox:5985/custom/path"
        );
        assert_eq!(
            build_endpoint("https://[fe80::1]:5986/wsman", Encryption::Plaintext).unwrap(),
            "https://[fe80::1]:5986/wsman"
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(
            build_endpoint("  winbox.corp.local ", Encryption::Ssl).unwrap(),
            "https://winbox.corp.local:5986/wsman"
        );
    }

    #[test]
    fn test_invalid_targets_fail_setup() {
        for target in ["", "win box", "ftp://winbox", "winbox:99999", "winbox:0", "winbox:port"] {
            match build_endpoint(target, Encryption::Ssl) {
                Err(SessionError::ConnectionSetup(_)) => {}
                other => panic!("expected setup error for {:?}, got {:?}", target, other),
            }
        }
    }
}
