//! Startup configuration helpers
//!
//! The output encoding is resolved once here and threaded through the rest of
//! the program as a value.

use anyhow::{anyhow, Result};
use encoding_rs::{Encoding, UTF_8};
use std::env;

/// Locale variables consulted, in precedence order
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

/// Resolve `--encoding`, or the terminal's encoding when the flag is absent
///
/// Labels are WHATWG encoding labels. DOS code pages such as cp437 or cp850
/// have no label there; they are not needed because the remote shell is
/// switched to the code page of the chosen encoding.
pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    let Some(label) = label else {
        return Ok(default_stream_encoding());
    };

    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        if is_code_page_label(label) {
            anyhow!(
                "Unsupported encoding: '{}'. DOS code pages are not available; \
                 use a WHATWG label such as utf-8 or windows-1252",
                label
            )
        } else {
            anyhow!("Unknown encoding: '{}'", label)
        }
    })
}

/// `cp850`, `ibm437`, `oem-850` and bare numbers name a code page
fn is_code_page_label(label: &str) -> bool {
    let label = label.trim().to_ascii_lowercase();
    let number = ["cp", "ibm", "oem"]
        .iter()
        .find_map(|prefix| label.strip_prefix(prefix))
        .unwrap_or(&label)
        .trim_start_matches(['-', '_']);
    !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())
}

/// Encoding of the terminal's output stream, UTF-8 when it cannot be told
pub fn default_stream_encoding() -> &'static Encoding {
    let locale = LOCALE_VARS
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty());

    locale
        .as_deref()
        .and_then(locale_charset)
        .and_then(|charset| Encoding::for_label(charset.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Charset part of a POSIX locale name: `de_DE.ISO-8859-1@euro` → `ISO-8859-1`
pub fn locale_charset(locale: &str) -> Option<&str> {
    let (_, rest) = locale.split_once('.')?;
    let charset = rest.split('@').next().unwrap_or(rest);
    if charset.is_empty() {
        None
    } else {
        Some(charset)
    }
}
