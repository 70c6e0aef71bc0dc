use base64::prelude::*;
use regex::bytes::{Captures, Regex};
use rwinrm_types::CLIXML_MARKER;
use std::sync::OnceLock;

/// Encode a script for `powershell -encodedcommand`: base64 of UTF-16LE
pub fn encode_command(script: &str) -> String {
    let utf16: Vec<u8> = script.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
    BASE64_STANDARD.encode(utf16)
}

fn error_record_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<S S="Error">(.*?)</S>"#).expect("error record pattern is valid"))
}

fn escaped_char_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").expect("escape pattern is valid"))
}

/// Turn a CLIXML diagnostic stream into the plain text of its error records
///
/// Streams that are not CLIXML, or that hold no error records (progress and
/// verbose output only), are returned unchanged. Bytes are kept in the
/// remote code page; only markup is removed.
pub fn clean_clixml(stderr: &[u8]) -> Vec<u8> {
    if !stderr.starts_with(CLIXML_MARKER.as_bytes()) {
        return stderr.to_vec();
    }

    let mut message = Vec::new();
    for caps in error_record_regex().captures_iter(stderr) {
        message.extend_from_slice(&unescape(&caps[1]));
    }

    let trimmed = message.trim_ascii();
    if trimmed.is_empty() {
        stderr.to_vec()
    } else {
        trimmed.to_vec()
    }
}

fn unescape(text: &[u8]) -> Vec<u8> {
    // _xHHHH_ carries control characters; only the ASCII range maps to one byte
    let text = escaped_char_regex().replace_all(text, |caps: &Captures| {
        let code = std::str::from_utf8(&caps[1])
            .ok()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .filter(|byte| byte.is_ascii());
        match code {
            Some(byte) => vec![byte],
            None => caps[0].to_vec(),
        }
    });

    let mut out = text.into_owned();
    for (entity, plain) in XML_ENTITIES {
        out = replace_bytes(&out, entity, plain);
    }
    out
}

// `&amp;` goes last so escaped entities stay literal
const XML_ENTITIES: [(&[u8], &[u8]); 5] = [
    (b"&lt;", b"<"),
    (b"&gt;", b">"),
    (b"&quot;", b"\""),
    (b"&apos;", b"'"),
    (b"&amp;", b"&"),
];

fn replace_bytes(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command_is_utf16le_base64() {
        // "dir" -> 64 00 69 00 72 00
        assert_eq!(encode_command("dir"), "ZABpAHIA");
        assert_eq!(encode_command(""), "");
    }

    #[test]
    fn test_plain_stderr_is_untouched() {
        assert_eq!(clean_clixml(b"Access is denied."), b"Access is denied.".to_vec());
    }

    #[test]
    fn test_progress_only_clixml_is_kept() {
        let raw = b"#< CLIXML\r\n<Objs Version=\"1.1.0.1\"><Obj S=\"progress\" RefId=\"0\"><TN RefId=\"0\"><T>System.Management.Automation.PSCustomObject</T></TN></Obj></Objs>";
        assert_eq!(clean_clixml(raw), raw.to_vec());
    }

    #[test]
    fn test_error_records_are_extracted() {
        let raw = b"#< CLIXML\r\n<Objs Version=\"1.1.0.1\" xmlns=\"http://schemas.microsoft.com/powershell/2004/04\"><S S=\"Error\">Get-Item : Cannot find path 'C:\\nope'_x000D__x000A_</S><S S=\"Error\">    + CategoryInfo &lt;ObjectNotFound&gt;_x000D__x000A_</S></Objs>";
        let cleaned = clean_clixml(raw);
        assert_eq!(
            String::from_utf8(cleaned).unwrap(),
            "Get-Item : Cannot find path 'C:\\nope'\r\n    + CategoryInfo <ObjectNotFound>"
        );
    }

    #[test]
    fn test_ampersand_unescaped_last() {
        assert_eq!(unescape(b"&amp;lt;"), b"&lt;".to_vec());
    }
}
