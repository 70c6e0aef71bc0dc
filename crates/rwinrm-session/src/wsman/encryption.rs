//! `multipart/encrypted` framing of sealed WS-Management messages

use rwinrm_types::SessionError;

use crate::ntlm::{SessionSecurity, SIGNATURE_LEN};

const PROTOCOL: &str = "application/HTTP-SPNEGO-session-encrypted";
const BOUNDARY: &[u8] = b"--Encrypted Boundary";
const PAYLOAD_HEADER: &[u8] = b"\tContent-Type: application/octet-stream\r\n";
const LENGTH_MARKER: &[u8] = b"Length=";

/// Request content type of a sealed message
pub const ENCRYPTED_CONTENT_TYPE: &str =
    "multipart/encrypted;protocol=\"application/HTTP-SPNEGO-session-encrypted\";boundary=\"Encrypted Boundary\"";

/// Whether a reply's content type announces a sealed body
pub fn is_encrypted(content_type: &str) -> bool {
    content_type.trim_start().starts_with("multipart/encrypted")
}

/// Seal an envelope and wrap it in the multipart framing
pub fn seal_envelope(security: &mut SessionSecurity, envelope: &str) -> Vec<u8> {
    let (sealed, signature) = security.wrap(envelope.as_bytes());

    let mut body = Vec::with_capacity(sealed.len() + 256);
    body.extend_from_slice(BOUNDARY);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("\tContent-Type: {}\r\n", PROTOCOL).as_bytes());
    body.extend_from_slice(
        format!(
            "\tOriginalContent: type=application/soap+xml;charset=UTF-8;Length={}\r\n",
            envelope.len()
        )
        .as_bytes(),
    );
    body.extend_from_slice(BOUNDARY);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(PAYLOAD_HEADER);
    body.extend_from_slice(&(SIGNATURE_LEN as u32).to_le_bytes());
    body.extend_from_slice(&signature);
    body.extend_from_slice(&sealed);
    body.extend_from_slice(BOUNDARY);
    body.extend_from_slice(b"--\r\n");
    body
}

/// Unseal a `multipart/encrypted` reply body
pub fn unseal_body(security: &mut SessionSecurity, body: &[u8]) -> Result<String, SessionError> {
    let malformed = |what: &str| SessionError::Transport(format!("malformed encrypted reply: {}", what));

    let expected_len = find(body, LENGTH_MARKER)
        .map(|at| {
            body[at + LENGTH_MARKER.len()..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0usize, |n, b| n * 10 + usize::from(b - b'0'))
        })
        .ok_or_else(|| malformed("no original length"))?;

    let start = find(body, PAYLOAD_HEADER).ok_or_else(|| malformed("no payload part"))? + PAYLOAD_HEADER.len();
    let end = rfind(body, BOUNDARY).filter(|&end| end >= start).ok_or_else(|| malformed("no closing boundary"))?;
    let payload = &body[start..end];

    if payload.len() < 4 {
        return Err(malformed("truncated payload"));
    }
    let signature_len = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let signature = payload
        .get(4..4 + signature_len)
        .ok_or_else(|| malformed("truncated signature"))?;
    let sealed = &payload[4 + signature_len..];

    let plain = security.unwrap(sealed, signature).map_err(|e| malformed(&e))?;
    if plain.len() != expected_len {
        return Err(malformed("length does not match the original content"));
    }

    String::from_utf8(plain).map_err(|_| malformed("envelope is not UTF-8"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|window| window == needle)
}
