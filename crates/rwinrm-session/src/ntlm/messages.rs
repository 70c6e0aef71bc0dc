use super::crypto::{hmac_md5, nt_owf_v2, rc4, utf16le, Key16};

pub const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
pub const REQUEST_TARGET: u32 = 0x0000_0004;
pub const NEGOTIATE_SIGN: u32 = 0x0000_0010;
pub const NEGOTIATE_SEAL: u32 = 0x0000_0020;
pub const NEGOTIATE_NTLM: u32 = 0x0000_0200;
pub const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
pub const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
pub const NEGOTIATE_TARGET_INFO: u32 = 0x0080_0000;
pub const NEGOTIATE_VERSION: u32 = 0x0200_0000;
pub const NEGOTIATE_128: u32 = 0x2000_0000;
pub const NEGOTIATE_KEY_EXCH: u32 = 0x4000_0000;
pub const NEGOTIATE_56: u32 = 0x8000_0000;

/// Everything the client offers in its NEGOTIATE message
pub const CLIENT_FLAGS: u32 = NEGOTIATE_UNICODE
    | REQUEST_TARGET
    | NEGOTIATE_SIGN
    | NEGOTIATE_SEAL
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_TARGET_INFO
    | NEGOTIATE_VERSION
    | NEGOTIATE_128
    | NEGOTIATE_KEY_EXCH
    | NEGOTIATE_56;

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";
/// Windows 6.1 build 7601, NTLM revision 15
const VERSION: [u8; 8] = [6, 1, 0xB1, 0x1D, 0, 0, 0, 0x0F];

const MSV_AV_EOL: u16 = 0;
const MSV_AV_FLAGS: u16 = 6;
const MSV_AV_TIMESTAMP: u16 = 7;
/// MsvAvFlags bit announcing a MIC in the AUTHENTICATE message
const AV_FLAG_MIC_PRESENT: u32 = 0x2;

const NEGOTIATE_LEN: usize = 40;
const AUTHENTICATE_HEADER_LEN: usize = 88;
const MIC_OFFSET: usize = 72;

/// Length/offset descriptor of a payload field
fn field(len: usize, offset: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..2].copy_from_slice(&(len as u16).to_le_bytes());
    out[2..4].copy_from_slice(&(len as u16).to_le_bytes());
    out[4..].copy_from_slice(&(offset as u32).to_le_bytes());
    out
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub fn negotiate_message() -> Vec<u8> {
    let mut msg = Vec::with_capacity(NEGOTIATE_LEN);
    msg.extend_from_slice(SIGNATURE);
    msg.extend_from_slice(&1u32.to_le_bytes());
    msg.extend_from_slice(&CLIENT_FLAGS.to_le_bytes());
    // No domain or workstation supplied
    msg.extend_from_slice(&field(0, NEGOTIATE_LEN));
    msg.extend_from_slice(&field(0, NEGOTIATE_LEN));
    msg.extend_from_slice(&VERSION);
    msg
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvPair {
    pub id: u16,
    pub value: Vec<u8>,
}

/// The server's CHALLENGE message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub flags: u32,
    pub server_challenge: [u8; 8],
    pub target_info: Vec<AvPair>,
}

impl Challenge {
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < 48 || &bytes[..8] != SIGNATURE {
            return Err("not an NTLMSSP message".to_string());
        }
        if read_u32(bytes, 8) != 2 {
            return Err(format!("expected a CHALLENGE message, got type {}", read_u32(bytes, 8)));
        }

        let mut server_challenge = [0u8; 8];
        server_challenge.copy_from_slice(&bytes[24..32]);

        let len = read_u16(bytes, 40) as usize;
        let offset = read_u32(bytes, 44) as usize;
        let info = bytes
            .get(offset..offset + len)
            .ok_or_else(|| "target info lies outside the message".to_string())?;

        Ok(Self {
            flags: read_u32(bytes, 20),
            server_challenge,
            target_info: parse_av_pairs(info)?,
        })
    }

    fn av_value(&self, id: u16) -> Option<&[u8]> {
        self.target_info
            .iter()
            .find(|pair| pair.id == id)
            .map(|pair| pair.value.as_slice())
    }

    /// Server FILETIME from MsvAvTimestamp
    pub fn timestamp(&self) -> Option<u64> {
        let value = self.av_value(MSV_AV_TIMESTAMP)?;
        let bytes: [u8; 8] = value.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    fn av_flags(&self) -> u32 {
        self.av_value(MSV_AV_FLAGS)
            .filter(|value| value.len() == 4)
            .map(|value| read_u32(value, 0))
            .unwrap_or(0)
    }
}

fn parse_av_pairs(mut data: &[u8]) -> Result<Vec<AvPair>, String> {
    let mut pairs = Vec::new();
    while data.len() >= 4 {
        let id = read_u16(data, 0);
        let len = read_u16(data, 2) as usize;
        if id == MSV_AV_EOL {
            return Ok(pairs);
        }
        let value = data
            .get(4..4 + len)
            .ok_or_else(|| "truncated target info".to_string())?;
        pairs.push(AvPair {
            id,
            value: value.to_vec(),
        });
        data = &data[4 + len..];
    }
    Err("target info is not terminated".to_string())
}

/// Account the AUTHENTICATE message is computed for
pub struct Identity<'a> {
    pub username: &'a str,
    pub domain: &'a str,
    pub password: &'a str,
}

/// Client-chosen random values
#[derive(Debug, Clone)]
pub struct ClientNonce {
    pub client_challenge: [u8; 8],
    pub exported_session_key: Key16,
    /// Used when the server sends no timestamp
    pub filetime: u64,
}

/// A finished AUTHENTICATE message plus the keys it established
pub struct Authenticate {
    pub message: Vec<u8>,
    pub flags: u32,
    pub exported_session_key: Key16,
}

/// Compute the NTLMv2 AUTHENTICATE message answering `challenge`
///
/// `negotiate` and `challenge_bytes` are the raw messages exchanged so far;
/// they enter the MIC when the server sent a timestamp.
pub fn authenticate_message(
    identity: &Identity<'_>,
    negotiate: &[u8],
    challenge_bytes: &[u8],
    challenge: &Challenge,
    nonce: &ClientNonce,
) -> Authenticate {
    let flags = (challenge.flags & CLIENT_FLAGS) | NEGOTIATE_UNICODE;
    let server_timestamp = challenge.timestamp();
    let with_mic = server_timestamp.is_some();
    let timestamp = server_timestamp.unwrap_or(nonce.filetime);
    let response_key = nt_owf_v2(identity.username, identity.domain, identity.password);
    let client_challenge = nonce.client_challenge;

    // Echo the server's target info, announcing the MIC in MsvAvFlags
    let mut av_pairs = Vec::new();
    for pair in &challenge.target_info {
        if pair.id != MSV_AV_FLAGS {
            push_av_pair(&mut av_pairs, pair.id, &pair.value);
        }
    }
    let av_flags = challenge.av_flags() | if with_mic { AV_FLAG_MIC_PRESENT } else { 0 };
    if av_flags != 0 {
        push_av_pair(&mut av_pairs, MSV_AV_FLAGS, &av_flags.to_le_bytes());
    }
    push_av_pair(&mut av_pairs, MSV_AV_EOL, &[]);

    let mut temp = vec![1, 1, 0, 0, 0, 0, 0, 0];
    temp.extend_from_slice(&timestamp.to_le_bytes());
    temp.extend_from_slice(&client_challenge);
    temp.extend_from_slice(&[0; 4]);
    temp.extend_from_slice(&av_pairs);
    temp.extend_from_slice(&[0; 4]);

    let nt_proof = hmac_md5(&response_key, &[&challenge.server_challenge[..], &temp[..]]);
    let nt_response = [&nt_proof[..], &temp[..]].concat();
    let lm_response = if with_mic {
        vec![0; 24]
    } else {
        let proof = hmac_md5(&response_key, &[&challenge.server_challenge[..], &client_challenge[..]]);
        [&proof[..], &client_challenge[..]].concat()
    };

    let session_base_key = hmac_md5(&response_key, &[&nt_proof[..]]);
    let (exported_session_key, encrypted_session_key) = if flags & NEGOTIATE_KEY_EXCH != 0 {
        (
            nonce.exported_session_key,
            rc4(&session_base_key, &nonce.exported_session_key),
        )
    } else {
        (session_base_key, Vec::new())
    };

    let payload_parts = [
        lm_response,
        nt_response,
        utf16le(identity.domain),
        utf16le(identity.username),
        Vec::new(),
        encrypted_session_key,
    ];

    let mut message = Vec::with_capacity(AUTHENTICATE_HEADER_LEN + 256);
    message.extend_from_slice(SIGNATURE);
    message.extend_from_slice(&3u32.to_le_bytes());
    let mut offset = AUTHENTICATE_HEADER_LEN;
    for part in &payload_parts {
        message.extend_from_slice(&field(part.len(), offset));
        offset += part.len();
    }
    message.extend_from_slice(&flags.to_le_bytes());
    message.extend_from_slice(&VERSION);
    message.extend_from_slice(&[0; 16]);
    for part in &payload_parts {
        message.extend_from_slice(part);
    }

    if with_mic {
        let mic = hmac_md5(&exported_session_key, &[negotiate, challenge_bytes, &message[..]]);
        message[MIC_OFFSET..MIC_OFFSET + 16].copy_from_slice(&mic);
    }

    Authenticate {
        message,
        flags,
        exported_session_key,
    }
}

fn push_av_pair(out: &mut Vec<u8>, id: u16, value: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    out.extend_from_slice(value);
}
