use super::crypto::{hmac_md5, md5, Key16, Rc4Stream};
use super::messages::{NEGOTIATE_128, NEGOTIATE_56, NEGOTIATE_KEY_EXCH};

const CLIENT_SIGNING: &[u8] = b"session key to client-to-server signing key magic constant\0";
const SERVER_SIGNING: &[u8] = b"session key to server-to-client signing key magic constant\0";
const CLIENT_SEALING: &[u8] = b"session key to client-to-server sealing key magic constant\0";
const SERVER_SEALING: &[u8] = b"session key to server-to-client sealing key magic constant\0";

/// Length of an NTLMSSP message signature
pub const SIGNATURE_LEN: usize = 16;

/// Which side of the connection a key set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Client,
    #[cfg_attr(not(test), allow(dead_code))]
    Server,
}

struct Direction {
    signing_key: Key16,
    sealing: Rc4Stream,
    seq_num: u32,
}

impl Direction {
    fn new(exported_key: &Key16, flags: u32, signing: &[u8], sealing: &[u8]) -> Self {
        Self {
            signing_key: md5(&[&exported_key[..], signing]),
            sealing: Rc4Stream::new(&md5(&[sealing_key_material(exported_key, flags), sealing])),
            seq_num: 0,
        }
    }

    /// Checksum of a plaintext message; advances the RC4 stream under key exchange
    fn signature(&mut self, message: &[u8], flags: u32) -> [u8; SIGNATURE_LEN] {
        let seq = self.seq_num.to_le_bytes();
        let mut checksum = [0u8; 8];
        checksum.copy_from_slice(&hmac_md5(&self.signing_key, &[&seq[..], message])[..8]);
        if flags & NEGOTIATE_KEY_EXCH != 0 {
            self.sealing.apply(&mut checksum);
        }

        let mut signature = [0u8; SIGNATURE_LEN];
        signature[..4].copy_from_slice(&1u32.to_le_bytes());
        signature[4..12].copy_from_slice(&checksum);
        signature[12..].copy_from_slice(&seq);
        self.seq_num = self.seq_num.wrapping_add(1);
        signature
    }
}

/// Exported key bytes fed into the sealing key derivation
fn sealing_key_material(exported_key: &Key16, flags: u32) -> &[u8] {
    if flags & NEGOTIATE_128 != 0 {
        &exported_key[..]
    } else if flags & NEGOTIATE_56 != 0 {
        &exported_key[..7]
    } else {
        &exported_key[..5]
    }
}

/// NTLMv2 session security with extended session security
///
/// Outgoing messages are sealed and signed with the client keys, replies are
/// unsealed and verified with the server keys. Both directions keep their
/// own RC4 stream and sequence number for the lifetime of the connection.
pub struct SessionSecurity {
    flags: u32,
    outgoing: Direction,
    incoming: Direction,
}

impl SessionSecurity {
    pub fn client(exported_key: Key16, flags: u32) -> Self {
        Self::for_side(exported_key, flags, Side::Client)
    }

    /// Key set of the other end, for exercising replies
    #[cfg(test)]
    pub(crate) fn server(exported_key: Key16, flags: u32) -> Self {
        Self::for_side(exported_key, flags, Side::Server)
    }

    fn for_side(exported_key: Key16, flags: u32, side: Side) -> Self {
        let client = Direction::new(&exported_key, flags, CLIENT_SIGNING, CLIENT_SEALING);
        let server = Direction::new(&exported_key, flags, SERVER_SIGNING, SERVER_SEALING);
        let (outgoing, incoming) = match side {
            Side::Client => (client, server),
            Side::Server => (server, client),
        };
        Self {
            flags,
            outgoing,
            incoming,
        }
    }

    /// Seal a message, returning the ciphertext and its signature
    pub fn wrap(&mut self, message: &[u8]) -> (Vec<u8>, [u8; SIGNATURE_LEN]) {
        let mut sealed = message.to_vec();
        self.outgoing.sealing.apply(&mut sealed);
        let signature = self.outgoing.signature(message, self.flags);
        (sealed, signature)
    }

    /// Unseal a message and verify its signature
    pub fn unwrap(&mut self, sealed: &[u8], signature: &[u8]) -> Result<Vec<u8>, String> {
        let mut message = sealed.to_vec();
        self.incoming.sealing.apply(&mut message);
        let expected = self.incoming.signature(&message, self.flags);
        if signature != expected.as_slice() {
            return Err("message signature does not match".to_string());
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntlm::crypto::utf16le;
    use crate::ntlm::messages::{NEGOTIATE_SEAL, NEGOTIATE_SIGN};

    const FLAGS: u32 = NEGOTIATE_KEY_EXCH | NEGOTIATE_128 | NEGOTIATE_SEAL | NEGOTIATE_SIGN;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_wrap_matches_published_vector() {
        let mut security = SessionSecurity::client([0x55; 16], FLAGS);
        let (sealed, signature) = security.wrap(&utf16le("Plaintext"));

        assert_eq!(hex(&sealed), "54e50165bf1936dc996020c1811b0f06fb5f");
        assert_eq!(hex(&signature), "010000007fb38ec5c55d497600000000");
    }

    #[test]
    fn test_server_replies_unwrap_in_sequence() {
        let mut client = SessionSecurity::client([0x11; 16], FLAGS);
        let mut server = SessionSecurity::server([0x11; 16], FLAGS);

        for reply in ["<s:Envelope/>", "second reply"] {
            let (sealed, signature) = server.wrap(reply.as_bytes());
            assert_ne!(sealed, reply.as_bytes());
            assert_eq!(client.unwrap(&sealed, &signature).unwrap(), reply.as_bytes());
        }
    }

    #[test]
    fn test_tampered_reply_is_rejected() {
        let mut client = SessionSecurity::client([0x22; 16], FLAGS);
        let mut server = SessionSecurity::server([0x22; 16], FLAGS);

        let (mut sealed, signature) = server.wrap(b"exit code 0");
        sealed[0] ^= 0x01;
        assert!(client.unwrap(&sealed, &signature).is_err());
    }
}
