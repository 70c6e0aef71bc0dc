//! NTLMv2 client authentication and message sealing
//!
//! Produces the NEGOTIATE and AUTHENTICATE tokens carried in the HTTP
//! `Negotiate` exchange and the session security used to seal WS-Management
//! traffic over plain HTTP.

mod crypto;
mod messages;
mod security;

use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

use messages::{authenticate_message, negotiate_message, Challenge, ClientNonce, Identity, NEGOTIATE_SEAL};

#[cfg(test)]
pub use messages::CLIENT_FLAGS;
pub use security::{SessionSecurity, SIGNATURE_LEN};

/// Seconds between 1601-01-01 and the Unix epoch
const FILETIME_EPOCH_OFFSET_SECS: u64 = 11_644_473_600;

/// Account used for the NTLM handshake
///
/// `DOMAIN\user` is split into its parts; any other form, including
/// `user@domain`, is sent as the user name with an empty domain.
pub struct NtlmCredentials {
    username: String,
    domain: String,
    password: String,
}

/// Outcome of answering a server challenge
pub struct Authenticated {
    /// The AUTHENTICATE token to send
    pub token: Vec<u8>,
    pub security: SessionSecurity,
    /// Whether the negotiated flags allow sealing
    pub can_seal: bool,
}

impl NtlmCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        let (domain, username) = match username.split_once('\\') {
            Some((domain, user)) => (domain, user),
            None => ("", username),
        };
        Self {
            username: username.to_string(),
            domain: domain.to_string(),
            password: password.to_string(),
        }
    }

    /// The NEGOTIATE token opening a handshake
    pub fn negotiate(&self) -> Vec<u8> {
        negotiate_message()
    }

    /// Answer the server's CHALLENGE token
    pub fn authenticate(&self, negotiate: &[u8], challenge: &[u8]) -> Result<Authenticated, String> {
        let mut nonce = ClientNonce {
            client_challenge: [0; 8],
            exported_session_key: [0; 16],
            filetime: filetime_now(),
        };
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut nonce.client_challenge);
        rng.fill_bytes(&mut nonce.exported_session_key);

        self.authenticate_with(negotiate, challenge, &nonce)
    }

    fn authenticate_with(&self, negotiate: &[u8], challenge: &[u8], nonce: &ClientNonce) -> Result<Authenticated, String> {
        let parsed = Challenge::parse(challenge)?;
        let identity = Identity {
            username: &self.username,
            domain: &self.domain,
            password: &self.password,
        };
        let auth = authenticate_message(&identity, negotiate, challenge, &parsed, nonce);

        Ok(Authenticated {
            token: auth.message,
            security: SessionSecurity::client(auth.exported_session_key, auth.flags),
            can_seal: auth.flags & NEGOTIATE_SEAL != 0,
        })
    }
}

/// Current time as a Windows FILETIME (100ns ticks since 1601)
fn filetime_now() -> u64 {
    let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    (since_epoch.as_secs() + FILETIME_EPOCH_OFFSET_SECS) * 10_000_000 + u64::from(since_epoch.subsec_nanos() / 100)
}
