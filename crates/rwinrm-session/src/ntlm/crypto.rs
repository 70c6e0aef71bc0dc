use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;
use rc4::consts::U16;
use rc4::{Key, KeyInit, Rc4, StreamCipher};

/// Every NTLMv2 key and digest is 16 bytes
pub type Key16 = [u8; 16];

type HmacMd5 = Hmac<Md5>;

fn to_key(bytes: &[u8]) -> Key16 {
    let mut key = [0u8; 16];
    key.copy_from_slice(&bytes[..16]);
    key
}

pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn md4(data: &[u8]) -> Key16 {
    to_key(&Md4::digest(data))
}

pub fn md5(parts: &[&[u8]]) -> Key16 {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    to_key(&hasher.finalize())
}

pub fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> Key16 {
    let mut mac = <HmacMd5 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    to_key(&mac.finalize().into_bytes())
}

/// NTOWFv2: the password hash keyed on the upper-cased user and the domain
pub fn nt_owf_v2(username: &str, domain: &str, password: &str) -> Key16 {
    let identity = format!("{}{}", username.to_uppercase(), domain);
    hmac_md5(&md4(&utf16le(password)), &[&utf16le(&identity)])
}

/// RC4 keystream that keeps its position across messages
pub struct Rc4Stream(Rc4<U16>);

impl Rc4Stream {
    pub fn new(key: &Key16) -> Self {
        Self(Rc4::new(Key::<U16>::from_slice(key)))
    }

    pub fn apply(&mut self, data: &mut [u8]) {
        self.0.apply_keystream(data);
    }
}

/// One-shot RC4 of a short buffer
pub fn rc4(key: &Key16, data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    Rc4Stream::new(key).apply(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_md4_known_digest() {
        assert_eq!(hex(&md4(b"abc")), "a448017aaf21d8525fc10ae87aa6729d");
    }

    #[test]
    fn test_nt_owf_v2_matches_published_vector() {
        assert_eq!(
            hex(&nt_owf_v2("User", "Domain", "Password")),
            "0c868a403bfd7a93a3001ef22ef02e3f"
        );
    }

    #[test]
    fn test_rc4_stream_continues_across_calls() {
        let key = [0x55u8; 16];
        let whole = rc4(&key, b"abcdef");

        let mut stream = Rc4Stream::new(&key);
        let mut first = *b"abc";
        let mut second = *b"def";
        stream.apply(&mut first);
        stream.apply(&mut second);

        assert_eq!(&whole[..3], &first);
        assert_eq!(&whole[3..], &second);
    }
}
