//! The digest primitives shared by the signing flavors: SHA-256 for body
//! and canonical-request digests, HMAC-SHA256 for the key chain and
//! signatures, Base64 for the POST policy, CRC-32 for event frames.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `content`.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// HMAC-SHA256 of `content` under `key`, as the raw 32-byte MAC.
///
/// Every step of the SigV4 key chain feeds one of these MACs back in as
/// the next key; signatures hex-encode the final one. The HMAC
/// construction accepts keys of any length.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("any key length is accepted");
    mac.update(content);
    mac.finalize().into_bytes().into()
}

/// Base64 of `content`, standard alphabet with padding.
pub fn base64_encode(content: &[u8]) -> String {
    BASE64_STANDARD.encode(content)
}

/// CRC-32 (IEEE, reflected) of `content`.
pub fn crc32(content: &[u8]) -> u32 {
    crc32fast::hash(content)
}
