//! Signing key derivation and the primitive string-to-sign operations
//! shared by every SigV4 flavor.

use log::debug;

use crate::constants::ALGORITHM_PAYLOAD;
use crate::hash::hmac_sha256;

/// A derived signing key together with the credential scope it is bound to.
///
/// Pure data: reusable for as long as `(date, region, service, secret)` is
/// unchanged. Equal scopes imply equal keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningData {
    key: [u8; 32],
    scope: String,
}

impl SigningData {
    /// The derived 32-byte HMAC key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The scope string, `YYYYMMDD/REGION/SERVICE/aws4_request`.
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// Derive the SigV4 signing key for a date, region and service.
///
/// `date_stamp` is truncated to its first 8 characters so a full
/// `YYYYMMDDTHHMMSSZ` timestamp also works.
pub fn derive(date_stamp: &str, secret_key: &str, region: &str, service: &str) -> SigningData {
    let date = &date_stamp[..date_stamp.len().min(8)];

    // Each step keys the next MAC, starting from "AWS4" || secret.
    let secret = format!("AWS4{secret_key}");
    let sign_date = hmac_sha256(secret.as_bytes(), date.as_bytes());
    let sign_region = hmac_sha256(&sign_date, region.as_bytes());
    let sign_service = hmac_sha256(&sign_region, service.as_bytes());
    let key = hmac_sha256(&sign_service, "aws4_request".as_bytes());

    SigningData {
        key,
        scope: format!("{date}/{region}/{service}/aws4_request"),
    }
}

/// One-slot memo over [`derive`].
///
/// Remembers the most recent `(date, region, service, secret)` and hands
/// back the cached [`SigningData`] while the tuple is unchanged. Not
/// internally synchronized: own one per thread or wrap it in a lock for
/// concurrent use.
#[derive(Debug, Default)]
pub struct DerivationCache {
    slot: Option<(CacheKey, SigningData)>,
}

#[derive(Debug, PartialEq, Eq)]
struct CacheKey {
    date: String,
    region: String,
    service: String,
    secret: String,
}

impl DerivationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a signing key, reusing the cached one when the inputs match
    /// the previous call.
    pub fn derive(
        &mut self,
        date_stamp: &str,
        secret_key: &str,
        region: &str,
        service: &str,
    ) -> SigningData {
        let key = CacheKey {
            date: date_stamp[..date_stamp.len().min(8)].to_string(),
            region: region.to_string(),
            service: service.to_string(),
            secret: secret_key.to_string(),
        };
        if let Some((cached_key, signing)) = &self.slot {
            if *cached_key == key {
                return signing.clone();
            }
        }
        let signing = derive(date_stamp, secret_key, region, service);
        self.slot = Some((key, signing.clone()));
        signing
    }
}

/// HMAC-SHA256 over `content` with `key`, the 32-byte raw MAC.
pub fn sign_string(key: &[u8], content: &[u8]) -> [u8; 32] {
    hmac_sha256(key, content)
}

/// Sign a payload digest: the hex HMAC of
/// `algorithm \n timestamp \n scope \n payload_digest` under the derived key.
pub fn sign_digest(
    payload_digest: &str,
    timestamp: &str,
    signing: &SigningData,
    algorithm: &str,
) -> String {
    let string_to_sign = format!(
        "{algorithm}\n{timestamp}\n{}\n{payload_digest}",
        signing.scope()
    );
    debug!("calculated string to sign: {string_to_sign}");

    hex::encode(sign_string(signing.key(), string_to_sign.as_bytes()))
}

/// Sign one chunk or event of a chained payload stream.
///
/// The digest covers the previous signature, the canonical headers digest
/// (the empty-string digest for S3 chunks) and the payload digest.
pub fn sign_chunk_digest(
    last_signature: &str,
    headers_digest: &str,
    payload_digest: &str,
    timestamp: &str,
    signing: &SigningData,
) -> String {
    sign_digest(
        &format!("{last_signature}\n{headers_digest}\n{payload_digest}"),
        timestamp,
        signing,
        ALGORITHM_PAYLOAD,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";

    #[test]
    fn test_derive() {
        let signing = derive("20190901", SECRET, "us-east-1", "s3");
        assert_eq!(signing.scope(), "20190901/us-east-1/s3/aws4_request");
        assert_eq!(
            hex::encode(signing.key()),
            "a638998a400ddba1af686a4ed4204c3fc9c47af46cb96c931e56dd3d8ab85d92"
        );
    }

    #[test]
    fn test_derive_truncates_timestamps() {
        let from_date = derive("20190901", SECRET, "us-east-1", "s3");
        let from_timestamp = derive("20190901T084743Z", SECRET, "us-east-1", "s3");
        assert_eq!(from_date, from_timestamp);
    }

    #[test]
    fn test_cache_matches_reference() {
        let mut cache = DerivationCache::new();
        let calls = [
            ("20190901", "us-east-1", "s3"),
            ("20190901", "us-east-1", "s3"),
            ("20190902", "us-east-1", "s3"),
            ("20190902", "us-west-2", "s3"),
            ("20190902", "us-west-2", "iam"),
            ("20190901", "us-east-1", "s3"),
        ];
        for (date, region, service) in calls {
            let cached = cache.derive(date, SECRET, region, service);
            let reference = derive(date, SECRET, region, service);
            assert_eq!(cached, reference);
        }
    }

    #[test]
    fn test_cache_distinguishes_secrets() {
        let mut cache = DerivationCache::new();
        let a = cache.derive("20190901", SECRET, "us-east-1", "s3");
        let b = cache.derive("20190901", "other", "us-east-1", "s3");
        assert_ne!(a, b);
        assert_eq!(b, derive("20190901", "other", "us-east-1", "s3"));
    }

    #[test]
    fn test_sign_string_is_raw_hmac() {
        let signing = derive("20190901", SECRET, "us-east-1", "s3");
        let mac = sign_string(signing.key(), b"payload");
        assert_eq!(
            hex::encode(mac),
            "67043b2f1e0464a72757c3dff31f9feb35ee6a5cfb8bf7296659f10c58b85ddd"
        );
    }

    #[test]
    fn test_sign_digest_string_shape() {
        let signing = derive("20130524", SECRET, "us-east-1", "s3");
        let by_digest = sign_digest(
            "4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
             bf718b6f653bebc184e1479f1935b8da974d701b893afcf49e701f3e2f9f9c5a",
            "20130524T000000Z",
            &signing,
            crate::constants::ALGORITHM_PAYLOAD,
        );
        let by_chunk = sign_chunk_digest(
            "4f232c4386841ef735655705268965c44a0e4690baa4adea153f7db9fa80a0a9",
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            "bf718b6f653bebc184e1479f1935b8da974d701b893afcf49e701f3e2f9f9c5a",
            "20130524T000000Z",
            &signing,
        );
        assert_eq!(by_digest, by_chunk);
        assert_eq!(
            by_chunk,
            "ad80c730a21e5b8d04586a2213dd63b9a0e99e0e2307b0ade35a65485a288648"
        );
    }
}
