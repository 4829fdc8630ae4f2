//! Canonicalization of request pieces into the exact bytes SigV4 hashes.

use percent_encoding::{percent_decode, percent_encode, utf8_percent_encode};

use crate::constants::{AWS_ENCODE_SET, EMPTY_STRING_SHA256};
use crate::error::{Error, Result};
use crate::hash::hex_sha256;
use crate::request::{Body, Headers};

/// Knobs for URI canonicalization.
///
/// The defaults match most AWS services. S3 keeps paths byte-for-byte and
/// percent-encodes only once.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalOptions {
    /// Resolve `.`/`..`/empty path segments before encoding.
    pub normalize_path: bool,
    /// Apply the percent-encoding pass twice.
    pub double_encode: bool,
}

impl Default for CanonicalOptions {
    fn default() -> Self {
        CanonicalOptions {
            normalize_path: true,
            double_encode: true,
        }
    }
}

impl CanonicalOptions {
    /// The S3 variant: no path normalization, single encoding pass.
    pub fn s3() -> Self {
        CanonicalOptions {
            normalize_path: false,
            double_encode: false,
        }
    }
}

/// Canonicalize a raw pathname.
///
/// Segments are percent-decoded, optionally normalized, then re-encoded
/// with the AWS unreserved set (twice unless `double_encode` is off, which
/// is how non-S3 services expect pre-encoded bytes to survive).
pub fn canonical_uri(pathname: &str, opts: &CanonicalOptions) -> String {
    let decoded: Vec<Vec<u8>> = pathname
        .split('/')
        .map(|seg| percent_decode(seg.as_bytes()).collect())
        .collect();

    let encode = |bytes: &[u8]| -> String {
        let once = percent_encode(bytes, &AWS_ENCODE_SET).to_string();
        if opts.double_encode {
            percent_encode(once.as_bytes(), &AWS_ENCODE_SET).to_string()
        } else {
            once
        }
    };

    if !opts.normalize_path {
        let joined = decoded
            .iter()
            .map(|seg| encode(seg))
            .collect::<Vec<_>>()
            .join("/");
        return if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        };
    }

    let mut resolved: Vec<Vec<u8>> = Vec::with_capacity(decoded.len());
    // Whether the path resolves onto a directory, i.e. the last meaningful
    // segment was `.`, `..` or empty.
    let mut trailing_slash = false;
    for seg in decoded {
        match seg.as_slice() {
            b"" | b"." => trailing_slash = true,
            b".." => {
                trailing_slash = true;
                resolved.pop();
            }
            _ => {
                trailing_slash = false;
                resolved.push(seg);
            }
        }
    }

    if resolved.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for seg in &resolved {
        out.push('/');
        out.push_str(&encode(seg));
    }
    if trailing_slash {
        out.push('/');
    }
    out
}

/// Canonicalize decoded query pairs.
///
/// Entries with empty names are dropped; pairs are encoded with the AWS
/// unreserved set and sorted by encoded name, then encoded value.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| {
            (
                utf8_percent_encode(name, &AWS_ENCODE_SET).to_string(),
                utf8_percent_encode(value, &AWS_ENCODE_SET).to_string(),
            )
        })
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonicalize headers into `(canonical_headers_block, signed_headers)`.
///
/// Names are lower-cased and sorted; values are trimmed with inner
/// whitespace runs collapsed to a single space. Two names that collide
/// after lower-casing are a fatal input error.
pub fn canonical_headers(headers: &Headers) -> Result<(String, String)> {
    let mut entries: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            let canonical = value.split_whitespace().collect::<Vec<_>>().join(" ");
            (name.to_ascii_lowercase(), canonical)
        })
        .collect();
    entries.sort();

    for pair in entries.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(Error::invalid_input(format!(
                "duplicate header {:?} after lower-casing",
                pair[0].0
            )));
        }
    }

    let signed_headers = entries
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let block = entries
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect::<String>();

    Ok((block, signed_headers))
}

/// Hex SHA-256 of the request body.
///
/// A missing body hashes like the empty string; a precomputed hash is
/// passed through untouched.
pub fn hash_body(body: Option<&Body>) -> String {
    match body {
        None => EMPTY_STRING_SHA256.to_string(),
        Some(Body::Hash(hash)) => hash.clone(),
        Some(Body::Bytes(bytes)) => hex_sha256(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_opts() -> CanonicalOptions {
        CanonicalOptions::default()
    }

    #[test]
    fn test_canonical_uri_normalizes() {
        let opts = default_opts();
        assert_eq!(canonical_uri("/a/b/../c/%2E./d", &opts), "/a/d");
        assert_eq!(canonical_uri("//%2f//", &opts), "/%252F/");
        assert_eq!(canonical_uri("/test\u{1F60A}", &opts), "/test%25F0%259F%2598%258A");
        assert_eq!(canonical_uri("", &opts), "/");
        assert_eq!(canonical_uri("/", &opts), "/");
        assert_eq!(canonical_uri("/a/", &opts), "/a/");
        assert_eq!(canonical_uri("/a/b/..", &opts), "/a/");
        assert_eq!(canonical_uri("/../..", &opts), "/");
    }

    #[test]
    fn test_canonical_uri_s3() {
        let opts = CanonicalOptions::s3();
        assert_eq!(canonical_uri("/root//folder A", &opts), "/root//folder%20A");
        assert_eq!(canonical_uri("/a/./b/../c", &opts), "/a/./b/../c");
        assert_eq!(canonical_uri("/test\u{1F60A}", &opts), "/test%F0%9F%98%8A");
        assert_eq!(canonical_uri("", &opts), "/");
    }

    #[test]
    fn test_canonical_uri_idempotent() {
        let opts = CanonicalOptions {
            normalize_path: true,
            double_encode: false,
        };
        for path in ["/a/b/../c/%2E./d", "/test\u{1F60A}", "//%2f//", "/a b/c"] {
            let once = canonical_uri(path, &opts);
            assert_eq!(canonical_uri(&once, &opts), once, "{path}");
        }
    }

    #[test]
    fn test_canonical_query() {
        assert_eq!(canonical_query(&[]), "");

        let params = vec![
            ("prefix".to_string(), "some/path".to_string()),
            ("list-type".to_string(), "2".to_string()),
            ("".to_string(), "dropped".to_string()),
            ("list-type".to_string(), "1".to_string()),
        ];
        assert_eq!(
            canonical_query(&params),
            "list-type=1&list-type=2&prefix=some%2Fpath"
        );

        // keys are ordered by their encoded form
        let sorted = canonical_query(&params);
        let keys: Vec<&str> = sorted
            .split('&')
            .map(|kv| kv.split('=').next().unwrap())
            .collect();
        let mut resorted = keys.clone();
        resorted.sort_unstable();
        assert_eq!(keys, resorted);
    }

    #[test]
    fn test_canonical_headers() {
        let headers = Headers::from_iter([
            ("Host", "s3.amazonaws.com"),
            ("X-Amz-Date", "20190901T084743Z"),
            ("Content-Type", "  text/plain;\t charset=utf-8  "),
        ]);
        let (block, signed) = canonical_headers(&headers).unwrap();
        assert_eq!(
            block,
            "content-type:text/plain; charset=utf-8\n\
             host:s3.amazonaws.com\n\
             x-amz-date:20190901T084743Z\n"
        );
        assert_eq!(signed, "content-type;host;x-amz-date");
    }

    #[test]
    fn test_canonical_headers_order_independent() {
        let a = Headers::from_iter([("b-header", "2"), ("a-header", "1"), ("c-header", "3")]);
        let b = Headers::from_iter([("c-header", "3"), ("a-header", "1"), ("b-header", "2")]);
        assert_eq!(canonical_headers(&a).unwrap(), canonical_headers(&b).unwrap());
    }

    #[test]
    fn test_canonical_headers_rejects_case_collision() {
        let headers = Headers::from_iter([("Foo", "1"), ("foo", "2")]);
        let err = canonical_headers(&headers).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_hash_body() {
        assert_eq!(hash_body(None), EMPTY_STRING_SHA256);
        assert_eq!(hash_body(Some(&Body::from(""))), EMPTY_STRING_SHA256);
        assert_eq!(
            hash_body(Some(&Body::Hash("cafe".to_string()))),
            "cafe"
        );
        assert_eq!(
            hash_body(Some(&Body::from("Hello,World!"))),
            hex_sha256(b"Hello,World!")
        );
    }
}
