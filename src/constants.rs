use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Headers used in SigV4 signing.
pub const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_DECODED_CONTENT_LENGTH: &str = "x-amz-decoded-content-length";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

// Query parameters used in presigned URLs.
pub const X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";
pub const X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";
pub const X_AMZ_DATE_QUERY: &str = "X-Amz-Date";
pub const X_AMZ_EXPIRES: &str = "X-Amz-Expires";
pub const X_AMZ_SECURITY_TOKEN_QUERY: &str = "X-Amz-Security-Token";
pub const X_AMZ_SIGNATURE: &str = "X-Amz-Signature";
pub const X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";

/// Signing algorithm for HTTP requests and presigned URLs.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// Signing algorithm for chained payload chunks and events.
pub const ALGORITHM_PAYLOAD: &str = "AWS4-HMAC-SHA256-PAYLOAD";

/// Body hash sentinel for payloads that are not covered by the signature.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
/// Body hash sentinel announcing an aws-chunked signed payload stream.
pub const STREAMING_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";

/// Hex SHA-256 of the empty string.
pub const EMPTY_STRING_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Default and maximum value for `X-Amz-Expires`: 7 days in seconds.
pub const PRESIGN_EXPIRES_MAX: u64 = 604800;

/// AsciiSet for [AWS UriEncode](https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html)
///
/// - URI encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z',
///   '0'-'9', '-', '.', '_', and '~'.
///
/// Applied per path segment and to query names and values, so '/' is encoded.
pub static AWS_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
