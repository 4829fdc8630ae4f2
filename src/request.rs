//! The request description that signers consume.
//!
//! [`SignedRequest`] is deliberately looser than `http::Request`: the URL may
//! be an opaque string that is parsed lazily (and leniently, so raw unencoded
//! paths survive until canonicalization), and headers keep their original
//! casing while being looked up case-insensitively.

use std::fmt::Write as _;

use bytes::Bytes;
use http::Method;

use crate::error::{Error, Result};

/// The URL of a request to sign.
#[derive(Debug, Clone)]
pub enum Url {
    /// An opaque URL string, parsed on demand.
    Raw(String),
    /// Structured URL components. The scheme is always `https`.
    Parts {
        /// Host, e.g. `examplebucket.s3.amazonaws.com`.
        host: Option<String>,
        /// Raw pathname, percent-encoded as it should appear on the wire.
        pathname: Option<String>,
        /// Decoded query pairs, duplicates preserved in order.
        search_params: Vec<(String, String)>,
    },
}

impl From<&str> for Url {
    fn from(value: &str) -> Self {
        Url::Raw(value.to_string())
    }
}

impl From<String> for Url {
    fn from(value: String) -> Self {
        Url::Raw(value)
    }
}

/// Parsed view over a [`Url`], shared by every signer.
#[derive(Debug, Clone)]
pub struct UrlComponents {
    /// Scheme, when the source URL named one.
    pub scheme: Option<String>,
    /// Host, including any port.
    pub host: Option<String>,
    /// Raw pathname, defaulting to `/`.
    pub pathname: String,
    /// Decoded query pairs, duplicates preserved in order.
    pub query: Vec<(String, String)>,
}

impl Url {
    /// Decompose into scheme, host, pathname and decoded query pairs.
    ///
    /// Parsing is lenient: bytes that stricter URL types reject (spaces,
    /// non-ASCII) are carried through untouched and dealt with during
    /// canonicalization.
    pub fn components(&self) -> UrlComponents {
        match self {
            Url::Raw(s) => parse_raw(s),
            Url::Parts {
                host,
                pathname,
                search_params,
            } => UrlComponents {
                scheme: None,
                host: host.clone().filter(|h| !h.is_empty()),
                pathname: match pathname {
                    Some(p) if !p.is_empty() => p.clone(),
                    _ => "/".to_string(),
                },
                query: search_params.clone(),
            },
        }
    }

    /// Render back into a `scheme://host/pathname?query` string.
    ///
    /// The scheme defaults to `https` and the pathname to `/`. A missing
    /// host is a fatal input error.
    pub fn to_url(&self) -> Result<String> {
        if let Url::Raw(s) = self {
            return Ok(s.clone());
        }

        let c = self.components();
        let host = c.host.as_deref().ok_or_else(|| {
            if c.pathname != "/" {
                Error::invalid_input(format!(
                    "url with pathname {:?} has no host to resolve against",
                    c.pathname
                ))
            } else {
                Error::invalid_input("url has no host")
            }
        })?;

        let mut url = format!(
            "{}://{}{}",
            c.scheme.as_deref().unwrap_or("https"),
            host,
            c.pathname
        );
        if !c.query.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            serializer.extend_pairs(c.query.iter());
            write!(url, "?{}", serializer.finish())?;
        }
        Ok(url)
    }

    /// Append query parameters, preserving everything already present.
    pub(crate) fn push_query(&mut self, params: &[(String, String)]) {
        match self {
            Url::Parts { search_params, .. } => {
                search_params.extend(params.iter().cloned());
            }
            Url::Raw(s) => {
                for (k, v) in params {
                    s.push(if s.contains('?') { '&' } else { '?' });
                    let mut serializer = form_urlencoded::Serializer::new(String::new());
                    serializer.append_pair(k, v);
                    s.push_str(&serializer.finish());
                }
            }
        }
    }
}

fn parse_raw(s: &str) -> UrlComponents {
    let (scheme, rest) = match s.split_once("://") {
        Some((scheme, rest)) => (Some(scheme.to_string()), rest),
        // No scheme: the whole string is a pathname with optional query.
        None => {
            let (pathname, query) = split_path_query(s);
            return UrlComponents {
                scheme: None,
                host: None,
                pathname,
                query,
            };
        }
    };

    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    let host = &rest[..end];
    let (pathname, query) = split_path_query(&rest[end..]);

    UrlComponents {
        scheme,
        host: (!host.is_empty()).then(|| host.to_string()),
        pathname,
        query,
    }
}

fn split_path_query(s: &str) -> (String, Vec<(String, String)>) {
    let (path, query) = match s.split_once('?') {
        Some((path, query)) => (path, query),
        None => (s, ""),
    };
    let pathname = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };
    let query = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    (pathname, query)
}

/// A header value, already coerced to its on-the-wire string form.
///
/// List values join with `,`; numeric values render in decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValue(String);

impl HeaderValue {
    /// The string form of this value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue(values.join(","))
    }
}

impl From<&[&str]> for HeaderValue {
    fn from(values: &[&str]) -> Self {
        HeaderValue(values.join(","))
    }
}

impl From<u64> for HeaderValue {
    fn from(value: u64) -> Self {
        HeaderValue(value.to_string())
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue(value.to_string())
    }
}

/// Header collection that preserves original casing for emission while
/// resolving lookups case-insensitively.
///
/// Two entries whose names differ only in case can coexist here; the
/// collision is rejected when the headers are canonicalized for signing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any entry with the same name ignoring
    /// case. The replaced entry keeps its original casing.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Append a header without looking at existing entries.
    ///
    /// Unlike [`insert`][Self::insert] this can produce case-colliding
    /// names, which signing rejects.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Look up a header by its lower-cased name.
    ///
    /// Returns the original name and the coerced string value of the first
    /// entry whose name lower-cases to `lowercase_name`.
    pub fn get(&self, lowercase_name: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(lowercase_name))
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Whether any header name lower-cases to `lowercase_name`.
    pub fn contains(&self, lowercase_name: &str) -> bool {
        self.get(lowercase_name).is_some()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<HeaderValue>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (n, v) in iter {
            headers.append(n, v);
        }
        headers
    }
}

/// The request body, either raw bytes or a precomputed SHA-256.
#[derive(Debug, Clone)]
pub enum Body {
    /// Raw payload bytes, hashed during signing.
    Bytes(Bytes),
    /// Precomputed hex SHA-256 of the payload.
    Hash(String),
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Bytes(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Bytes(value.into())
    }
}

impl From<&[u8]> for Body {
    fn from(value: &[u8]) -> Self {
        Body::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

/// A request description to sign.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: Headers,
    /// Request body, if any.
    pub body: Option<Body>,
    /// S3 only: `Some(true)` forces the `UNSIGNED-PAYLOAD` body hash
    /// sentinel; `Some(false)` pins the real body hash even where the
    /// sentinel is the default (presigned URLs).
    pub unsigned_payload: Option<bool>,
}

impl SignedRequest {
    /// Create a request description for `method` and `url`.
    pub fn new(method: Method, url: impl Into<Url>) -> Self {
        SignedRequest {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
            unsigned_payload: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<Url>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a PUT request.
    pub fn put(url: impl Into<Url>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Force or pin the body hash sentinel, see [`SignedRequest::unsigned_payload`].
    pub fn with_unsigned_payload(mut self, unsigned: bool) -> Self {
        self.unsigned_payload = Some(unsigned);
        self
    }

    /// Project into the flat shape an HTTP client consumes.
    pub fn to_request_options(&self) -> Result<RequestOptions> {
        let c = self.url.components();
        let host = c
            .host
            .clone()
            .ok_or_else(|| Error::invalid_input("url has no host"))?;

        let mut path = c.pathname.clone();
        if !c.query.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            serializer.extend_pairs(c.query.iter());
            write!(path, "?{}", serializer.finish())?;
        }

        Ok(RequestOptions {
            method: self.method.to_string(),
            host,
            path,
            headers: self.headers.clone(),
        })
    }
}

/// The flat request form HTTP clients expect.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method name.
    pub method: String,
    /// Target host.
    pub host: String,
    /// Path plus encoded query string.
    pub path: String,
    /// Headers to send.
    pub headers: Headers,
}
