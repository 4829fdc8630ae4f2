//! AWS SigV4 HTTP request signer.
//!
//! Implements both placements of the signature: the `Authorization` header
//! and the presigned-URL query parameters.

use log::debug;

use crate::canonical::{
    canonical_headers, canonical_query, canonical_uri, hash_body, CanonicalOptions,
};
use crate::constants::{
    ALGORITHM, PRESIGN_EXPIRES_MAX, UNSIGNED_PAYLOAD, X_AMZ_ALGORITHM, X_AMZ_CONTENT_SHA_256,
    X_AMZ_CREDENTIAL, X_AMZ_DATE, X_AMZ_DATE_QUERY, X_AMZ_EXPIRES, X_AMZ_SECURITY_TOKEN,
    X_AMZ_SECURITY_TOKEN_QUERY, X_AMZ_SIGNATURE, X_AMZ_SIGNED_HEADERS,
};
use crate::credential::Credential;
use crate::endpoint::{format_host, parse_host, DEFAULT_REGION};
use crate::error::{Error, Result};
use crate::hash::hex_sha256;
use crate::key::{derive, sign_digest, SigningData};
use crate::request::SignedRequest;
use crate::time::{format_iso8601, now, parse_iso8601};

/// Where the signature is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningMethod {
    /// Sign into the `Authorization` header.
    #[default]
    Header,
    /// Sign into `X-Amz-*` query parameters (presigned URL).
    Query,
}

/// Options controlling a single signing pass.
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// Signature placement.
    pub method: SigningMethod,
    /// Emit an `x-amz-content-sha256` header carrying the body hash used
    /// for signing, unless the request already has one.
    pub set_content_hash: bool,
    /// URI canonicalization knobs.
    pub canonical: CanonicalOptions,
    /// Service to assume when neither the credential nor the URL host
    /// names one.
    pub default_service: Option<String>,
    /// `X-Amz-Expires` to insert in query mode when the caller did not
    /// supply one.
    pub default_expires: Option<u64>,
    /// Overrides the body hash used in the canonical request (streaming
    /// sentinels).
    pub body_hash: Option<String>,
}

/// Signer that implements AWS SigV4 for HTTP requests.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// [`calculate`][Self::calculate] is pure and leaves the request untouched;
/// [`sign`][Self::sign] additionally writes the resulting parameters back
/// into the request.
#[derive(Debug)]
pub struct RequestSigner {
    credential: Credential,
}

impl RequestSigner {
    /// Create a signer for the given credential.
    pub fn new(credential: Credential) -> Self {
        RequestSigner { credential }
    }

    /// Compute the authentication parameters for `req` without mutating it.
    pub fn calculate(&self, req: &SignedRequest, opts: &SignOptions) -> Result<SignedOutput> {
        let components = req.url.components();

        // Resolve host, region and service per the precedence rules: an
        // explicit credential scope wins, then the URL host, then defaults.
        let (host, region, service) = match components.host.clone() {
            None => {
                let service = self
                    .credential
                    .service()
                    .map(str::to_string)
                    .or_else(|| opts.default_service.clone())
                    .ok_or_else(|| {
                        Error::missing_config(
                            "request has no host and credential names no service",
                        )
                    })?;
                let region = self
                    .credential
                    .region()
                    .unwrap_or(DEFAULT_REGION)
                    .to_string();
                (format_host(&service, Some(&region)), region, service)
            }
            Some(host) => {
                let mut service = self.credential.service().map(str::to_string);
                let mut region = self.credential.region().map(str::to_string);
                if service.is_none() || region.is_none() {
                    let (parsed_service, parsed_region) = parse_host(&host)?;
                    service.get_or_insert(parsed_service);
                    region.get_or_insert(parsed_region);
                }
                (host, region.unwrap(), service.unwrap())
            }
        };

        let cred = &self.credential;
        let mut headers = req.headers.clone();
        let mut out_headers: Vec<(String, String)> = Vec::new();

        // Synthesize the host header for signing; it is persisted only
        // when the output is applied.
        if !headers.contains("host") {
            headers.insert("host", host.as_str());
            out_headers.push(("host".to_string(), host));
        }

        // The timestamp comes from the request when present, and is
        // validated either way.
        let supplied = match opts.method {
            SigningMethod::Header => headers.get(X_AMZ_DATE).map(|(_, v)| v.to_string()),
            SigningMethod::Query => components
                .query
                .iter()
                .find(|(name, _)| name == X_AMZ_DATE_QUERY)
                .map(|(_, value)| value.clone()),
        };
        let (timestamp, generated) = match supplied {
            Some(ts) => {
                parse_iso8601(&ts)?;
                (ts, false)
            }
            None => (format_iso8601(now()), true),
        };

        let signing = derive(&timestamp, cred.secret_key(), &region, &service);
        debug!("calculated scope: {}", signing.scope());

        let body_hash = match (&opts.body_hash, opts.method) {
            (Some(hash), _) => hash.clone(),
            (None, SigningMethod::Query) => match req.unsigned_payload {
                Some(false) => hash_body(req.body.as_ref()),
                _ => UNSIGNED_PAYLOAD.to_string(),
            },
            (None, SigningMethod::Header) => match req.unsigned_payload {
                Some(true) => UNSIGNED_PAYLOAD.to_string(),
                _ => hash_body(req.body.as_ref()),
            },
        };

        if opts.method == SigningMethod::Header {
            if generated {
                headers.insert(X_AMZ_DATE, timestamp.as_str());
                out_headers.push((X_AMZ_DATE.to_string(), timestamp.clone()));
            }
            if opts.set_content_hash && !headers.contains(X_AMZ_CONTENT_SHA_256) {
                headers.insert(X_AMZ_CONTENT_SHA_256, body_hash.as_str());
                out_headers.push((X_AMZ_CONTENT_SHA_256.to_string(), body_hash.clone()));
            }
            if let Some(token) = cred.session_token() {
                if !headers.contains(X_AMZ_SECURITY_TOKEN) {
                    headers.insert(X_AMZ_SECURITY_TOKEN, token);
                    out_headers.push((X_AMZ_SECURITY_TOKEN.to_string(), token.to_string()));
                }
            }
        }

        let (canonical_headers_block, signed_headers) = canonical_headers(&headers)?;

        // In query mode the authentication parameters join the query
        // before canonicalization; only the signature is appended after.
        let mut out_params: Vec<(String, String)> = Vec::new();
        if opts.method == SigningMethod::Query {
            out_params.push((X_AMZ_ALGORITHM.to_string(), ALGORITHM.to_string()));
            out_params.push((
                X_AMZ_CREDENTIAL.to_string(),
                format!("{}/{}", cred.access_key(), signing.scope()),
            ));
            if generated {
                out_params.push((X_AMZ_DATE_QUERY.to_string(), timestamp.clone()));
            }
            match components.query.iter().find(|(name, _)| name == X_AMZ_EXPIRES) {
                Some((_, value)) => {
                    let expires: u64 = value.parse().map_err(|_| {
                        Error::invalid_input(format!("X-Amz-Expires {value:?} is not an integer"))
                    })?;
                    if expires > PRESIGN_EXPIRES_MAX {
                        return Err(Error::invalid_input(format!(
                            "X-Amz-Expires {expires} exceeds the maximum of {PRESIGN_EXPIRES_MAX}"
                        )));
                    }
                }
                None => {
                    if let Some(expires) = opts.default_expires {
                        out_params.push((X_AMZ_EXPIRES.to_string(), expires.to_string()));
                    }
                }
            }
            out_params.push((X_AMZ_SIGNED_HEADERS.to_string(), signed_headers.clone()));
            if let Some(token) = cred.session_token() {
                out_params.push((X_AMZ_SECURITY_TOKEN_QUERY.to_string(), token.to_string()));
            }
        }

        let mut query = components.query.clone();
        query.extend(out_params.iter().cloned());

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            req.method,
            canonical_uri(&components.pathname, &opts.canonical),
            canonical_query(&query),
            canonical_headers_block,
            signed_headers,
            body_hash,
        );
        debug!("calculated canonical request: {canonical_request}");

        let signature = sign_digest(
            &hex_sha256(canonical_request.as_bytes()),
            &timestamp,
            &signing,
            ALGORITHM,
        );

        match opts.method {
            SigningMethod::Header => {
                out_headers.push((
                    "authorization".to_string(),
                    format!(
                        "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
                        cred.access_key(),
                        signing.scope(),
                        signed_headers,
                        signature
                    ),
                ));
            }
            SigningMethod::Query => {
                // The signature itself is never part of the canonical
                // request; it goes in last.
                out_params.push((X_AMZ_SIGNATURE.to_string(), signature.clone()));
            }
        }

        Ok(SignedOutput {
            method: opts.method,
            headers: out_headers,
            params: out_params,
            signature,
            timestamp,
            signing,
        })
    }

    /// Write previously calculated parameters back into `req`.
    pub fn apply(&self, req: &mut SignedRequest, output: &SignedOutput) {
        match output.method {
            SigningMethod::Header => {
                for (name, value) in &output.headers {
                    req.headers.insert(name.clone(), value.as_str());
                }
            }
            SigningMethod::Query => req.url.push_query(&output.params),
        }
    }

    /// Calculate and apply in one step.
    pub fn sign(&self, req: &mut SignedRequest, opts: &SignOptions) -> Result<SignedOutput> {
        let output = self.calculate(req, opts)?;
        self.apply(req, &output);
        Ok(output)
    }
}

/// The authentication parameters produced by a signing pass.
#[derive(Debug, Clone)]
pub struct SignedOutput {
    method: SigningMethod,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    signature: String,
    timestamp: String,
    signing: SigningData,
}

impl SignedOutput {
    /// The hex signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The timestamp the request was signed with.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The derived key and scope used for signing.
    pub fn signing(&self) -> &SigningData {
        &self.signing
    }

    /// Headers to add in header mode, including `authorization`.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Query parameters to add in query mode, `X-Amz-Signature` last.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// The `Authorization` header value, when signing in header mode.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name == "authorization")
            .map(|(_, value)| value.as_str())
    }
}

/// A parsed `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Algorithm tag, e.g. `AWS4-HMAC-SHA256`.
    pub algorithm: String,
    /// `<access_key>/<scope>`.
    pub credential: String,
    /// Lower-cased signed header names.
    pub signed_headers: Vec<String>,
    /// Lowercase hex signature.
    pub signature: String,
}

/// Leniently parse an `Authorization` header.
///
/// Fields after the algorithm are comma-separated `Key=Value` pairs;
/// whitespace is tolerated, unknown keys are ignored and the last write
/// wins for duplicates. `Credential`, `SignedHeaders` and `Signature` are
/// all required, and the signature must be even-length lowercase hex.
pub fn parse_authorization(header: &str) -> Result<Authorization> {
    let header = header.trim();
    let (algorithm, rest) = header
        .split_once(' ')
        .ok_or_else(|| Error::invalid_input("authorization header has no fields"))?;

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;
    for field in rest.split(',') {
        let Some((name, value)) = field.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match name.trim() {
            "Credential" => credential = Some(value.to_string()),
            "SignedHeaders" => signed_headers = Some(value.to_string()),
            "Signature" => signature = Some(value.to_string()),
            _ => {}
        }
    }

    let credential = credential
        .ok_or_else(|| Error::invalid_input("authorization header is missing Credential"))?;
    let signed_headers = signed_headers
        .ok_or_else(|| Error::invalid_input("authorization header is missing SignedHeaders"))?;
    let signature = signature
        .ok_or_else(|| Error::invalid_input("authorization header is missing Signature"))?;

    if signature.is_empty()
        || signature.len() % 2 != 0
        || !signature
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(Error::invalid_input(format!(
            "signature {signature:?} is not even-length lowercase hex"
        )));
    }

    Ok(Authorization {
        algorithm: algorithm.to_string(),
        credential,
        signed_headers: signed_headers
            .split(';')
            .map(|name| name.to_string())
            .collect(),
        signature,
    })
}
