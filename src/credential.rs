//! Credential material for signing.

use std::fmt::Debug;
use std::fmt::Formatter;

/// Credential that holds the access_key and secret_key, plus the optional
/// signing scope pieces.
///
/// A credential is *complete* when both region and service are set. Signers
/// fall back to inferring missing pieces from the request's host, or to
/// service defaults, before deriving the signing key.
#[derive(Default, Clone)]
pub struct Credential {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    region: Option<String>,
    service: Option<String>,
}

impl Credential {
    /// Create a new Credential.
    pub fn new(access_key: &str, secret_key: &str) -> Self {
        Credential {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            session_token: None,
            region: None,
            service: None,
        }
    }

    /// Build a credential with region.
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Build a credential with service.
    pub fn with_service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    /// Build a credential with a temporary session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }

    /// Get access_key.
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Get secret_key.
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Get session_token.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Get region.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Get service.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Credential {{ access_key: {}, secret_key: {}, session_token: {}, region: {:?}, service: {:?} }}",
            redact(&self.access_key),
            redact(&self.secret_key),
            redact(self.session_token.as_deref().unwrap_or("")),
            self.region,
            self.service,
        )
    }
}

fn redact(v: &str) -> &str {
    if v.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_key_material() {
        let cred = Credential::new("AKIDEXAMPLE", "secret")
            .with_session_token("token")
            .with_region("us-east-1")
            .with_service("s3");
        let out = format!("{cred:?}");
        assert!(!out.contains("AKIDEXAMPLE"));
        assert!(!out.contains("secret"));
        assert!(!out.contains("token"));
        assert!(out.contains("us-east-1"));
    }
}
