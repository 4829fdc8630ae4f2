//! Mapping between AWS endpoint hosts and signing scopes.
//!
//! Signers only need this when a credential does not pin its region and
//! service explicitly: the scope is then inferred from the request host, or
//! a host is synthesized from the scope when the request has none.

use crate::error::{Error, Result};

/// Region used when a host or credential does not carry one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Signing-name to endpoint-prefix pairs for services whose hostnames
/// diverge from their signing names.
const SERVICE_ENDPOINTS: &[(&str, &str)] = &[
    ("ses", "email"),
    ("transcribe", "transcribestreaming"),
];

/// Extract `(service, region)` from an AWS endpoint host.
///
/// Recognized forms:
///
/// - `<service>.<region>.amazonaws.com` and the `.cn` partition variant
/// - `<region>.<service>.amazonaws.com` (Elasticsearch-style)
/// - `<bucket>.s3.amazonaws.com` and `s3-<region>` hosts
/// - `-fips` endpoint suffixes
///
/// The region defaults to `us-east-1` when the host does not name one.
pub fn parse_host(host: &str) -> Result<(String, String)> {
    let host = host.to_ascii_lowercase();
    // Strip any port before matching.
    let host = host.split(':').next().unwrap_or(&host);

    let rest = host
        .strip_suffix(".amazonaws.com.cn")
        .or_else(|| host.strip_suffix(".amazonaws.com"))
        .ok_or_else(|| {
            Error::invalid_input(format!("host {host:?} is not an amazonaws endpoint"))
        })?;

    let mut labels = rest.rsplit('.').filter(|v| !v.is_empty());
    let near = labels
        .next()
        .ok_or_else(|| Error::invalid_input(format!("host {host:?} has no service label")))?;
    let far = labels.next();

    let (mut service, mut region) = match far {
        None => (near.to_string(), None),
        Some(far) => (far.to_string(), Some(near.to_string())),
    };

    // Virtual-hosted buckets put the bucket name where the service would be.
    if region.as_deref() == Some("s3") {
        service = "s3".to_string();
        region = None;
    }

    if let Some(stripped) = service.strip_suffix("-fips") {
        service = stripped.to_string();
    }

    // Legacy dashed S3 regions: s3-<region>.
    if let Some(r) = service.strip_prefix("s3-") {
        region = Some(r.to_string());
        service = "s3".to_string();
    } else if let Some(r) = region.clone().and_then(|r| {
        r.strip_prefix("s3-").map(|v| v.to_string())
    }) {
        service = "s3".to_string();
        region = Some(r);
    }

    // Hosts of the form <region>.<service> put the labels the other way
    // round; swap when only the service slot looks like a region.
    if let Some(r) = &region {
        if !looks_like_region(r) && looks_like_region(&service) {
            let swapped = r.clone();
            region = Some(service);
            service = swapped;
        }
    }

    // Endpoint prefixes that differ from the signing name.
    if let Some((name, _)) = SERVICE_ENDPOINTS.iter().find(|(_, ep)| *ep == service) {
        service = name.to_string();
    }

    Ok((service, region.unwrap_or_else(|| DEFAULT_REGION.to_string())))
}

/// Build the endpoint host for a `(service, region)` signing scope.
///
/// The inverse of [`parse_host`] for the canonical dotted form.
pub fn format_host(service: &str, region: Option<&str>) -> String {
    let endpoint = SERVICE_ENDPOINTS
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, ep)| *ep)
        .unwrap_or(service);

    let region = region.unwrap_or(DEFAULT_REGION);
    if endpoint == "s3" && region == DEFAULT_REGION {
        return "s3.amazonaws.com".to_string();
    }

    let partition = if region.starts_with("cn-") { ".cn" } else { "" };
    format!("{endpoint}.{region}.amazonaws.com{partition}")
}

fn looks_like_region(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() >= 3
        && parts
            .last()
            .map(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host() {
        let cases = [
            ("s3.amazonaws.com", ("s3", "us-east-1")),
            ("s3.us-west-2.amazonaws.com", ("s3", "us-west-2")),
            ("examplebucket.s3.amazonaws.com", ("s3", "us-east-1")),
            ("examplebucket.s3-us-west-2.amazonaws.com", ("s3", "us-west-2")),
            ("s3-ap-southeast-1.amazonaws.com", ("s3", "ap-southeast-1")),
            ("iam.amazonaws.com", ("iam", "us-east-1")),
            ("sqs.us-west-2.amazonaws.com", ("sqs", "us-west-2")),
            ("dynamodb.cn-north-1.amazonaws.com.cn", ("dynamodb", "cn-north-1")),
            ("search-cluster.us-east-1.es.amazonaws.com", ("es", "us-east-1")),
            ("email.us-west-2.amazonaws.com", ("ses", "us-west-2")),
            ("transcribestreaming.us-east-1.amazonaws.com", ("transcribe", "us-east-1")),
            ("ec2-fips.us-east-2.amazonaws.com", ("ec2", "us-east-2")),
            ("S3.US-WEST-2.AMAZONAWS.COM", ("s3", "us-west-2")),
            ("s3.us-west-2.amazonaws.com:443", ("s3", "us-west-2")),
        ];
        for (host, (service, region)) in cases {
            let got = parse_host(host).unwrap();
            assert_eq!(got, (service.to_string(), region.to_string()), "{host}");
        }
    }

    #[test]
    fn test_parse_host_rejects_unknown() {
        assert!(parse_host("example.com").is_err());
        assert!(parse_host("127.0.0.1:9000").is_err());
        assert!(parse_host("amazonaws.com").is_err());
    }

    #[test]
    fn test_format_host() {
        assert_eq!(format_host("s3", None), "s3.amazonaws.com");
        assert_eq!(format_host("s3", Some("us-east-1")), "s3.amazonaws.com");
        assert_eq!(format_host("s3", Some("eu-west-1")), "s3.eu-west-1.amazonaws.com");
        assert_eq!(format_host("iam", None), "iam.us-east-1.amazonaws.com");
        assert_eq!(format_host("ses", Some("us-west-2")), "email.us-west-2.amazonaws.com");
        assert_eq!(
            format_host("transcribe", Some("us-east-1")),
            "transcribestreaming.us-east-1.amazonaws.com"
        );
        assert_eq!(
            format_host("dynamodb", Some("cn-north-1")),
            "dynamodb.cn-north-1.amazonaws.com.cn"
        );
    }

    #[test]
    fn test_parse_format_roundtrip() {
        for (service, region) in [("s3", "us-west-2"), ("iam", "us-east-1"), ("ses", "eu-west-1")] {
            let host = format_host(service, Some(region));
            assert_eq!(
                parse_host(&host).unwrap(),
                (service.to_string(), region.to_string())
            );
        }
    }
}
