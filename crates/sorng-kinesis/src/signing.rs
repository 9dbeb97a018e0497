//! AWS Signature Version 4 ("hmac-v4") request signing.
//!
//! <https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html>
//!
//! Signing adds `x-amz-date`, `x-amz-security-token` (temporary credentials
//! only) and `authorization` to the header map. Every header present at
//! signing time is part of the signature.

use crate::config::AwsCredentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Everything except the RFC 3986 unreserved set.
const SIGV4_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct SigV4Signer<'a> {
    credentials: &'a AwsCredentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> SigV4Signer<'a> {
    pub fn new(credentials: &'a AwsCredentials, region: &'a str, service: &'a str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    /// Sign a request in place.
    pub fn sign(
        &self,
        method: &str,
        url: &url::Url,
        headers: &mut BTreeMap<String, String>,
        body: &str,
        timestamp: DateTime<Utc>,
    ) {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(ref token) = self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let (canonical_headers, signed_headers) = canonicalize_headers(headers);
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            canonical_uri(url),
            canonical_query(url),
            canonical_headers,
            signed_headers,
            sha256_hex(body.as_bytes())
        );

        let scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let key = self.signing_key(&date_stamp);
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        headers.insert(
            "authorization".to_string(),
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
            ),
        );
    }

    /// kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")
    fn signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        [
            date_stamp.as_bytes(),
            self.region.as_bytes(),
            self.service.as_bytes(),
            &b"aws4_request"[..],
        ]
        .iter()
        .fold(secret.into_bytes(), |key, part| hmac_sha256(&key, part))
    }
}

/// Lowercased, sorted `name:value\n` lines plus the `;`-joined name list.
fn canonicalize_headers(headers: &BTreeMap<String, String>) -> (String, String) {
    let mut lowered: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| {
            let value = v.split_whitespace().collect::<Vec<_>>().join(" ");
            (k.to_lowercase(), value)
        })
        .collect();
    lowered.sort();

    let canonical = lowered
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect::<String>();
    let names = lowered
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (canonical, names)
}

fn canonical_uri(url: &url::Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, SIGV4_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &url::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, SIGV4_ENCODE_SET).to_string(),
                utf8_percent_encode(&v, SIGV4_ENCODE_SET).to_string(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_credentials() -> AwsCredentials {
        AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    fn fixed_time() -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2015, 8, 30)
            .unwrap()
            .and_hms_opt(12, 36, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn sha256_empty_payload() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn derived_signing_key_matches_aws_docs() {
        let creds = example_credentials();
        let signer = SigV4Signer::new(&creds, "us-east-1", "iam");
        assert_eq!(
            hex::encode(signer.signing_key("20150830")),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    // get-vanilla from the AWS SigV4 test suite.
    #[test]
    fn get_vanilla() {
        let creds = example_credentials();
        let signer = SigV4Signer::new(&creds, "us-east-1", "service");
        let url = url::Url::parse("https://example.amazonaws.com/").unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), "example.amazonaws.com".to_string());

        signer.sign("GET", &url, &mut headers, "", fixed_time());

        assert_eq!(headers["x-amz-date"], "20150830T123600Z");
        assert_eq!(
            headers["authorization"],
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn kinesis_post_signs_all_headers() {
        let creds = example_credentials();
        let signer = SigV4Signer::new(&creds, "us-east-1", "kinesis");
        let url = url::Url::parse("https://kinesis.us-east-1.amazonaws.com/").unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), "kinesis.us-east-1.amazonaws.com".to_string());
        headers.insert("Content-Type".to_string(), "application/x-amz-json-1.1".to_string());
        headers.insert(
            "X-Amz-Target".to_string(),
            "Kinesis_20131104.ListStreams".to_string(),
        );

        signer.sign("POST", &url, &mut headers, "{}", fixed_time());

        let auth = &headers["authorization"];
        assert!(auth.contains("/20150830/us-east-1/kinesis/aws4_request"));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target"));
        assert!(!headers.contains_key("x-amz-security-token"));
    }

    #[test]
    fn signature_is_deterministic() {
        let creds = example_credentials();
        let signer = SigV4Signer::new(&creds, "us-east-1", "kinesis");
        let url = url::Url::parse("https://kinesis.us-east-1.amazonaws.com/").unwrap();
        let sign = |body: &str| {
            let mut headers = BTreeMap::new();
            headers.insert("Host".to_string(), "kinesis.us-east-1.amazonaws.com".to_string());
            signer.sign("POST", &url, &mut headers, body, fixed_time());
            headers["authorization"].clone()
        };
        assert_eq!(sign("{}"), sign("{}"));
        assert_ne!(sign("{}"), sign(r#"{"Limit":1}"#));
    }

    #[test]
    fn session_token_is_signed() {
        let creds = AwsCredentials::new_temporary("ASIAEXAMPLE", "secret", "token123", None);
        let signer = SigV4Signer::new(&creds, "us-east-1", "kinesis");
        let url = url::Url::parse("https://kinesis.us-east-1.amazonaws.com/").unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), "kinesis.us-east-1.amazonaws.com".to_string());

        signer.sign("POST", &url, &mut headers, "{}", fixed_time());

        assert_eq!(headers["x-amz-security-token"], "token123");
        assert!(headers["authorization"].contains("x-amz-security-token"));
    }

    #[test]
    fn canonical_query_is_sorted_and_encoded() {
        let url = url::Url::parse("https://example.com/?b=2&a=hello world&c=x/y").unwrap();
        assert_eq!(canonical_query(&url), "a=hello%20world&b=2&c=x%2Fy");
    }

    #[test]
    fn canonical_uri_keeps_slashes() {
        let url = url::Url::parse("https://example.com/a b/c").unwrap();
        assert_eq!(canonical_uri(&url), "/a%20b/c");
    }

    #[test]
    fn header_values_collapse_whitespace() {
        let mut headers = BTreeMap::new();
        headers.insert("My-Header".to_string(), "  a   b  ".to_string());
        let (canonical, names) = canonicalize_headers(&headers);
        assert_eq!(canonical, "my-header:a b\n");
        assert_eq!(names, "my-header");
    }
}
