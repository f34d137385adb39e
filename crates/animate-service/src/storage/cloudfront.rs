//! CloudFront signed URLs with a custom policy.
//!
//! The policy restricts one resource URL until an expiry time. It is signed
//! with RSA PKCS#1 v1.5 over SHA-1, and both the policy and the signature are
//! carried in the query string using CloudFront's URL-safe base64 alphabet.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha1::Sha1;

use super::StorageError;
use crate::config::CloudFrontSettings;

#[derive(Serialize)]
struct Policy<'a> {
    #[serde(rename = "Statement")]
    statement: [Statement<'a>; 1],
}

#[derive(Serialize)]
struct Statement<'a> {
    #[serde(rename = "Resource")]
    resource: &'a str,
    #[serde(rename = "Condition")]
    condition: Condition,
}

#[derive(Serialize)]
struct Condition {
    #[serde(rename = "DateLessThan")]
    date_less_than: EpochTime,
}

#[derive(Serialize)]
struct EpochTime {
    #[serde(rename = "AWS:EpochTime")]
    epoch: i64,
}

/// Signs CloudFront URLs for one distribution.
pub struct CloudFrontSigner {
    domain: String,
    key_pair_id: String,
    signing_key: SigningKey<Sha1>,
    ttl: Duration,
}

impl std::fmt::Debug for CloudFrontSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFrontSigner")
            .field("domain", &self.domain)
            .field("key_pair_id", &self.key_pair_id)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CloudFrontSigner {
    /// Create a signer from an already parsed key.
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        key_pair_id: impl Into<String>,
        private_key: RsaPrivateKey,
        ttl: Duration,
    ) -> Self {
        Self {
            domain: domain.into().trim_end_matches('/').to_string(),
            key_pair_id: key_pair_id.into(),
            signing_key: SigningKey::<Sha1>::new(private_key),
            ttl,
        }
    }

    /// Build a signer from settings, reading the key from base64 PEM or a file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if the key cannot be read or parsed.
    pub fn from_settings(settings: &CloudFrontSettings) -> Result<Self, StorageError> {
        let pem = match &settings.private_key_base64 {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                    StorageError::Signing(format!("invalid base64 private key: {e}"))
                })?;
                String::from_utf8(bytes)
                    .map_err(|e| StorageError::Signing(format!("private key is not UTF-8: {e}")))?
            }
            None => read_key_file(Path::new(&settings.private_key_path))?,
        };

        Ok(Self::new(
            settings.domain.clone(),
            settings.key_pair_id.clone(),
            parse_private_key(&pem)?,
            Duration::minutes(settings.url_ttl_minutes),
        ))
    }

    /// Signed URL for `key`, valid until `now` plus the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if the policy cannot be serialized.
    pub fn sign_url(&self, key: &str, now: DateTime<Utc>) -> Result<String, StorageError> {
        let resource = format!("https://{}/{}", self.domain, key.trim_start_matches('/'));
        let policy = Policy {
            statement: [Statement {
                resource: &resource,
                condition: Condition {
                    date_less_than: EpochTime {
                        epoch: (now + self.ttl).timestamp(),
                    },
                },
            }],
        };
        let policy =
            serde_json::to_vec(&policy).map_err(|e| StorageError::Signing(e.to_string()))?;

        let signature = self.signing_key.sign(&policy).to_vec();

        Ok(format!(
            "{resource}?Policy={}&Signature={}&Key-Pair-Id={}",
            url_safe_base64(&policy),
            url_safe_base64(&signature),
            self.key_pair_id
        ))
    }
}

fn read_key_file(path: &Path) -> Result<String, StorageError> {
    std::fs::read_to_string(path).map_err(|e| {
        StorageError::Signing(format!(
            "cannot read private key {}: {e}",
            path.display()
        ))
    })
}

/// Parse a PEM private key in PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8 form.
fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, StorageError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| StorageError::Signing(format!("invalid RSA private key: {e}")))
}

/// Base64 with CloudFront's substitutions: `+` to `-`, `=` to `_`, `/` to `~`.
fn url_safe_base64(data: &[u8]) -> String {
    STANDARD
        .encode(data)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}
