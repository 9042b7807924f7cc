use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use url::Url;

use super::{SignedOperation, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// Query parameters carried by a signed storage URL
#[derive(Debug, Clone, Deserialize)]
pub struct SignedQuery {
    #[serde(rename = "X-Operation")]
    pub operation: SignedOperation,
    #[serde(rename = "X-Expires")]
    pub expires: i64,
    #[serde(rename = "X-Signature")]
    pub signature: String,
}

/// Issues and verifies time-limited URLs for `/storage/:bucket/*key`
#[derive(Debug, Clone)]
pub struct UrlSigner {
    base_url: Url,
    secret: String,
    ttl_secs: i64,
}

impl UrlSigner {
    pub fn new(base_url: &str, secret: impl Into<String>, ttl_secs: u64) -> Result<Self, StorageError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StorageError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidUrl(format!("{} cannot be a base URL", base_url)));
        }
        Ok(Self {
            base_url,
            secret: secret.into(),
            ttl_secs: ttl_secs as i64,
        })
    }

    pub fn from_config(
        api: &crate::config::ApiConfig,
        storage: &crate::config::StorageConfig,
    ) -> Result<Self, StorageError> {
        Self::new(&api.public_base_url, storage.signing_secret.clone(), storage.signed_url_ttl_secs)
    }

    pub fn sign(&self, operation: SignedOperation, bucket: &str, key: &str) -> Result<String, StorageError> {
        self.sign_at(operation, bucket, key, Utc::now().timestamp())
    }

    /// Sign relative to an explicit clock reading (unix seconds)
    pub fn sign_at(
        &self,
        operation: SignedOperation,
        bucket: &str,
        key: &str,
        now: i64,
    ) -> Result<String, StorageError> {
        let expires = now + self.ttl_secs;
        let signature = hex::encode(self.mac(operation, bucket, key, expires)?.finalize().into_bytes());

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("storage").push(bucket);
            for part in key.split('/') {
                segments.push(part);
            }
        }
        url.query_pairs_mut()
            .append_pair("X-Operation", operation.as_str())
            .append_pair("X-Expires", &expires.to_string())
            .append_pair("X-Signature", &signature);

        Ok(url.into())
    }

    pub fn verify(
        &self,
        expected: SignedOperation,
        bucket: &str,
        key: &str,
        query: &SignedQuery,
    ) -> Result<(), StorageError> {
        self.verify_at(expected, bucket, key, query, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        expected: SignedOperation,
        bucket: &str,
        key: &str,
        query: &SignedQuery,
        now: i64,
    ) -> Result<(), StorageError> {
        if query.operation != expected {
            return Err(StorageError::InvalidSignature);
        }
        let signature = hex::decode(&query.signature).map_err(|_| StorageError::InvalidSignature)?;
        self.mac(expected, bucket, key, query.expires)?
            .verify_slice(&signature)
            .map_err(|_| StorageError::InvalidSignature)?;
        if query.expires < now {
            return Err(StorageError::Expired { expires: query.expires });
        }
        Ok(())
    }

    /// HMAC-SHA256 keyed by the signing secret over `operation, bucket, key, expires`
    fn mac(&self, operation: SignedOperation, bucket: &str, key: &str, expires: i64) -> Result<HmacSha256, StorageError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| StorageError::Backend(format!("signing key rejected: {}", e)))?;
        for part in [operation.as_str(), bucket, key] {
            mac.update(part.as_bytes());
            mac.update(b"\n");
        }
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}
