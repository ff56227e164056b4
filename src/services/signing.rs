//! Read-only signed URLs for blobs in the image container.
//!
//! Only the account-key service SAS needed for poster and profile images is
//! implemented: read permission, blob resource, fixed lifetime.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const SAS_VERSION: &str = "2020-12-06";

/// Mints time-limited read URLs for stored blobs
pub trait BlobSigner: Send + Sync {
    fn signed_url(&self, blob_name: &str) -> AppResult<String>;
}

/// Azure Blob Storage service-SAS signer built from an account connection string
#[derive(Clone)]
pub struct AzureSasSigner {
    account_name: String,
    account_key: Vec<u8>,
    /// Base URL of the blob service, without trailing slash
    blob_endpoint: String,
    container: String,
    ttl: Duration,
}

impl AzureSasSigner {
    /// Parses `AccountName`, `AccountKey` and the optional `BlobEndpoint`,
    /// `EndpointSuffix` and `DefaultEndpointsProtocol` entries
    pub fn from_connection_string(
        connection_string: &str,
        container: impl Into<String>,
        ttl_minutes: i64,
    ) -> AppResult<Self> {
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;
        let mut suffix = "core.windows.net".to_string();
        let mut protocol = "https".to_string();

        for part in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "AccountName" => account_name = Some(value.trim().to_string()),
                "AccountKey" => account_key = Some(value.trim().to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim().trim_end_matches('/').to_string()),
                "EndpointSuffix" => suffix = value.trim().to_string(),
                "DefaultEndpointsProtocol" => protocol = value.trim().to_string(),
                _ => {}
            }
        }

        let account_name = account_name.ok_or_else(|| {
            AppError::Internal("Storage connection string has no AccountName".to_string())
        })?;
        let account_key = account_key.ok_or_else(|| {
            AppError::Internal("Storage connection string has no AccountKey".to_string())
        })?;
        let account_key = STANDARD
            .decode(account_key)
            .map_err(|e| AppError::Internal(format!("Storage account key is not base64: {}", e)))?;

        if ttl_minutes <= 0 {
            return Err(AppError::Internal(
                "Signed URL lifetime must be positive".to_string(),
            ));
        }

        let blob_endpoint = blob_endpoint
            .unwrap_or_else(|| format!("{}://{}.blob.{}", protocol, account_name, suffix));

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
            container: container.into(),
            ttl: Duration::minutes(ttl_minutes),
        })
    }

    fn allowed_protocols(&self) -> &'static str {
        if self.blob_endpoint.starts_with("https://") {
            "https"
        } else {
            "https,http"
        }
    }

    fn signature(&self, string_to_sign: &str) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.account_key)
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Signs `blob_name` for reading until `now + ttl`
    pub fn sign_at(&self, blob_name: &str, now: DateTime<Utc>) -> AppResult<String> {
        let blob_name = blob_name.trim_start_matches('/');
        if blob_name.is_empty() {
            return Err(AppError::InvalidInput("filename is required".to_string()));
        }

        let expiry = (now + self.ttl).format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let protocols = self.allowed_protocols();
        let resource = format!("/blob/{}/{}/{}", self.account_name, self.container, blob_name);

        // Field order is fixed by the SAS version.
        let string_to_sign = [
            "r",
            "",
            expiry.as_str(),
            resource.as_str(),
            "",
            "",
            protocols,
            SAS_VERSION,
            "b",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ]
        .join("\n");
        let signature = self.signature(&string_to_sign)?;

        let path = blob_name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(format!(
            "{}/{}/{}?sv={}&spr={}&se={}&sr=b&sp=r&sig={}",
            self.blob_endpoint,
            self.container,
            path,
            SAS_VERSION,
            urlencoding::encode(protocols),
            urlencoding::encode(&expiry),
            urlencoding::encode(&signature),
        ))
    }
}

impl BlobSigner for AzureSasSigner {
    fn signed_url(&self, blob_name: &str) -> AppResult<String> {
        self.sign_at(blob_name, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CONNECTION: &str = "DefaultEndpointsProtocol=https;AccountName=marquee;AccountKey=c2VjcmV0LWtleS1mb3ItdGVzdHM=;EndpointSuffix=core.windows.net";

    fn signer() -> AzureSasSigner {
        AzureSasSigner::from_connection_string(CONNECTION, "images", 15).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_url_shape() {
        let url = signer().sign_at("posters/862.jpg", fixed_now()).unwrap();

        assert!(url.starts_with("https://marquee.blob.core.windows.net/images/posters/862.jpg?"));
        assert!(url.contains("sv=2020-12-06"));
        assert!(url.contains("sp=r"));
        assert!(url.contains("sr=b"));
        assert!(url.contains("spr=https&"));
        assert!(url.contains("se=2024-05-01T12%3A15%3A00Z"));
        assert!(url.contains("&sig="));
    }

    #[test]
    fn test_signature_is_deterministic_per_blob() {
        let signer = signer();
        let a = signer.sign_at("posters/1.jpg", fixed_now()).unwrap();
        let b = signer.sign_at("posters/1.jpg", fixed_now()).unwrap();
        let c = signer.sign_at("posters/2.jpg", fixed_now()).unwrap();
        assert_eq!(a, b);

        let sig = |url: &str| url.split("&sig=").nth(1).unwrap().to_string();
        assert_ne!(sig(&a), sig(&c));
    }

    #[test]
    fn test_blob_endpoint_override() {
        let signer = AzureSasSigner::from_connection_string(
            "AccountName=devstoreaccount1;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1/",
            "images",
            15,
        )
        .unwrap();
        let url = signer.sign_at("profiles/31.jpg", fixed_now()).unwrap();
        assert!(url.starts_with("http://127.0.0.1:10000/devstoreaccount1/images/profiles/31.jpg?"));
        assert!(url.contains("spr=https%2Chttp"));
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let url = signer().sign_at("posters/my poster.jpg", fixed_now()).unwrap();
        assert!(url.contains("/images/posters/my%20poster.jpg?"));
    }

    #[test]
    fn test_missing_account_key_rejected() {
        let result = AzureSasSigner::from_connection_string("AccountName=a", "images", 15);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_empty_blob_name_rejected() {
        let result = signer().sign_at("", fixed_now());
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
