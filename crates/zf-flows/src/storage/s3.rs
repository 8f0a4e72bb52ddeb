//! # S3-Compatible Object Storage
//!
//! Path-style requests against `{endpoint}/{bucket}/{key}`, each signed with
//! Signature V4.
//!
//! ```text
//! put_object(bytes, "Plan.PDF", "application/pdf")
//!     │
//!     ├── key  = "{uuid}.pdf"
//!     ├── PUT {endpoint}/{bucket}/{key}   (x-amz-content-sha256 = sha256(bytes))
//!     └── StoredObject { key, url = public_url_prefix + key }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use zf_core::{Attachment, FileRemover, RemoveError, StorageBackend};

use super::sigv4::{self, Credentials, SigningRequest};
use crate::config::{
    S3Settings, S3_ACCESS_KEY_ID, S3_BUCKET, S3_ENDPOINT, S3_SECRET_ACCESS_KEY,
};
use crate::error::{FlowError, FlowResult};

const SERVICE: &str = "s3";
const MAX_EXTENSION_LEN: usize = 10;

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

impl StoredObject {
    /// An order attachment pointing at this object.
    pub fn into_attachment(self, name: impl Into<String>, content_type: Option<String>) -> Attachment {
        Attachment {
            name: name.into(),
            url: self.url,
            key: self.key,
            storage: StorageBackend::ObjectStorage,
            content_type,
        }
    }
}

/// Metadata returned by `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectStorage {
    http: Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: Credentials,
    public_url_prefix: Option<String>,
}

fn required(value: &Option<String>, name: &'static str) -> FlowResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(FlowError::MissingConfig(name))
}

/// `"{uuid}.{ext}"`, the extension taken from the original name when it is
/// short and alphanumeric.
pub fn object_key(original_name: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}

impl ObjectStorage {
    /// ## Errors
    /// `MissingConfig` naming the first absent setting.
    pub fn new(settings: &S3Settings) -> FlowResult<Self> {
        let endpoint = Url::parse(&required(&settings.endpoint, S3_ENDPOINT)?)?;
        let bucket = required(&settings.bucket, S3_BUCKET)?;
        let credentials = Credentials {
            access_key_id: required(&settings.access_key_id, S3_ACCESS_KEY_ID)?,
            secret_access_key: required(&settings.secret_access_key, S3_SECRET_ACCESS_KEY)?,
        };

        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(ObjectStorage {
            http,
            endpoint,
            bucket,
            region: settings.region.clone(),
            credentials,
            public_url_prefix: settings.public_url_prefix.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_path(&self, key: &str) -> String {
        let base = self.endpoint.path().trim_end_matches('/');
        format!(
            "{}/{}/{}",
            base,
            sigv4::uri_encode(&self.bucket, false),
            sigv4::uri_encode(key, true)
        )
    }

    fn object_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(&self.object_path(key));
        url
    }

    /// Public URL for `key`.
    pub fn public_url(&self, key: &str) -> String {
        match &self.public_url_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => {
                let base = self.endpoint.as_str().trim_end_matches('/');
                format!("{}/{}/{}", base, self.bucket, key)
            }
        }
    }

    fn host(&self) -> FlowResult<String> {
        let host = self
            .endpoint
            .host_str()
            .ok_or_else(|| FlowError::Config(format!("endpoint has no host: {}", self.endpoint)))?;
        Ok(match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    fn signed(&self, method: Method, key: &str, payload: &[u8]) -> FlowResult<RequestBuilder> {
        let url = self.object_url(key);
        let host = self.host()?;
        let payload_hash = sigv4::hash_payload(payload);
        let now = Utc::now();
        let amz_date = sigv4::amz_date(now);

        let signature = sigv4::sign(
            &self.credentials,
            &self.region,
            SERVICE,
            now,
            &SigningRequest {
                method: method.as_str(),
                path: url.path(),
                query: &[],
                headers: &[
                    ("host", host.as_str()),
                    ("x-amz-content-sha256", payload_hash.as_str()),
                    ("x-amz-date", amz_date.as_str()),
                ],
                payload_hash: &payload_hash,
            },
        )?;

        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, signature.authorization)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date))
    }

    /// Uploads `bytes` under a fresh key.
    pub async fn put_object(
        &self,
        bytes: Vec<u8>,
        original_name: &str,
        content_type: &str,
    ) -> FlowResult<StoredObject> {
        let key = object_key(original_name);
        let size = bytes.len();
        debug!(key = %key, size, "Uploading object");

        let response = self
            .signed(Method::PUT, &key, &bytes)?
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::storage(&key, format!("{}: {}", status, body)));
        }

        info!(key = %key, size, "Object stored");
        let url = self.public_url(&key);
        Ok(StoredObject { key, url })
    }

    /// `None` when the object does not exist.
    pub async fn head_object(&self, key: &str) -> FlowResult<Option<ObjectInfo>> {
        let response = self.signed(Method::HEAD, key, b"")?.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let headers = response.headers();
                Ok(Some(ObjectInfo {
                    content_length: headers
                        .get(CONTENT_LENGTH)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse().ok()),
                    content_type: headers
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                }))
            }
            status => Err(FlowError::storage(key, status.to_string())),
        }
    }

    /// Deletes `key`. Deleting a missing object succeeds.
    pub async fn delete_object(&self, key: &str) -> FlowResult<()> {
        let response = self.signed(Method::DELETE, key, b"")?.send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(key = %key, "Object deleted");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(FlowError::storage(key, format!("{}: {}", status, body)))
    }

    /// Deletes `key`, logging instead of failing. Returns whether it worked.
    pub async fn delete_best_effort(&self, key: &str) -> bool {
        match self.delete_object(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Object cleanup failed");
                false
            }
        }
    }
}

#[async_trait]
impl FileRemover for ObjectStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::ObjectStorage
    }

    async fn remove(&self, key: &str) -> Result<(), RemoveError> {
        self.delete_object(key).await.map_err(|e| RemoveError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}
