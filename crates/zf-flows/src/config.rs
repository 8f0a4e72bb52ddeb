//! # Integration Configuration
//!
//! Credentials and endpoints for the external services.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     GEMINI_API_KEY=...   S3_BUCKET=zf-uploads   GOOGLE_CLIENT_EMAIL=...│
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/zf-ops/integrations.toml (Linux)                         │
//! │     ~/Library/Application Support/com.zf.ops/integrations.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Public API endpoints, no credentials                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Missing credentials are not a load error: each client reports the
//! missing variable when it is constructed, so the rest of the data layer
//! keeps working without them.
//!
//! ## Configuration File Format
//! ```toml
//! [genai]
//! api_key = "..."
//! model = "gemini-1.5-flash"
//!
//! [s3]
//! endpoint = "https://s3.eu-central-1.amazonaws.com"
//! region = "eu-central-1"
//! bucket = "zf-uploads"
//! public_url_prefix = "https://cdn.zf.example/"
//!
//! [drive]
//! client_email = "uploader@zf-ops.iam.gserviceaccount.com"
//! folder_id = "1AbC..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

use crate::error::{FlowError, FlowResult};

// =============================================================================
// Environment Variables
// =============================================================================

pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const GENAI_MODEL: &str = "ZF_GENAI_MODEL";
pub const S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const S3_REGION: &str = "S3_REGION";
pub const S3_BUCKET: &str = "S3_BUCKET";
pub const S3_ACCESS_KEY_ID: &str = "S3_ACCESS_KEY_ID";
pub const S3_SECRET_ACCESS_KEY: &str = "S3_SECRET_ACCESS_KEY";
pub const S3_PUBLIC_URL_PREFIX: &str = "S3_PUBLIC_URL_PREFIX";
pub const GOOGLE_CLIENT_EMAIL: &str = "GOOGLE_CLIENT_EMAIL";
pub const GOOGLE_PRIVATE_KEY: &str = "GOOGLE_PRIVATE_KEY";
pub const GOOGLE_DRIVE_FOLDER_ID: &str = "GOOGLE_DRIVE_FOLDER_ID";

// =============================================================================
// Generative Model
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiSettings {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    #[serde(default = "default_genai_base")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_genai_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for GenAiSettings {
    fn default() -> Self {
        GenAiSettings {
            api_key: None,
            model: default_model(),
            base_url: default_genai_base(),
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Object Storage
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Settings {
    /// Service endpoint without the bucket, e.g. `https://s3.amazonaws.com`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Prepended to object keys to form public URLs. Defaults to
    /// `{endpoint}/{bucket}/`.
    #[serde(default)]
    pub public_url_prefix: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for S3Settings {
    fn default() -> Self {
        S3Settings {
            endpoint: None,
            region: default_region(),
            bucket: None,
            access_key_id: None,
            secret_access_key: None,
            public_url_prefix: None,
        }
    }
}

// =============================================================================
// Drive
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSettings {
    /// Service-account email.
    #[serde(default)]
    pub client_email: Option<String>,

    /// Service-account RSA key in PEM form.
    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default = "default_drive_api")]
    pub api_base: String,

    #[serde(default = "default_drive_upload")]
    pub upload_base: String,

    /// Parent folder for uploads.
    #[serde(default)]
    pub folder_id: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_drive_api() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_drive_upload() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

impl Default for DriveSettings {
    fn default() -> Self {
        DriveSettings {
            client_email: None,
            private_key: None,
            token_uri: default_token_uri(),
            api_base: default_drive_api(),
            upload_base: default_drive_upload(),
            folder_id: None,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub genai: GenAiSettings,

    #[serde(default)]
    pub s3: S3Settings,

    #[serde(default)]
    pub drive: DriveSettings,
}

impl IntegrationsConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (integrations.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> FlowResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading integrations config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Integrations config not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Checks that every configured URL parses.
    pub fn validate(&self) -> FlowResult<()> {
        Url::parse(&self.genai.base_url)?;
        Url::parse(&self.drive.token_uri)?;
        Url::parse(&self.drive.api_base)?;
        Url::parse(&self.drive.upload_base)?;
        if let Some(endpoint) = &self.s3.endpoint {
            Url::parse(endpoint)?;
        }
        if self.genai.timeout_secs == 0 {
            return Err(FlowError::Config(
                "genai.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(GEMINI_API_KEY) {
            debug!("Using model API key from environment");
            self.genai.api_key = Some(key);
        }
        if let Some(model) = get(GENAI_MODEL) {
            self.genai.model = model;
        }

        if let Some(endpoint) = get(S3_ENDPOINT) {
            self.s3.endpoint = Some(endpoint);
        }
        if let Some(region) = get(S3_REGION) {
            self.s3.region = region;
        }
        if let Some(bucket) = get(S3_BUCKET) {
            self.s3.bucket = Some(bucket);
        }
        if let Some(id) = get(S3_ACCESS_KEY_ID) {
            self.s3.access_key_id = Some(id);
        }
        if let Some(secret) = get(S3_SECRET_ACCESS_KEY) {
            self.s3.secret_access_key = Some(secret);
        }
        if let Some(prefix) = get(S3_PUBLIC_URL_PREFIX) {
            self.s3.public_url_prefix = Some(prefix);
        }

        if let Some(email) = get(GOOGLE_CLIENT_EMAIL) {
            self.drive.client_email = Some(email);
        }
        if let Some(key) = get(GOOGLE_PRIVATE_KEY) {
            // Keys pasted into env files usually carry escaped newlines
            self.drive.private_key = Some(key.replace("\\n", "\n"));
        }
        if let Some(folder) = get(GOOGLE_DRIVE_FOLDER_ID) {
            self.drive.folder_id = Some(folder);
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "zf", "ops")
            .map(|dirs| dirs.config_dir().join("integrations.toml"))
    }
}
