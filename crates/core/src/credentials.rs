//! Credential store
//!
//! Loads access-key/secret/endpoint triples from a JSON file or the
//! environment. Credentials are validated on load and never printed in
//! cleartext.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Region used for request signing when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variables read by [`Credentials::from_env`]
pub const ENV_ACCESS_KEY_ID: &str = "OSN_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "OSN_SECRET_ACCESS_KEY";
pub const ENV_ENDPOINT_URL: &str = "OSN_ENDPOINT_URL";
pub const ENV_REGION: &str = "OSN_REGION";

/// Access credentials for one S3-compatible endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Raw file shape, every field optional so missing ones can be named
#[derive(Deserialize)]
struct RawCredentials {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    endpoint_url: Option<String>,
    region: Option<String>,
}

impl Credentials {
    /// Create credentials and validate them
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        endpoint_url: impl Into<String>,
    ) -> Result<Self> {
        let creds = Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            endpoint_url: endpoint_url.into(),
            region: default_region(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Override the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Load credentials from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;
        let creds = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            endpoint = %creds.endpoint_url,
            access_key = %creds.masked_access_key(),
            "Loaded credentials"
        );
        Ok(creds)
    }

    /// Parse credentials from a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawCredentials = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid credentials JSON: {e}")))?;

        let creds = Self {
            access_key_id: required("access_key_id", raw.access_key_id)?,
            secret_access_key: required("secret_access_key", raw.secret_access_key)?,
            endpoint_url: required("endpoint_url", raw.endpoint_url)?,
            region: raw
                .region
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(default_region),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Read credentials from `OSN_*` environment variables
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok();
        let creds = Self {
            access_key_id: required(ENV_ACCESS_KEY_ID, var(ENV_ACCESS_KEY_ID))?,
            secret_access_key: required(ENV_SECRET_ACCESS_KEY, var(ENV_SECRET_ACCESS_KEY))?,
            endpoint_url: required(ENV_ENDPOINT_URL, var(ENV_ENDPOINT_URL))?,
            region: var(ENV_REGION)
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(default_region),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Check that all fields are present and the endpoint is an http(s) URL
    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() {
            return Err(Error::Config("access_key_id cannot be empty".into()));
        }
        if self.secret_access_key.trim().is_empty() {
            return Err(Error::Config("secret_access_key cannot be empty".into()));
        }

        let url = url::Url::parse(&self.endpoint_url).map_err(|e| {
            Error::Config(format!("Invalid endpoint_url '{}': {e}", self.endpoint_url))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "endpoint_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::Config(format!(
                "endpoint_url has no host: {}",
                self.endpoint_url
            )));
        }

        Ok(())
    }

    /// Access key with everything but the first four characters hidden
    pub fn masked_access_key(&self) -> String {
        let visible: String = self.access_key_id.chars().take(4).collect();
        format!("{visible}****")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.masked_access_key())
            .field("secret_access_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .finish()
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(Error::Config(format!("{field} cannot be empty"))),
        None => Err(Error::Config(format!("Missing required field: {field}"))),
    }
}
