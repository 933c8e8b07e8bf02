//! Rackspace Cloud Files adapter
//!
//! Authenticates against the Rackspace identity service (v2.0, API key),
//! locates the `cloudFiles` endpoint for the configured region and talks to
//! the Swift object API of a single container.

use super::{Credentials, ObjectStore};
use crate::config::ArchiverConfig;
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Default identity endpoint
pub const DEFAULT_IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Identity service catalog as returned by `POST /tokens`
#[cfg(feature = "cloudfiles")]
mod catalog {
    use crate::{Error, Result};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct AuthResponse {
        pub access: Access,
    }

    #[derive(Debug, Deserialize)]
    pub struct Access {
        pub token: Token,
        #[serde(rename = "serviceCatalog", default)]
        pub service_catalog: Vec<Service>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Token {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Service {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub endpoints: Vec<Endpoint>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Endpoint {
        #[serde(default)]
        pub region: Option<String>,
        #[serde(rename = "publicURL", default)]
        pub public_url: Option<String>,
        #[serde(rename = "internalURL", default)]
        pub internal_url: Option<String>,
    }

    /// Storage URL of the object-store service in `region`
    pub fn select_endpoint(services: &[Service], region: &str, use_public: bool) -> Result<String> {
        let service = services
            .iter()
            .find(|s| s.name == "cloudFiles")
            .or_else(|| services.iter().find(|s| s.kind == "object-store"))
            .ok_or_else(|| Error::Config("No object-store service in catalog".into()))?;

        let endpoint = service
            .endpoints
            .iter()
            .find(|e| {
                e.region
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(region))
            })
            .ok_or_else(|| Error::Config(format!("No Cloud Files endpoint in region {}", region)))?;

        let (url, kind) = if use_public {
            (&endpoint.public_url, "public")
        } else {
            (&endpoint.internal_url, "internal")
        };

        url.clone().ok_or_else(|| {
            Error::Config(format!(
                "Region {} has no {} Cloud Files endpoint",
                region, kind
            ))
        })
    }
}

/// Object store backed by one Cloud Files container
#[cfg(feature = "cloudfiles")]
pub struct CloudFilesStore {
    client: reqwest::blocking::Client,
    token: String,
    container_url: reqwest::Url,
}

#[cfg(feature = "cloudfiles")]
impl CloudFilesStore {
    /// Load credentials from the configured file and connect
    pub fn connect(config: &ArchiverConfig) -> Result<Self> {
        let creds = Credentials::load(&config.credentials_path)?;
        Self::connect_with(config, &creds)
    }

    /// Authenticate with explicit credentials and make sure the container exists
    pub fn connect_with(config: &ArchiverConfig, creds: &Credentials) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let (token, storage_url) = Self::authenticate(&client, config, creds)?;

        let mut container_url = reqwest::Url::parse(&storage_url)
            .map_err(|e| Error::Config(format!("Invalid storage URL {}: {}", storage_url, e)))?;
        container_url
            .path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid storage URL {}", storage_url)))?
            .pop_if_empty()
            .push(&config.container);

        let store = CloudFilesStore {
            client,
            token,
            container_url,
        };
        store.ensure_container()?;
        Ok(store)
    }

    fn authenticate(
        client: &reqwest::blocking::Client,
        config: &ArchiverConfig,
        creds: &Credentials,
    ) -> Result<(String, String)> {
        let url = format!("{}/tokens", config.identity_url.trim_end_matches('/'));
        log::debug!("Authenticating {} against {}", creds.username, url);

        let body = serde_json::json!({
            "auth": {
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": creds.username,
                    "apiKey": creds.api_key,
                }
            }
        });

        let resp = client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| Error::Http(format!("Authentication request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(Error::Store(format!(
                "Authentication failed ({}): {}",
                status, text
            )));
        }

        let data: catalog::AuthResponse = resp
            .json()
            .map_err(|e| Error::Http(format!("Invalid identity response: {}", e)))?;

        let endpoint = catalog::select_endpoint(
            &data.access.service_catalog,
            &config.region,
            config.use_public,
        )?;
        Ok((data.access.token.id, endpoint))
    }

    /// Create the container if needed (PUT is idempotent)
    fn ensure_container(&self) -> Result<()> {
        let resp = self
            .client
            .put(self.container_url.clone())
            .header("X-Auth-Token", &self.token)
            .header("Content-Length", "0")
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::check(resp, "Create container", self.container_url.as_str())?;
        Ok(())
    }

    fn object_url(&self, name: &str) -> reqwest::Url {
        let mut url = self.container_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(name);
        }
        url
    }

    /// Map a non-success status to an error; 404 means the object is missing
    fn check(
        resp: reqwest::blocking::Response,
        action: &str,
        name: &str,
    ) -> Result<reqwest::blocking::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(name.to_string()));
        }
        let text = resp.text().unwrap_or_default();
        Err(Error::Store(format!(
            "{} {} failed: {} - {}",
            action, name, status, text
        )))
    }
}

#[cfg(feature = "cloudfiles")]
impl ObjectStore for CloudFilesStore {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        // Listings are capped server side (10,000 names); segments beyond
        // that page are not seen.
        let resp = self
            .client
            .get(self.container_url.clone())
            .query(&[("format", "plain")])
            .header("X-Auth-Token", &self.token)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(BTreeSet::new());
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::Store(format!(
                "Container {} does not exist",
                self.container_url
            )));
        }
        let resp = Self::check(resp, "List", self.container_url.as_str())?;
        let text = resp.text().map_err(|e| Error::Http(e.to_string()))?;

        Ok(parse_listing(&text))
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.object_url(name))
            .header("X-Auth-Token", &self.token)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;
        let resp = Self::check(resp, "Fetch", name)?;
        let bytes = resp.bytes().map_err(|e| Error::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn upload(&self, local_path: &Path, name: &str) -> Result<()> {
        let file = std::fs::File::open(local_path)?;
        let resp = self
            .client
            .put(self.object_url(name))
            .header("X-Auth-Token", &self.token)
            .header("Content-Type", "application/octet-stream")
            .body(file)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::check(resp, "Upload", name)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.object_url(name))
            .header("X-Auth-Token", &self.token)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;
        Self::check(resp, "Delete", name)?;
        Ok(())
    }
}

/// Object names from a `format=plain` listing, one per line, kept verbatim
#[cfg(feature = "cloudfiles")]
fn parse_listing(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stub implementation when the cloudfiles feature is disabled
#[cfg(not(feature = "cloudfiles"))]
pub struct CloudFilesStore;

#[cfg(not(feature = "cloudfiles"))]
impl CloudFilesStore {
    pub fn connect(_config: &ArchiverConfig) -> Result<Self> {
        Err(Self::disabled())
    }

    pub fn connect_with(_config: &ArchiverConfig, _creds: &Credentials) -> Result<Self> {
        Err(Self::disabled())
    }

    fn disabled() -> Error {
        Error::Store("Cloud Files support not enabled. Compile with --features cloudfiles".into())
    }
}

#[cfg(not(feature = "cloudfiles"))]
impl ObjectStore for CloudFilesStore {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        Err(Self::disabled())
    }

    fn fetch(&self, _name: &str) -> Result<Vec<u8>> {
        Err(Self::disabled())
    }

    fn upload(&self, _local_path: &Path, _name: &str) -> Result<()> {
        Err(Self::disabled())
    }

    fn delete(&self, _name: &str) -> Result<()> {
        Err(Self::disabled())
    }
}
