//! Archiver configuration
//!
//! Passed explicitly to the store adapter; nothing here is process-global.

use crate::store::DEFAULT_IDENTITY_URL;
use std::path::PathBuf;

pub const DEFAULT_REGION: &str = "DFW";
pub const DEFAULT_CONTAINER: &str = "pg_archives";
pub const DEFAULT_CREDENTIALS_PATH: &str = "/etc/pg_raxarchive.ini";

/// Where and how to reach the archive container
#[derive(Clone, Debug)]
pub struct ArchiverConfig {
    /// Cloud Files region (e.g. "DFW", "ORD")
    pub region: String,
    /// Container holding the archived segments
    pub container: String,
    /// Use the public endpoint instead of the service network one
    pub use_public: bool,
    /// Path of the credential file
    pub credentials_path: PathBuf,
    /// Identity service base URL
    pub identity_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        ArchiverConfig {
            region: DEFAULT_REGION.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            use_public: false,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl ArchiverConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_public(mut self, use_public: bool) -> Self {
        self.use_public = use_public;
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Override the identity endpoint, falling back to `PG_RAXARCHIVE_IDENTITY_URL`
    pub fn with_identity_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.or_else(|| std::env::var("PG_RAXARCHIVE_IDENTITY_URL").ok()) {
            self.identity_url = url;
        }
        self
    }

    /// Credential file to use when none was given explicitly
    ///
    /// `/etc/pg_raxarchive.ini` when present, otherwise the per-user config dir.
    pub fn default_credentials_path() -> PathBuf {
        let system = PathBuf::from(DEFAULT_CREDENTIALS_PATH);
        if system.exists() {
            return system;
        }
        dirs::config_dir()
            .map(|d| d.join("pg_raxarchive.ini"))
            .unwrap_or(system)
    }
}
