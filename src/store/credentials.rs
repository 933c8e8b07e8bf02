//! Rackspace credential loading
//!
//! Reads the pyrax-style INI file:
//!
//! ```text
//! [rackspace_cloud]
//! username = YOUR_USERNAME
//! api_key  = YOUR_API_KEY
//! ```
//!
//! `PG_RAXARCHIVE_USERNAME` and `PG_RAXARCHIVE_API_KEY` take priority over the
//! file when both are set.

use crate::{Error, Result};
use std::path::Path;

/// Section holding the account credentials
const SECTION: &str = "rackspace_cloud";

pub const USERNAME_ENV: &str = "PG_RAXARCHIVE_USERNAME";
pub const API_KEY_ENV: &str = "PG_RAXARCHIVE_API_KEY";

/// Account credentials for the identity service
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    /// Load credentials, preferring the environment over `path`
    pub fn load(path: &Path) -> Result<Self> {
        if let Some(creds) = Self::from_env() {
            return Ok(creds);
        }
        Self::from_file(path)
    }

    /// Credentials from the environment, if both variables are set
    pub fn from_env() -> Option<Self> {
        let username = std::env::var(USERNAME_ENV).ok()?;
        let api_key = std::env::var(API_KEY_ENV).ok()?;
        Some(Self::new(username, api_key))
    }

    /// Read the credential file at `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse INI content, reading only the `[rackspace_cloud]` section
    pub fn parse(content: &str) -> Result<Self> {
        let mut in_section = false;
        let mut username = None;
        let mut api_key = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_section = header.trim() == SECTION;
                continue;
            }
            if !in_section {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                continue;
            };
            match key.trim() {
                "username" => username = Some(value.trim().to_string()),
                "api_key" => api_key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (username, api_key) {
            (Some(u), Some(k)) if !u.is_empty() && !k.is_empty() => Ok(Self::new(u, k)),
            _ => Err(Error::Config(format!(
                "Missing username or api_key in [{}]",
                SECTION
            ))),
        }
    }
}
