//! Configuration for the listing page.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Path of the create-listing endpoint, relative to `api_base`.
pub const CREATE_PATH: &str = "/create";

/// Query marker selecting the unauthenticated bypass mode of the create endpoint.
pub const CONSOLE_TEST_QUERY: &str = "console_test=1";

/// Configuration for a [`crate::page::ListingPage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Base URL of the listings API (e.g., <http://localhost:3000/api/accounts>)
    pub api_base: String,

    /// Where to send the seller when there is no session or it expired
    pub login_path: String,

    /// Image URL sent when the gallery is empty
    pub placeholder_image: String,

    /// Delay between the "please login again" notice and the redirect, in milliseconds
    pub unauthorized_redirect_delay_ms: u64,

    /// How long a notice stays visible before dismissing itself, in milliseconds
    pub notice_duration_ms: u64,

    /// Timeout for each HTTP request in milliseconds
    pub timeout_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api/accounts".to_string(),
            login_path: "/login.html".to_string(),
            placeholder_image: "https://via.placeholder.com/400x300?text=No+Image".to_string(),
            unauthorized_redirect_delay_ms: 1500,
            notice_duration_ms: 3000,
            timeout_ms: 30000,
        }
    }
}

impl ListingConfig {
    /// Load a config from a JSON file. Keys left out keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Endpoint with any trailing slash removed, ready for a path to be appended.
    pub fn endpoint(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Path (with query) of the bypass variant of the create endpoint.
    pub fn console_test_path(&self) -> String {
        format!("{CREATE_PATH}?{CONSOLE_TEST_QUERY}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.json");
        std::fs::write(&path, r#"{"api_base": "https://market.example/api/"}"#).unwrap();

        let config = ListingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.api_base, "https://market.example/api/");
        assert_eq!(config.endpoint(), "https://market.example/api");
        assert_eq!(config.login_path, "/login.html");
        assert_eq!(config.unauthorized_redirect_delay_ms, 1500);
    }

    #[test]
    fn test_console_test_path() {
        let config = ListingConfig::default();
        assert_eq!(config.console_test_path(), "/create?console_test=1");
    }
}
