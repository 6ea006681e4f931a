//!  Slotscout Facility Client
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Client Configuration
//!
//! Deployment constants for the reservation backend. Defaults target the
//! Mississauga ActiveCommunities site; every field can be overridden from a
//! JSON file or by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://anc.ca.apm.activecommunities.com";
pub const DEFAULT_ORGANIZATION: &str = "activemississauga";

/// Desktop Safari 18.5, matching the TLS emulation used by the HTTP client.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.5 Safari/605.1.15";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClientConfig {
    /// Scheme and host of the backend, without trailing slash.
    pub base_url: String,
    /// Path segment naming the municipality's tenant.
    pub organization: String,
    pub catalog_path: PathBuf,
    /// WebDriver endpoint (chromedriver) used for cookie acquisition.
    pub webdriver_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub navigation_timeout_secs: u64,
    pub daily_timeout_secs: u64,
    pub weekly_timeout_secs: u64,
    pub max_concurrent: u64,
    pub min_request_interval_ms: u64,
    /// Refresh cookies and retry once when the backend answers 401/403.
    pub refresh_on_auth_failure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            catalog_path: PathBuf::from("data/all_facilities.json"),
            webdriver_url: "http://localhost:9515".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-CA,en-US;q=0.7,en;q=0.3".to_string(),
            navigation_timeout_secs: 30,
            daily_timeout_secs: 10,
            weekly_timeout_secs: 15,
            max_concurrent: 4,
            min_request_interval_ms: 300,
            refresh_on_auth_failure: false,
        }
    }
}

impl ClientConfig {
    /// Load overrides from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// `{base_url}/{organization}`, the root of every backend path.
    pub fn tenant_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.organization.trim_matches('/')
        )
    }

    /// Page the headless browser visits to mint session cookies.
    pub fn landing_url(&self) -> String {
        format!("{}/reservation/landing/search", self.tenant_root())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn daily_timeout(&self) -> Duration {
        Duration::from_secs(self.daily_timeout_secs)
    }

    pub fn weekly_timeout(&self) -> Duration {
        Duration::from_secs(self.weekly_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"base_url": "http://127.0.0.1:9000/", "daily_timeout_secs": 3}"#)
                .expect("valid config");
        assert_eq!(cfg.tenant_root(), "http://127.0.0.1:9000/activemississauga");
        assert_eq!(cfg.daily_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.weekly_timeout(), Duration::from_secs(15));
        assert!(!cfg.refresh_on_auth_failure);
    }

    #[test]
    fn landing_url_targets_search_page() {
        let cfg = ClientConfig::default();
        assert_eq!(
            cfg.landing_url(),
            "https://anc.ca.apm.activecommunities.com/activemississauga/reservation/landing/search"
        );
    }
}
