use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Client, error::CleanerResult};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct CleanerConfig {
    pub listen: SocketAddr,
    pub issues_file: Utf8PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct HubServer {
    pub host: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub marker: Option<String>,
    pub scan_interval_secs: Option<NonZeroU32>,
    pub settle_delay_secs: Option<u32>,
    pub pacing_ms: Option<u32>,
    pub failure_threshold: Option<NonZeroU32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct HassServer {
    pub url: Url,
    pub token_env: Option<String>,
    pub entity_domain: Option<String>,
    pub entity_match: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub cleaner: CleanerConfig,
    #[serde(default)]
    pub hubs: BTreeMap<String, HubServer>,
    #[serde(default)]
    pub hass: Option<HassServer>,
}

impl AppConfig {
    #[must_use]
    pub fn has_hubs(&self) -> bool {
        !self.hubs.is_empty()
    }
}

impl HubServer {
    pub const DEFAULT_MARKER: &'static str = "Entertainment area";
    pub const DEFAULT_SCAN_INTERVAL_SECS: u32 = 3600;
    pub const DEFAULT_SETTLE_DELAY_SECS: u32 = 5;
    pub const DEFAULT_PACING_MS: u32 = 500;
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

    #[must_use]
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: Some(api_key.into()),
            api_key_env: None,
            marker: None,
            scan_interval_secs: None,
            settle_delay_secs: None,
            pacing_ms: None,
            failure_threshold: None,
        }
    }

    /// The application key, either given inline or read from the
    /// environment variable named by `api_key_env`.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        let key = match (&self.api_key, &self.api_key_env) {
            (Some(key), _) => Some(key.clone()),
            (None, Some(env)) => std::env::var(env).ok(),
            (None, None) => None,
        };
        key.map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        self.marker.as_deref().unwrap_or(Self::DEFAULT_MARKER)
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        let secs = self
            .scan_interval_secs
            .map_or(Self::DEFAULT_SCAN_INTERVAL_SECS, NonZeroU32::get);
        Duration::from_secs(u64::from(secs))
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        let secs = self
            .settle_delay_secs
            .unwrap_or(Self::DEFAULT_SETTLE_DELAY_SECS);
        Duration::from_secs(u64::from(secs))
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(u64::from(
            self.pacing_ms.unwrap_or(Self::DEFAULT_PACING_MS),
        ))
    }

    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
            .map_or(Self::DEFAULT_FAILURE_THRESHOLD, NonZeroU32::get)
    }
}

impl HassServer {
    pub const DEFAULT_TOKEN_ENV: &'static str = "HASS_TOKEN";
    pub const DEFAULT_ENTITY_DOMAIN: &'static str = "binary_sensor";
    pub const DEFAULT_ENTITY_MATCH: &'static str = "entertainment";

    #[must_use]
    pub fn token_env(&self) -> &str {
        self.token_env.as_deref().unwrap_or(Self::DEFAULT_TOKEN_ENV)
    }

    #[must_use]
    pub fn entity_domain(&self) -> &str {
        self.entity_domain
            .as_deref()
            .unwrap_or(Self::DEFAULT_ENTITY_DOMAIN)
    }

    #[must_use]
    pub fn entity_match(&self) -> &str {
        self.entity_match
            .as_deref()
            .unwrap_or(Self::DEFAULT_ENTITY_MATCH)
    }
}

impl Client {
    pub async fn config(&self) -> CleanerResult<AppConfig> {
        self.get("config").await
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::time::Duration;

    use crate::config::HubServer;

    #[test]
    fn hub_defaults() {
        let hub = HubServer::new("192.168.1.2", "key");

        assert_eq!(hub.marker(), "Entertainment area");
        assert_eq!(hub.scan_interval(), Duration::from_secs(3600));
        assert_eq!(hub.settle_delay(), Duration::from_secs(5));
        assert_eq!(hub.pacing(), Duration::from_millis(500));
        assert_eq!(hub.failure_threshold(), 3);
    }

    #[test]
    fn hub_overrides() {
        let hub = HubServer {
            marker: Some("Area".to_string()),
            scan_interval_secs: NonZeroU32::new(60),
            settle_delay_secs: Some(0),
            pacing_ms: Some(0),
            failure_threshold: NonZeroU32::new(5),
            ..HubServer::new("hub.local", "key")
        };

        assert_eq!(hub.marker(), "Area");
        assert_eq!(hub.scan_interval(), Duration::from_secs(60));
        assert_eq!(hub.settle_delay(), Duration::ZERO);
        assert_eq!(hub.pacing(), Duration::ZERO);
        assert_eq!(hub.failure_threshold(), 5);
    }

    #[test]
    fn api_key_is_trimmed() {
        let hub = HubServer::new("hub", "  abc \n");
        assert_eq!(hub.api_key().as_deref(), Some("abc"));

        let hub = HubServer::new("hub", "   ");
        assert_eq!(hub.api_key(), None);
    }
}
