use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Client, error::CleanerResult};

/// How reconciliation passes are triggered, chosen once at startup
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CleanerMode {
    EventDriven,
    Polling,
}

impl Display for CleanerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventDriven => f.write_str("event-driven"),
            Self::Polling => f.write_str("polling"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CleanerStatus {
    #[default]
    Active,
    Error,
}

impl Display for CleanerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub name: String,
    pub host: String,
    pub cleaned_count: u64,
    pub last_clean: Option<DateTime<Utc>>,
    pub areas_cleaned_this_run: u32,
    pub status: CleanerStatus,
    pub mode: CleanerMode,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, mode: CleanerMode) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            cleaned_count: 0,
            last_clean: None,
            areas_cleaned_this_run: 0,
            status: CleanerStatus::Active,
            mode,
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

/// Outcome of a manual clean request for a single hub
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct CleanReply {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Client {
    pub async fn status(&self) -> CleanerResult<Vec<StatusSnapshot>> {
        self.get("status").await
    }

    pub async fn hub_status(&self, name: &str) -> CleanerResult<StatusSnapshot> {
        self.get(&format!("status/{name}")).await
    }

    pub async fn clean_now(&self) -> CleanerResult<Vec<CleanReply>> {
        self.post("clean", ()).await
    }

    pub async fn clean_all(&self) -> CleanerResult<Vec<CleanReply>> {
        self.post("clean_all", ()).await
    }

    pub async fn clean_hub(&self, name: &str, include_active: bool) -> CleanerResult<CleanReply> {
        self.post(&format!("clean/{name}?all={include_active}"), ())
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::status::{CleanerMode, CleanerStatus, StatusSnapshot};

    #[test]
    fn snapshot_wire_format() {
        let snap = StatusSnapshot::new("living", "192.168.1.2", CleanerMode::EventDriven);

        assert_eq!(
            serde_json::to_value(&snap).unwrap(),
            json!({
                "name": "living",
                "host": "192.168.1.2",
                "cleaned_count": 0,
                "last_clean": null,
                "areas_cleaned_this_run": 0,
                "status": "active",
                "mode": "event-driven",
                "consecutive_failures": 0,
            })
        );
    }

    #[test]
    fn status_names() {
        assert_eq!(serde_json::to_value(CleanerStatus::Error).unwrap(), json!("error"));
        assert_eq!(serde_json::to_value(CleanerMode::Polling).unwrap(), json!("polling"));
        assert_eq!(CleanerMode::Polling.to_string(), "polling");
        assert_eq!(CleanerStatus::Error.to_string(), "error");
    }
}
