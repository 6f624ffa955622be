use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Client, error::CleanerResult};

/// Cause of a connection failure, as far as it can be told from the error
/// message.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    IpChanged,
    CredentialExpired,
    GenericConnectionError,
}

impl RepairKind {
    pub const ALL: [Self; 3] = [
        Self::IpChanged,
        Self::CredentialExpired,
        Self::GenericConnectionError,
    ];

    const IP_CHANGED_MARKERS: &'static [&'static str] = &["connection refused", "no route to host"];
    const CREDENTIAL_MARKERS: &'static [&'static str] = &["unauthorized", "401"];

    /// Classify a failure message by substring (case-insensitive)
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        let contains_any = |markers: &[&str]| markers.iter().any(|m| message.contains(m));

        if contains_any(Self::IP_CHANGED_MARKERS) {
            Self::IpChanged
        } else if contains_any(Self::CREDENTIAL_MARKERS) {
            Self::CredentialExpired
        } else {
            Self::GenericConnectionError
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IpChanged => "ip_changed",
            Self::CredentialExpired => "credential_expired",
            Self::GenericConnectionError => "generic_connection_error",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::IpChanged => "Hue hub unreachable",
            Self::CredentialExpired => "Hue application key rejected",
            Self::GenericConnectionError => "Hue hub connection error",
        }
    }

    #[must_use]
    pub fn describe(self, host: &str, message: &str) -> String {
        match self {
            Self::IpChanged => format!(
                "Cannot reach the Hue hub at {host}. Its address may have changed; \
                 update the host in the configuration. ({message})"
            ),
            Self::CredentialExpired => format!(
                "The Hue hub at {host} rejected the application key. \
                 Generate a new key with `hue-cleaner pair --host {host}`. ({message})"
            ),
            Self::GenericConnectionError => format!(
                "Repeated errors while talking to the Hue hub at {host}: {message}"
            ),
        }
    }

    /// Key under which a repair request for this kind and host is stored
    #[must_use]
    pub fn issue_key(self, host: &str) -> String {
        format!("{}:{host}", self.name())
    }

    /// Deduplication key of the notification sent for this kind and host
    #[must_use]
    pub fn notification_key(self, host: &str) -> String {
        format!("hue_cleaner_{}_{host}", self.name())
    }
}

impl Display for RepairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct RepairIssue {
    pub kind: RepairKind,
    pub host: String,
    pub message: String,
    pub created: DateTime<Utc>,
}

impl RepairIssue {
    #[must_use]
    pub fn new(kind: RepairKind, host: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            host: host.into(),
            message: message.into(),
            created: Utc::now(),
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        self.kind.issue_key(&self.host)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub created: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            created: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct IssuesReply {
    pub issues: Vec<RepairIssue>,
    pub notifications: Vec<Notification>,
}

impl Client {
    pub async fn issues(&self) -> CleanerResult<IssuesReply> {
        self.get("issues").await
    }
}
