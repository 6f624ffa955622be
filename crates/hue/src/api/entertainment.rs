use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntertainmentStatus {
    Active,
    Inactive,
    /// Any status string this crate does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntertainmentConfigurationMetadata {
    pub name: String,
}

/// An entertainment area, as returned by
/// `GET /clip/v2/resource/entertainment_configuration`.
///
/// Only the fields needed to decide whether an area is stale are modelled,
/// everything else in the payload is ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntertainmentConfiguration {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntertainmentConfigurationMetadata>,
    #[serde(default)]
    pub status: EntertainmentStatus,
}

impl EntertainmentConfiguration {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: EntertainmentStatus) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            metadata: None,
            status,
        }
    }

    /// Display name of the area.
    ///
    /// Newer firmware only reports the name under `metadata`, older firmware
    /// only at the top level, so both are consulted.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.metadata.as_ref().map(|md| md.name.as_str()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.status == EntertainmentStatus::Inactive
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::api::{EntertainmentConfiguration, EntertainmentStatus, V2Reply};

    #[test]
    fn parse_list_reply() {
        let reply: V2Reply<EntertainmentConfiguration> = serde_json::from_value(json!({
            "data": [
                {"id": "1", "name": "Entertainment area 1", "status": "inactive", "type": "entertainment_configuration"},
                {"id": "2", "name": "Living Room", "status": "active"},
            ]
        }))
        .unwrap();

        assert!(reply.errors.is_empty());
        assert_eq!(reply.data.len(), 2);
        assert_eq!(reply.data[0].name(), "Entertainment area 1");
        assert!(reply.data[0].is_inactive());
        assert_eq!(reply.data[1].status, EntertainmentStatus::Active);
    }

    #[test]
    fn name_falls_back_to_metadata() {
        let ent: EntertainmentConfiguration = serde_json::from_value(json!({
            "id": "a",
            "metadata": {"name": "Entertainment area 7"},
            "status": "inactive",
        }))
        .unwrap();

        assert_eq!(ent.name(), "Entertainment area 7");
    }

    #[test]
    fn unknown_status_is_not_inactive() {
        let ent: EntertainmentConfiguration = serde_json::from_value(json!({
            "id": "a",
            "name": "Entertainment area",
            "status": "paused",
        }))
        .unwrap();

        assert_eq!(ent.status, EntertainmentStatus::Unknown);
        assert!(!ent.is_inactive());
    }

    #[test]
    fn missing_name_is_empty() {
        let ent: EntertainmentConfiguration =
            serde_json::from_value(json!({"id": "a", "status": "inactive"})).unwrap();

        assert_eq!(ent.name(), "");
    }
}
