use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

#[derive(Copy, Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RType {
    EntertainmentConfiguration,
}

impl RType {
    /// Name of the resource type, as used in CLIP v2 urls and payloads
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EntertainmentConfiguration => "entertainment_configuration",
        }
    }

    /// Relative path of the collection endpoint for this resource type
    #[must_use]
    pub fn collection_path(self) -> String {
        format!("{}/{}", crate::CLIP_V2_RESOURCE_PATH, self.name())
    }

    /// Relative path of a single resource of this type
    #[must_use]
    pub fn item_path(self, id: &str) -> String {
        format!("{}/{id}", self.collection_path())
    }
}

impl Display for RType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
