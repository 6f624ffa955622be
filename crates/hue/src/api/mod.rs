mod entertainment;
mod resource;

pub use entertainment::*;
pub use resource::*;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct V2Error {
    pub description: String,
}

/// Envelope of every CLIP v2 reply
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct V2Reply<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub errors: Vec<V2Error>,
}
