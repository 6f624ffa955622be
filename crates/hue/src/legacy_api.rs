use serde::{Deserialize, Serialize};

use crate::error::{HueError, HueResult};

/// Error type reported by the hub when the link button has not been pressed
pub const LINK_BUTTON_NOT_PRESSED: u32 = 101;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct V1Error {
    #[serde(rename = "type")]
    pub typ: u32,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HueApiResult<T> {
    Success(T),
    Error(V1Error),
}

impl<T> HueApiResult<T> {
    pub fn into_result(self) -> HueResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error(err) if err.typ == LINK_BUTTON_NOT_PRESSED => {
                Err(HueError::LinkButtonNotPressed)
            }
            Self::Error(err) => Err(HueError::V1Error {
                typ: err.typ,
                address: err.address,
                description: err.description,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub devicetype: String,
    #[serde(default)]
    pub generateclientkey: bool,
}

impl NewUser {
    /// Registration request for `app` running on `platform`
    /// (sent to the hub as `"<app>#<platform>"`)
    #[must_use]
    pub fn new(app: &str, platform: &str) -> Self {
        Self {
            devicetype: format!("{app}#{platform}"),
            generateclientkey: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewUserReply {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientkey: Option<String>,
}

impl NewUserReply {
    /// Parse the reply to `POST /api`.
    ///
    /// The hub always answers with a list, of which only the first element
    /// is relevant.
    pub fn from_reply(reply: Vec<HueApiResult<Self>>) -> HueResult<Self> {
        reply
            .into_iter()
            .next()
            .ok_or(HueError::EmptyReply)?
            .into_result()
    }
}
