use thiserror::Error;

#[derive(Error, Debug)]
pub enum HueError {
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error("Link button not pressed (press the button on the hub, then retry)")]
    LinkButtonNotPressed,

    #[error("Hue api error {typ} at {address:?}: {description}")]
    V1Error {
        typ: u32,
        address: String,
        description: String,
    },

    #[error("Empty reply from hue api")]
    EmptyReply,
}

pub type HueResult<T> = Result<T, HueError>;
