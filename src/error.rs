use std::error::Error as StdError;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    TungsteniteError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    #[error(transparent)]
    HueError(#[from] hue::error::HueError),

    #[error(transparent)]
    CleanerError(#[from] cleaner_api::error::CleanerError),

    /* hub errors */
    #[error("Invalid hub host {0:?} (expected an ip address or host name)")]
    InvalidHost(String),

    #[error("No application key configured for hub {0:?}")]
    MissingApiKey(String),

    #[error("Cannot reach hub {host}")]
    HubTransport {
        host: String,
        #[source]
        err: reqwest::Error,
    },

    #[error("Unauthorized ({status}) by hub {host}, the application key was rejected")]
    HubUnauthorized { host: String, status: StatusCode },

    #[error("Unexpected reply from hub {host} ({status}): {body}")]
    HubStatus {
        host: String,
        status: StatusCode,
        body: String,
    },

    #[error("Invalid reply from hub {host}: {message}")]
    HubProtocol { host: String, message: String },

    /* coordinator errors */
    #[error("No hub named {0:?}")]
    UnknownHub(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn service_error(msg: impl Into<String>) -> Self {
        Self::ServiceError(msg.into())
    }

    /// Render this error followed by every error in its `source()` chain.
    ///
    /// Transport errors only name the underlying cause (like "Connection
    /// refused") deep in the chain, so this is the text used when
    /// classifying failures.
    #[must_use]
    pub fn chain_message(&self) -> String {
        let mut msg = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            let text = err.to_string();
            if !msg.contains(&text) {
                msg.push_str(": ");
                msg.push_str(&text);
            }
            source = err.source();
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::error::ApiError;

    #[test]
    fn chain_message_includes_sources() {
        let err = ApiError::from(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "Connection refused (os error 111)",
        ));

        assert!(err.chain_message().contains("Connection refused"));
    }

    #[test]
    fn unauthorized_message_mentions_status() {
        let err = ApiError::HubUnauthorized {
            host: "10.0.0.2".to_string(),
            status: reqwest::StatusCode::UNAUTHORIZED,
        };

        let msg = err.chain_message();
        assert!(msg.contains("Unauthorized"));
        assert!(msg.contains("401"));
    }
}
