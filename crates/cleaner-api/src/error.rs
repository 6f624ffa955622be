use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error("Request to {url} failed ({status}): {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type CleanerResult<T> = Result<T, CleanerError>;
