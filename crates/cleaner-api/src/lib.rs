pub mod config;
pub mod error;
pub mod issue;
pub mod status;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{CleanerError, CleanerResult};

/// Client for the status api of a running hue-cleaner instance
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    /// Create a client for the instance listening at `url`
    /// (for example `http://127.0.0.1:8470`).
    pub fn new(url: &Url) -> CleanerResult<Self> {
        Self::from_reqwest(reqwest::Client::new(), url)
    }

    pub fn from_reqwest(http: reqwest::Client, url: &Url) -> CleanerResult<Self> {
        let base = url.join("/api/")?;
        Ok(Self { http, base })
    }

    async fn decode<T: DeserializeOwned>(
        url: Url,
        response: reqwest::Response,
    ) -> CleanerResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CleanerError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(response.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> CleanerResult<T> {
        let url = self.base.join(path)?;
        let response = self.http.get(url.clone()).send().await?;
        Self::decode(url, response).await
    }

    pub async fn post<D: Serialize + Send + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        data: D,
    ) -> CleanerResult<T> {
        let url = self.base.join(path)?;
        let response = self.http.post(url.clone()).json(&data).send().await?;
        Self::decode(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use crate::Client;

    #[test]
    fn base_url_gets_api_prefix() {
        let client = Client::new(&Url::parse("http://127.0.0.1:8470").unwrap()).unwrap();
        assert_eq!(client.base.as_str(), "http://127.0.0.1:8470/api/");
        assert_eq!(
            client.base.join("status/living").unwrap().as_str(),
            "http://127.0.0.1:8470/api/status/living"
        );
    }
}
