use std::time::Duration;

use reqwest::StatusCode;
use url::{Host, Url};

use hue::api::{EntertainmentConfiguration, RType, V2Reply};
use hue::legacy_api::{HueApiResult, NewUser, NewUserReply};
use hue::{HUE_APPLICATION_KEY_HEADER, LEGACY_API_PATH};

use crate::error::{ApiError, ApiResult};

/// Client for the CLIP v2 api of a single Hue hub.
///
/// The hub presents a self-signed certificate, so certificate validation is
/// disabled. Connection pooling is disabled as well: every request opens (and
/// closes) its own connection.
pub struct HubClient {
    host: String,
    base_url: Url,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl HubClient {
    pub const SCHEME: &'static str = "https";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(host: &str) -> ApiResult<Self> {
        let host = Self::validate_host(host)?;
        let base_url = Url::parse(&format!("{}://{host}/", Self::SCHEME))?;
        Self::from_base_url(&host, base_url)
    }

    /// Create a client talking to `base_url` instead of the hub's standard
    /// endpoint. `host` is only used for logging and error reporting.
    pub fn from_base_url(host: &str, base_url: Url) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            host: host.to_string(),
            base_url,
            http,
            api_key: None,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Accept plain ip addresses and host names only, without scheme, port
    /// or path.
    pub fn validate_host(host: &str) -> ApiResult<String> {
        let host = host.trim();
        if host.is_empty() || host.contains(['/', '@', '?', '#']) {
            return Err(ApiError::InvalidHost(host.to_string()));
        }

        match Host::parse(host) {
            Ok(Host::Domain(_) | Host::Ipv4(_)) => Ok(host.to_string()),
            Ok(Host::Ipv6(addr)) => Ok(format!("[{addr}]")),
            Err(_) => Err(ApiError::InvalidHost(host.to_string())),
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn api_key(&self) -> ApiResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::MissingApiKey(self.host.clone()))
    }

    fn endpoint_url(&self, endpoint: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        ApiError::HubTransport {
            host: self.host.clone(),
            err,
        }
    }

    async fn check_status(&self, response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ApiError::HubUnauthorized {
                host: self.host.clone(),
                status,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::HubStatus {
            host: self.host.clone(),
            status,
            body,
        })
    }

    async fn fetch_entertainment_configurations(
        &self,
    ) -> ApiResult<Vec<EntertainmentConfiguration>> {
        let url = self.endpoint_url(&RType::EntertainmentConfiguration.collection_path())?;

        let response = self
            .http
            .get(url)
            .header(HUE_APPLICATION_KEY_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let response = self.check_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;

        let reply: V2Reply<EntertainmentConfiguration> =
            serde_json::from_str(&body).map_err(|err| ApiError::HubProtocol {
                host: self.host.clone(),
                message: err.to_string(),
            })?;

        for err in &reply.errors {
            log::warn!("[{}] Hub reported: {}", self.host, err.description);
        }

        Ok(reply.data)
    }

    /// `GET /clip/v2/resource/entertainment_configuration`
    ///
    /// Failures are logged here, and returned so the caller can tell an
    /// empty hub from an unreachable one.
    pub async fn list_entertainment_configurations(
        &self,
    ) -> ApiResult<Vec<EntertainmentConfiguration>> {
        let res = self.fetch_entertainment_configurations().await;
        match &res {
            Ok(areas) => log::debug!(
                "[{}] Hub reports {} entertainment areas",
                self.host,
                areas.len()
            ),
            Err(err) => log::error!(
                "[{}] Failed to get entertainment areas: {}",
                self.host,
                err.chain_message()
            ),
        }
        res
    }

    /// `DELETE /clip/v2/resource/entertainment_configuration/{id}`
    ///
    /// Only 200 and 204 count as success.
    pub async fn delete_entertainment_configuration(&self, id: &str) -> bool {
        let res = async {
            let url = self.endpoint_url(&RType::EntertainmentConfiguration.item_path(id))?;
            let response = self
                .http
                .delete(url)
                .header(HUE_APPLICATION_KEY_HEADER, self.api_key()?)
                .send()
                .await
                .map_err(|err| self.transport_error(err))?;
            ApiResult::Ok(response.status())
        }
        .await;

        match res {
            Ok(StatusCode::OK | StatusCode::NO_CONTENT) => {
                log::debug!("[{}] Deleted entertainment area {id}", self.host);
                true
            }
            Ok(status) => {
                log::warn!(
                    "[{}] Failed to delete entertainment area {id}: {status}",
                    self.host
                );
                false
            }
            Err(err) => {
                log::error!(
                    "[{}] Error deleting entertainment area {id}: {}",
                    self.host,
                    err.chain_message()
                );
                false
            }
        }
    }

    /// Verify that the configured application key is accepted by the hub
    pub async fn check_credential(&self) -> ApiResult<usize> {
        Ok(self.fetch_entertainment_configurations().await?.len())
    }

    /// `POST /api`: ask the hub for a new application key.
    ///
    /// Fails with [`hue::error::HueError::LinkButtonNotPressed`] until the
    /// link button on the hub has been pressed. Retrying is up to the caller.
    pub async fn register(&self, app: &str, platform: &str) -> ApiResult<NewUserReply> {
        let url = self.endpoint_url(LEGACY_API_PATH)?;

        let response = self
            .http
            .post(url)
            .json(&NewUser::new(app, platform))
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let response = self.check_status(response).await?;
        let reply: Vec<HueApiResult<NewUserReply>> = response
            .json()
            .await
            .map_err(|err| ApiError::HubProtocol {
                host: self.host.clone(),
                message: err.to_string(),
            })?;

        Ok(NewUserReply::from_reply(reply)?)
    }
}
