use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use url::Url;

use cleaner_api::config::HassServer;

use crate::error::{ApiError, ApiResult};
use crate::trigger::StateChange;

#[derive(Clone, Debug, Deserialize)]
pub struct HassState {
    pub entity_id: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct HassWsEventEnvelope {
    #[serde(default)]
    pub event_type: String,
    pub data: HassWsEventData,
}

#[derive(Debug, Deserialize)]
struct HassWsEventData {
    pub entity_id: String,
    pub new_state: Option<HassState>,
    pub old_state: Option<HassState>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum HassWsIncoming {
    #[serde(rename = "auth_required")]
    AuthRequired,
    #[serde(rename = "auth_ok")]
    AuthOk,
    #[serde(rename = "auth_invalid")]
    AuthInvalid,
    #[serde(rename = "result")]
    Result {
        id: u64,
        success: bool,
        #[serde(default)]
        error: Option<Value>,
    },
    #[serde(rename = "event")]
    Event { event: HassWsEventEnvelope },
    #[serde(other)]
    Other,
}

/// Authenticated websocket, subscribed to `state_changed` events
pub struct HassWs {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl HassWs {
    async fn recv_json(&mut self) -> ApiResult<Option<HassWsIncoming>> {
        let Some(msg) = self.socket.next().await else {
            return Ok(None);
        };
        let Message::Text(text) = msg? else {
            return Ok(Some(HassWsIncoming::Other));
        };
        Ok(Some(serde_json::from_str::<HassWsIncoming>(&text)?))
    }

    /// Wait for the next state change. Returns `None` when the socket closes.
    pub async fn next_state_changed(&mut self) -> ApiResult<Option<StateChange>> {
        while let Some(msg) = self.recv_json().await? {
            if let HassWsIncoming::Event { event } = msg {
                if event.event_type == "state_changed" {
                    return Ok(Some(StateChange {
                        entity_id: event.data.entity_id,
                        old_state: event.data.old_state.map(|st| st.state),
                        new_state: event.data.new_state.map(|st| st.state),
                    }));
                }
            }
        }
        Ok(None)
    }
}

pub struct HassClient {
    base_url: Url,
    http: reqwest::Client,
    token: String,
}

impl HassClient {
    const DEFAULT_TIMEOUT_SECS: u64 = 10;
    const SUBSCRIBE_ID: u64 = 1;

    pub fn new(base_url: Url, token: impl Into<String>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url,
            http,
            token: token.into(),
        })
    }

    /// Build a client for `server`, reading the access token from the
    /// environment variable it names.
    pub fn from_env(server: &HassServer) -> ApiResult<Self> {
        let token_env = server.token_env();
        let token = std::env::var(token_env).map_err(|_| {
            ApiError::service_error(format!(
                "Missing Home Assistant token env var {token_env}"
            ))
        })?;
        if token.trim().is_empty() {
            return Err(ApiError::service_error(format!(
                "Empty Home Assistant token in env var {token_env}"
            )));
        }
        Self::new(server.url.clone(), token.trim())
    }

    fn endpoint_url(&self, endpoint: &str) -> ApiResult<Url> {
        let base = if self.base_url.path().ends_with('/') {
            self.base_url.clone()
        } else {
            Url::parse(&format!("{}/", self.base_url))?
        };
        Ok(base.join(endpoint.trim_start_matches('/'))?)
    }

    fn ws_endpoint_url(&self) -> ApiResult<Url> {
        let mut url = self.endpoint_url("/api/websocket")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|()| {
            ApiError::service_error("Failed to convert Home Assistant url scheme for websocket")
        })?;
        Ok(url)
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        action: &str,
    ) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let err = if status == StatusCode::UNAUTHORIZED {
            format!("Home Assistant unauthorized during {action}. Verify the access token")
        } else if body.is_empty() {
            format!("Home Assistant error during {action}: {status}")
        } else {
            format!("Home Assistant error during {action}: {status}: {body}")
        };

        Err(ApiError::service_error(err))
    }

    pub async fn get_states(&self) -> ApiResult<Vec<HassState>> {
        let url = self.endpoint_url("/api/states")?;
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let response = self.check_status(response, "GET /api/states").await?;
        Ok(response.json().await?)
    }

    pub async fn subscribe_state_changed(&self) -> ApiResult<HassWs> {
        let ws_url = self.ws_endpoint_url()?;
        let (mut socket, _response) = connect_async(ws_url.as_str()).await?;

        // consume auth challenge
        let _ = socket.next().await;

        let auth = serde_json::json!({
            "type": "auth",
            "access_token": self.token,
        });
        socket.send(Message::Text(auth.to_string().into())).await?;

        loop {
            let Some(msg) = socket.next().await else {
                return Err(ApiError::service_error(
                    "Home Assistant websocket closed during auth",
                ));
            };
            if let Message::Text(text) = msg? {
                match serde_json::from_str(&text)? {
                    HassWsIncoming::AuthOk => break,
                    HassWsIncoming::AuthInvalid => {
                        return Err(ApiError::service_error(
                            "Home Assistant websocket auth failed (check token)",
                        ));
                    }
                    _ => {}
                }
            }
        }

        let sub = serde_json::json!({
            "id": Self::SUBSCRIBE_ID,
            "type": "subscribe_events",
            "event_type": "state_changed",
        });
        socket.send(Message::Text(sub.to_string().into())).await?;

        loop {
            let Some(msg) = socket.next().await else {
                return Err(ApiError::service_error(
                    "Home Assistant websocket closed during subscribe",
                ));
            };
            if let Message::Text(text) = msg? {
                if let HassWsIncoming::Result { id, success, error } = serde_json::from_str(&text)? {
                    if id != Self::SUBSCRIBE_ID {
                        continue;
                    }
                    if success {
                        break;
                    }
                    return Err(ApiError::service_error(format!(
                        "Home Assistant subscribe_events failed: {}",
                        error.unwrap_or(Value::Null)
                    )));
                }
            }
        }

        Ok(HassWs { socket })
    }
}
