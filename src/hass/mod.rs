pub mod client;

use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use cleaner_api::config::HassServer;

use crate::error::ApiResult;
use crate::trigger::{EntityPattern, EventDispatcher};

use self::client::{HassClient, HassWs};

/// Feeds Home Assistant `state_changed` events to an [`EventDispatcher`],
/// reconnecting whenever the websocket drops.
pub struct HassWatcher {
    client: HassClient,
    pattern: EntityPattern,
    dispatcher: EventDispatcher,
    ws: Option<HassWs>,
}

impl HassWatcher {
    const RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(client: HassClient, pattern: EntityPattern) -> Self {
        Self {
            client,
            pattern,
            dispatcher: EventDispatcher::new(),
            ws: None,
        }
    }

    pub fn from_config(server: &HassServer) -> ApiResult<Self> {
        Ok(Self::new(
            HassClient::from_env(server)?,
            Self::pattern_for(server),
        ))
    }

    #[must_use]
    pub fn pattern_for(server: &HassServer) -> EntityPattern {
        EntityPattern::new(server.entity_domain(), server.entity_match())
    }

    #[must_use]
    pub const fn pattern(&self) -> &EntityPattern {
        &self.pattern
    }

    pub const fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    /// Entity ids of the companion sensors currently known to Home Assistant
    pub async fn discover_companions(&self) -> ApiResult<Vec<String>> {
        let states = self.client.get_states().await?;
        Ok(states
            .into_iter()
            .map(|st| st.entity_id)
            .filter(|id| self.pattern.matches(id))
            .collect())
    }

    async fn ensure_ws_connected(&mut self) {
        if self.ws.is_some() {
            return;
        }

        match self.client.subscribe_state_changed().await {
            Ok(ws) => {
                log::info!("Subscribed to Home Assistant state changes");
                self.ws = Some(ws);
            }
            Err(err) => {
                log::debug!("Home Assistant websocket connect failed: {err}");
            }
        }
    }

    pub async fn run(mut self, token: CancellationToken) {
        if self.dispatcher.is_empty() {
            log::warn!("Home Assistant watcher has no subscribers");
        }

        self.ensure_ws_connected().await;

        let mut ws_tick = interval(Self::RECONNECT_INTERVAL);
        ws_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if let Some(ws) = &mut self.ws {
                tokio::select! {
                    () = token.cancelled() => break,
                    ev = ws.next_state_changed() => {
                        match ev {
                            Ok(Some(change)) => {
                                self.dispatcher.dispatch(&change);
                            }
                            Ok(None) => {
                                log::warn!("Home Assistant websocket closed, reconnecting");
                                self.ws = None;
                            }
                            Err(err) => {
                                log::warn!("Home Assistant websocket error: {err}");
                                self.ws = None;
                            }
                        }
                    }
                }
            } else {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ws_tick.tick() => {
                        self.ensure_ws_connected().await;
                    }
                }
            }
        }

        log::debug!("Home Assistant watcher stopped");
    }
}
