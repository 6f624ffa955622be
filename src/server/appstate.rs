use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use cleaner_api::status::{CleanReply, CleanerMode, StatusSnapshot};

use crate::config::AppConfig;
use crate::coordinator::Coordinator;
use crate::error::{ApiError, ApiResult};
use crate::model::issues::{IssueBoard, IssueStore};

#[derive(Clone)]
pub struct AppState {
    conf: Arc<AppConfig>,
    coordinators: Arc<BTreeMap<String, Arc<Coordinator>>>,
    issues: IssueBoard,
}

impl AppState {
    #[must_use]
    pub fn new(
        conf: AppConfig,
        coordinators: BTreeMap<String, Arc<Coordinator>>,
        issues: IssueBoard,
    ) -> Self {
        Self {
            conf: Arc::new(conf),
            coordinators: Arc::new(coordinators),
            issues,
        }
    }

    /// Load the issue board, and build one coordinator per configured hub
    pub fn from_config(config: AppConfig, mode: CleanerMode) -> ApiResult<Self> {
        let issues = IssueBoard::new(IssueStore::load(config.cleaner.issues_file.clone()));

        let mut coordinators = BTreeMap::new();
        for (name, hub) in &config.hubs {
            let coord = Coordinator::from_config(name, hub, mode, Arc::new(issues.clone()))?;
            log::info!("[{name}] Watching hub {}", coord.host());
            coordinators.insert(name.clone(), Arc::new(coord));
        }

        Ok(Self::new(config, coordinators, issues))
    }

    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        self.conf.clone()
    }

    #[must_use]
    pub fn issues(&self) -> &IssueBoard {
        &self.issues
    }

    pub fn coordinators(&self) -> impl Iterator<Item = &Arc<Coordinator>> {
        self.coordinators.values()
    }

    pub fn get(&self, name: &str) -> ApiResult<Arc<Coordinator>> {
        self.coordinators
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::UnknownHub(name.to_string()))
    }

    pub async fn snapshots(&self) -> Vec<StatusSnapshot> {
        join_all(self.coordinators().map(|coord| coord.snapshot())).await
    }

    /// Run a manual pass on every hub at once, collecting per-hub outcomes
    pub async fn clean_everywhere(&self, include_active: bool) -> Vec<CleanReply> {
        join_all(self.coordinators().map(|coord| async move {
            let res = coord.manual_clean(include_active).await;
            clean_reply(coord.name(), res)
        }))
        .await
    }
}

#[must_use]
pub fn clean_reply(name: &str, res: ApiResult<u32>) -> CleanReply {
    match res {
        Ok(cleaned) => CleanReply {
            name: name.to_string(),
            cleaned: Some(cleaned),
            error: None,
        },
        Err(err) => CleanReply {
            name: name.to_string(),
            cleaned: None,
            error: Some(err.chain_message()),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use cleaner_api::config::{AppConfig, CleanerConfig, HubServer};
    use cleaner_api::status::CleanerMode;
    use hue::api::EntertainmentStatus;

    use crate::cleaner::tests::{FakeHub, area};
    use crate::coordinator::Coordinator;
    use crate::error::ApiError;
    use crate::model::issues::{IssueBoard, IssueStore};
    use crate::server::appstate::AppState;

    /// App state with two fake hubs: "good" holds one stale area, "bad"
    /// fails every request.
    pub async fn fake_state() -> (AppState, FakeHub, FakeHub) {
        let good = FakeHub::with_areas(vec![
            area("1", "Entertainment area 1", EntertainmentStatus::Inactive),
            area("2", "Entertainment area 2", EntertainmentStatus::Active),
        ]);
        let bad = FakeHub::default();
        bad.fail_with(Some("Cannot reach hub: Connection refused")).await;

        let issues = IssueBoard::new(IssueStore::in_memory());
        let mut conf = HubServer::new("fake-hub", "key");
        conf.pacing_ms = Some(0);

        let mut coordinators = BTreeMap::new();
        for (name, hub) in [("bad", &bad), ("good", &good)] {
            let coord = Coordinator::new(
                name,
                Box::new(hub.clone()),
                &conf,
                CleanerMode::Polling,
                Arc::new(issues.clone()),
            );
            coordinators.insert(name.to_string(), Arc::new(coord));
        }

        let app_conf = AppConfig {
            cleaner: CleanerConfig {
                listen: SocketAddr::from(([127, 0, 0, 1], 0)),
                issues_file: "issues.yaml".into(),
            },
            hubs: BTreeMap::from([("good".to_string(), conf.clone()), ("bad".to_string(), conf)]),
            hass: None,
        };

        (AppState::new(app_conf, coordinators, issues), good, bad)
    }

    #[tokio::test]
    async fn unknown_hub() {
        let (state, _, _) = fake_state().await;
        assert!(matches!(state.get("nope"), Err(ApiError::UnknownHub(name)) if name == "nope"));
        assert!(state.get("good").is_ok());
    }

    #[tokio::test]
    async fn clean_everywhere_reports_per_hub() {
        let (state, good, _) = fake_state().await;

        let replies = state.clean_everywhere(false).await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].name, "bad");
        assert!(replies[0].cleaned.is_none());
        assert!(replies[0].error.as_ref().unwrap().contains("Connection refused"));
        assert_eq!(replies[1].name, "good");
        assert_eq!(replies[1].cleaned, Some(1));
        assert_eq!(good.deleted().await, ["1"]);
    }

    #[tokio::test]
    async fn clean_everywhere_including_active() {
        let (state, good, _) = fake_state().await;

        let replies = state.clean_everywhere(true).await;

        assert_eq!(replies[1].cleaned, Some(2));
        assert_eq!(good.deleted().await, ["1", "2"]);
    }
}
