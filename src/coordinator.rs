use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use cleaner_api::config::HubServer;
use cleaner_api::status::{CleanerMode, CleanerStatus, StatusSnapshot};

use crate::cleaner::{Cleaner, PassReport};
use crate::error::ApiResult;
use crate::health::HealthMonitor;
use crate::hub::{EntertainmentApi, HubClient};
use crate::notify::Notifier;

struct Pass {
    cleaner: Cleaner,
    health: HealthMonitor,
}

/// Owns everything for a single configured hub: the cleaner, its health
/// monitor, and the status snapshot served over http.
///
/// Passes are serialized: a trigger arriving while a pass is running waits
/// for it to finish, then runs its own.
pub struct Coordinator {
    name: String,
    host: String,
    settle_delay: Duration,
    scan_interval: Duration,
    pass: Mutex<Pass>,
    status: Mutex<StatusSnapshot>,
    notifier: Arc<dyn Notifier>,
}

impl Coordinator {
    pub fn new(
        name: impl Into<String>,
        api: Box<dyn EntertainmentApi>,
        conf: &HubServer,
        mode: CleanerMode,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let name = name.into();
        let host = api.host().to_string();

        Self {
            status: Mutex::new(StatusSnapshot::new(&name, &host, mode)),
            pass: Mutex::new(Pass {
                cleaner: Cleaner::new(api, conf.marker(), conf.pacing()),
                health: HealthMonitor::new(&host, conf.failure_threshold()),
            }),
            settle_delay: conf.settle_delay(),
            scan_interval: conf.scan_interval(),
            name,
            host,
            notifier,
        }
    }

    /// Build a coordinator talking to the hub described by `conf`
    pub fn from_config(
        name: &str,
        conf: &HubServer,
        mode: CleanerMode,
        notifier: Arc<dyn Notifier>,
    ) -> ApiResult<Self> {
        let mut client = HubClient::new(&conf.host)?;
        match conf.api_key() {
            Some(key) => client = client.with_api_key(key),
            None => log::warn!("[{name}] No application key configured for hub {}", conf.host),
        }

        Ok(Self::new(name, Box::new(client), conf, mode, notifier))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.status.lock().await.clone()
    }

    /// Run one pass, feed the outcome to the health monitor, and publish
    /// the result to the status snapshot.
    pub async fn run_pass(&self, include_active: bool) -> ApiResult<PassReport> {
        let mut pass = self.pass.lock().await;
        let Pass { cleaner, health } = &mut *pass;

        let result = cleaner.run(include_active).await;

        match &result {
            Ok(report) => {
                health.record_success(self.notifier.as_ref()).await;

                let mut status = self.status.lock().await;
                status.cleaned_count = cleaner.cleaned_count();
                status.last_clean = cleaner.last_clean();
                status.areas_cleaned_this_run = report.cleaned;
                status.status = CleanerStatus::Active;
                status.consecutive_failures = 0;
                status.last_error = None;
            }
            Err(err) => {
                let message = err.chain_message();
                log::error!("[{}] Cleaning pass failed: {message}", self.name);
                health.record_failure(&message, self.notifier.as_ref()).await;

                let mut status = self.status.lock().await;
                status.areas_cleaned_this_run = 0;
                status.status = CleanerStatus::Error;
                status.consecutive_failures = health.consecutive_failures();
                status.last_error = Some(message);
            }
        }
        drop(pass);

        result
    }

    /// Regular pass: only inactive areas are deleted. Failures are recorded,
    /// never propagated.
    pub async fn refresh(&self) {
        log::debug!("[{}] Refreshing", self.name);
        let _ = self.run_pass(false).await;
    }

    /// User-requested pass. Returns the number of areas deleted.
    pub async fn manual_clean(&self, include_active: bool) -> ApiResult<u32> {
        log::info!(
            "[{}] Manual clean requested{}",
            self.name,
            if include_active { " (including active areas)" } else { "" }
        );
        Ok(self.run_pass(include_active).await?.cleaned)
    }

    /// Wait for the settle delay, then refresh. Used when an area has just
    /// been activated, so the hub has time to report it as inactive again.
    pub fn schedule_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            log::debug!(
                "[{}] Refresh scheduled in {:?}",
                this.name,
                this.settle_delay
            );
            tokio::time::sleep(this.settle_delay).await;
            this.refresh().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cleaner_api::config::HubServer;
    use cleaner_api::issue::RepairKind;
    use cleaner_api::status::{CleanerMode, CleanerStatus};
    use hue::api::EntertainmentStatus;

    use crate::cleaner::tests::{FakeHub, area};
    use crate::coordinator::Coordinator;
    use crate::health::tests::RecordingNotifier;

    fn hub_conf() -> HubServer {
        let mut conf = HubServer::new("fake-hub", "key");
        conf.pacing_ms = Some(0);
        conf
    }

    fn coordinator(hub: &FakeHub, notifier: &Arc<RecordingNotifier>) -> Arc<Coordinator> {
        Arc::new(Coordinator::new(
            "living",
            Box::new(hub.clone()),
            &hub_conf(),
            CleanerMode::Polling,
            notifier.clone(),
        ))
    }

    #[tokio::test]
    async fn successful_pass_updates_snapshot() {
        let hub = FakeHub::with_areas(vec![
            area("1", "Entertainment area 1", EntertainmentStatus::Inactive),
            area("2", "Entertainment area 2", EntertainmentStatus::Active),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        coord.refresh().await;

        let snap = coord.snapshot().await;
        assert_eq!(snap.name, "living");
        assert_eq!(snap.host, "fake-hub");
        assert_eq!(snap.cleaned_count, 1);
        assert_eq!(snap.areas_cleaned_this_run, 1);
        assert_eq!(snap.status, CleanerStatus::Active);
        assert!(snap.last_clean.is_some());
        assert_eq!(hub.deleted().await, ["1"]);
    }

    #[tokio::test]
    async fn manual_clean_can_include_active() {
        let hub = FakeHub::with_areas(vec![
            area("1", "Entertainment area 1", EntertainmentStatus::Inactive),
            area("2", "Entertainment area 2", EntertainmentStatus::Active),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        assert_eq!(coord.manual_clean(true).await.unwrap(), 2);
        assert_eq!(coord.snapshot().await.cleaned_count, 2);
    }

    #[tokio::test]
    async fn repeated_timeouts_escalate() {
        let hub = FakeHub::default();
        hub.fail_with(Some("Cannot reach hub fake-hub: operation timed out"))
            .await;
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        coord.refresh().await;
        coord.refresh().await;
        let snap = coord.snapshot().await;
        assert_eq!(snap.status, CleanerStatus::Error);
        assert_eq!(snap.consecutive_failures, 2);
        assert!(snap.last_error.unwrap().contains("timed out"));
        assert!(notifier.created.lock().await.is_empty());

        coord.refresh().await;
        let created = notifier.created.lock().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind, RepairKind::GenericConnectionError);
        assert_eq!(created[0].host, "fake-hub");
        assert_eq!(notifier.notifications.lock().await.len(), 1);
        assert_eq!(coord.snapshot().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn recovery_clears_repair_request() {
        let hub = FakeHub::default();
        hub.fail_with(Some("Connection refused")).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        for _ in 0..3 {
            coord.refresh().await;
        }
        assert_eq!(notifier.issues.lock().await.len(), 1);

        hub.fail_with(None).await;
        coord.refresh().await;

        assert!(notifier.issues.lock().await.is_empty());
        assert!(notifier.notifications.lock().await.is_empty());
        let snap = coord.snapshot().await;
        assert_eq!(snap.status, CleanerStatus::Active);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn manual_clean_failure_is_reported() {
        let hub = FakeHub::default();
        hub.fail_with(Some("operation timed out")).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        assert!(coord.manual_clean(false).await.is_err());
        assert_eq!(coord.snapshot().await.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn concurrent_passes_are_serialized() {
        let hub = FakeHub::with_areas(vec![area(
            "1",
            "Entertainment area 1",
            EntertainmentStatus::Inactive,
        )]);
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        let (a, b) = tokio::join!(coord.manual_clean(false), coord.manual_clean(false));

        // one pass deleted the area, the other found nothing left
        assert_eq!(a.unwrap() + b.unwrap(), 1);
        assert_eq!(hub.0.lock().await.list_calls, 2);
        assert_eq!(hub.deleted().await, ["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_refresh_waits_for_settle_delay() {
        let hub = FakeHub::with_areas(vec![area(
            "1",
            "Entertainment area 1",
            EntertainmentStatus::Inactive,
        )]);
        let notifier = Arc::new(RecordingNotifier::default());
        let coord = coordinator(&hub, &notifier);

        let handle = coord.schedule_refresh();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(hub.deleted().await.is_empty());

        handle.await.unwrap();
        assert_eq!(hub.deleted().await, ["1"]);
    }
}
