use cleaner_api::issue::{Notification, RepairIssue, RepairKind};

use crate::notify::Notifier;

/// Counts consecutive failed passes against one hub, and escalates to a
/// notification plus a repair request once `threshold` is reached.
#[derive(Debug)]
pub struct HealthMonitor {
    host: String,
    threshold: u32,
    consecutive_failures: u32,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(host: impl Into<String>, threshold: u32) -> Self {
        Self {
            host: host.into(),
            threshold: threshold.max(1),
            consecutive_failures: 0,
        }
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a failed pass. Returns the kind of repair request raised, if
    /// this failure reached the threshold.
    ///
    /// The notification and repair request are sent before the counter is
    /// reset, so the escalation can fire again after another `threshold`
    /// failures in a row.
    pub async fn record_failure(
        &mut self,
        message: &str,
        notifier: &dyn Notifier,
    ) -> Option<RepairKind> {
        self.consecutive_failures += 1;
        let kind = RepairKind::classify(message);

        log::warn!(
            "[{}] Connection problem {}/{} ({kind}): {message}",
            self.host,
            self.consecutive_failures,
            self.threshold,
        );

        if self.consecutive_failures < self.threshold {
            return None;
        }

        self.escalate(kind, message, notifier).await;
        self.consecutive_failures = 0;
        Some(kind)
    }

    async fn escalate(&self, kind: RepairKind, message: &str, notifier: &dyn Notifier) {
        log::error!(
            "[{}] {} consecutive failures, raising {kind} repair request",
            self.host,
            self.consecutive_failures
        );

        let notification = Notification::new(
            kind.notification_key(&self.host),
            kind.title(),
            kind.describe(&self.host, message),
        );
        if let Err(err) = notifier.notify(notification).await {
            log::error!("[{}] Failed to create notification: {err}", self.host);
        }

        let issue = RepairIssue::new(kind, &self.host, message);
        if let Err(err) = notifier.create_issue(issue).await {
            log::error!("[{}] Failed to create repair request: {err}", self.host);
        }
    }

    /// Record a successful pass: reset the failure count, and clear any
    /// outstanding repair request or notification for this host.
    pub async fn record_success(&mut self, notifier: &dyn Notifier) {
        if self.consecutive_failures > 0 {
            log::info!(
                "[{}] Connection restored after {} failures",
                self.host,
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;

        for kind in RepairKind::ALL {
            match notifier.clear_issue(kind, &self.host).await {
                Ok(true) => log::info!("[{}] Cleared {kind} repair request", self.host),
                Ok(false) => {}
                Err(err) => log::warn!(
                    "[{}] Failed to clear {kind} repair request: {err}",
                    self.host
                ),
            }

            let id = kind.notification_key(&self.host);
            if let Err(err) = notifier.dismiss_notification(&id).await {
                log::warn!("[{}] Failed to dismiss notification {id}: {err}", self.host);
            }
        }
    }
}
