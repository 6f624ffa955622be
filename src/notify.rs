use async_trait::async_trait;

use cleaner_api::issue::{Notification, RepairIssue, RepairKind};

use crate::error::ApiResult;

/// Where user-visible notifications and repair requests end up.
///
/// Creating is idempotent: a notification with an existing id, or an issue
/// with an existing `(kind, host)`, replaces the previous one.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> ApiResult<()>;

    async fn create_issue(&self, issue: RepairIssue) -> ApiResult<()>;

    /// Returns `false` if no such issue existed
    async fn clear_issue(&self, kind: RepairKind, host: &str) -> ApiResult<bool>;

    /// Returns `false` if no notification with this id existed
    async fn dismiss_notification(&self, id: &str) -> ApiResult<bool>;
}
