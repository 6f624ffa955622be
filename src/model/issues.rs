use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use cleaner_api::issue::{IssuesReply, Notification, RepairIssue, RepairKind};

use crate::error::ApiResult;
use crate::notify::Notifier;

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
struct IssueFile {
    #[serde(default)]
    issues: BTreeMap<String, RepairIssue>,
    #[serde(default)]
    notifications: BTreeMap<String, Notification>,
}

/// Outstanding repair requests and notifications, optionally persisted as
/// yaml so they survive a restart.
#[derive(Debug)]
pub struct IssueStore {
    file: Option<Utf8PathBuf>,
    state: IssueFile,
}

impl IssueStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            file: None,
            state: IssueFile::default(),
        }
    }

    pub fn load(file: Utf8PathBuf) -> Self {
        let state = if file.is_file() {
            match File::open(&file).and_then(|fd| {
                serde_yml::from_reader::<_, IssueFile>(fd).map_err(std::io::Error::other)
            }) {
                Ok(state) => state,
                Err(err) => {
                    log::warn!("Failed to parse {file}, starting without issues: {err}");
                    IssueFile::default()
                }
            }
        } else {
            IssueFile::default()
        };

        if !state.issues.is_empty() {
            log::info!("Loaded {} outstanding repair requests from {file}", state.issues.len());
        }

        Self {
            file: Some(file),
            state,
        }
    }

    pub fn save(&self) -> ApiResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let fd = File::create(file)?;
        serde_yml::to_writer(fd, &self.state)?;
        Ok(())
    }

    pub fn notify(&mut self, notification: Notification) -> ApiResult<()> {
        log::warn!("{}: {}", notification.title, notification.message);
        self.state
            .notifications
            .insert(notification.id.clone(), notification);
        self.save()
    }

    pub fn create_issue(&mut self, issue: RepairIssue) -> ApiResult<()> {
        self.state.issues.insert(issue.key(), issue);
        self.save()
    }

    pub fn clear_issue(&mut self, kind: RepairKind, host: &str) -> ApiResult<bool> {
        if self.state.issues.remove(&kind.issue_key(host)).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn dismiss_notification(&mut self, id: &str) -> ApiResult<bool> {
        if self.state.notifications.remove(id).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    #[must_use]
    pub fn issue(&self, kind: RepairKind, host: &str) -> Option<&RepairIssue> {
        self.state.issues.get(&kind.issue_key(host))
    }

    #[must_use]
    pub fn reply(&self) -> IssuesReply {
        IssuesReply {
            issues: self.state.issues.values().cloned().collect(),
            notifications: self.state.notifications.values().cloned().collect(),
        }
    }
}

/// Shared handle to an [`IssueStore`]
#[derive(Clone, Debug)]
pub struct IssueBoard(Arc<Mutex<IssueStore>>);

impl IssueBoard {
    #[must_use]
    pub fn new(store: IssueStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub async fn reply(&self) -> IssuesReply {
        self.0.lock().await.reply()
    }
}

#[async_trait]
impl Notifier for IssueBoard {
    async fn notify(&self, notification: Notification) -> ApiResult<()> {
        self.0.lock().await.notify(notification)
    }

    async fn create_issue(&self, issue: RepairIssue) -> ApiResult<()> {
        self.0.lock().await.create_issue(issue)
    }

    async fn clear_issue(&self, kind: RepairKind, host: &str) -> ApiResult<bool> {
        self.0.lock().await.clear_issue(kind, host)
    }

    async fn dismiss_notification(&self, id: &str) -> ApiResult<bool> {
        self.0.lock().await.dismiss_notification(id)
    }
}
