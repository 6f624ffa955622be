use std::time::Duration;

use chrono::{DateTime, Utc};

use hue::api::EntertainmentConfiguration;

use crate::error::ApiResult;
use crate::hub::EntertainmentApi;

/// Result of a single reconciliation pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// Number of areas selected for deletion
    pub matched: usize,
    /// Number of areas the hub confirmed as deleted
    pub cleaned: u32,
    pub finished: DateTime<Utc>,
}

impl PassReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.matched.saturating_sub(self.cleaned as usize)
    }
}

/// Select the areas a pass should delete.
///
/// Areas qualify when their name contains `marker`. Unless `include_active`
/// is set, they must also be inactive. Hub order is preserved.
#[must_use]
pub fn select_stale<'a>(
    areas: &'a [EntertainmentConfiguration],
    marker: &str,
    include_active: bool,
) -> Vec<&'a EntertainmentConfiguration> {
    areas
        .iter()
        .filter(|area| area.name().contains(marker))
        .filter(|area| include_active || area.is_inactive())
        .collect()
}

/// Fetch, filter and delete stale entertainment areas on one hub.
pub struct Cleaner {
    api: Box<dyn EntertainmentApi>,
    marker: String,
    pacing: Duration,
    cleaned_count: u64,
    last_clean: Option<DateTime<Utc>>,
}

impl Cleaner {
    #[must_use]
    pub fn new(api: Box<dyn EntertainmentApi>, marker: impl Into<String>, pacing: Duration) -> Self {
        Self {
            api,
            marker: marker.into(),
            pacing,
            cleaned_count: 0,
            last_clean: None,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        self.api.host()
    }

    /// Total number of areas deleted over the lifetime of this cleaner
    #[must_use]
    pub const fn cleaned_count(&self) -> u64 {
        self.cleaned_count
    }

    #[must_use]
    pub const fn last_clean(&self) -> Option<DateTime<Utc>> {
        self.last_clean
    }

    /// Run one reconciliation pass.
    ///
    /// Fails only when the area list cannot be fetched. Failed deletes are
    /// logged and counted, but never abort the pass or get retried.
    pub async fn run(&mut self, include_active: bool) -> ApiResult<PassReport> {
        let areas = self.api.list_areas().await?;
        let stale = select_stale(&areas, &self.marker, include_active);

        log::debug!(
            "[{}] {} of {} entertainment areas match {:?}{}",
            self.host(),
            stale.len(),
            areas.len(),
            self.marker,
            if include_active { " (including active)" } else { "" }
        );

        let mut cleaned = 0;
        for (index, area) in stale.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            if self.api.delete_area(&area.id).await {
                cleaned += 1;
            }
        }

        let report = PassReport {
            matched: stale.len(),
            cleaned,
            finished: Utc::now(),
        };

        self.cleaned_count += u64::from(cleaned);
        if report.matched > 0 {
            self.last_clean = Some(report.finished);
            log::info!(
                "[{}] Cleaned {cleaned} of {} entertainment areas",
                self.host(),
                report.matched
            );
        }
        if report.failed() > 0 {
            log::warn!(
                "[{}] {} entertainment areas could not be deleted",
                self.host(),
                report.failed()
            );
        }

        Ok(report)
    }
}
