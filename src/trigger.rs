use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::coordinator::Coordinator;

/// Matches entity ids like `binary_sensor.living_room_entertainment`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityPattern {
    pub domain: String,
    pub contains: String,
}

impl EntityPattern {
    #[must_use]
    pub fn new(domain: impl Into<String>, contains: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            contains: contains.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, entity_id: &str) -> bool {
        entity_id
            .split_once('.')
            .is_some_and(|(domain, object_id)| {
                domain == self.domain && object_id.contains(&self.contains)
            })
    }
}

/// A single `state_changed` event, reduced to the state values
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateChange {
    pub entity_id: String,
    pub old_state: Option<String>,
    pub new_state: Option<String>,
}

impl StateChange {
    /// True for an entity that appeared in the "on" state, which is how the
    /// companion sensor reports a freshly started entertainment session.
    #[must_use]
    pub fn is_area_activation(&self) -> bool {
        self.old_state.is_none() && self.new_state.as_deref() == Some("on")
    }
}

type Handler = Box<dyn Fn(&StateChange) + Send + Sync>;

/// Routes state changes to handlers subscribed by entity pattern.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<(EntityPattern, Handler)>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        pattern: EntityPattern,
        handler: impl Fn(&StateChange) + Send + Sync + 'static,
    ) {
        self.handlers.push((pattern, Box::new(handler)));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Call each handler whose pattern matches. Returns how many ran.
    pub fn dispatch(&self, change: &StateChange) -> usize {
        let mut count = 0;
        for (pattern, handler) in &self.handlers {
            if pattern.matches(&change.entity_id) {
                handler(change);
                count += 1;
            }
        }
        count
    }

    /// Subscribe each coordinator to area activations matching `pattern`.
    /// An activation schedules a refresh after the settle delay.
    pub fn subscribe_activations(&mut self, pattern: &EntityPattern, coords: &[Arc<Coordinator>]) {
        for coord in coords {
            let coord = Arc::clone(coord);
            self.subscribe(pattern.clone(), move |change| {
                if change.is_area_activation() {
                    log::info!(
                        "[{}] {} activated, scheduling cleanup",
                        coord.name(),
                        change.entity_id
                    );
                    coord.schedule_refresh();
                }
            });
        }
    }
}

/// Refresh `coord` every `period`, starting one period from now, until
/// `token` is cancelled.
pub async fn run_periodic(coord: Arc<Coordinator>, period: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!("[{}] Polling every {period:?}", coord.name());

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = interval.tick() => coord.refresh().await,
        }
    }

    log::debug!("[{}] Polling stopped", coord.name());
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use cleaner_api::config::HubServer;
    use cleaner_api::status::CleanerMode;
    use hue::api::EntertainmentStatus;

    use crate::cleaner::tests::{FakeHub, area};
    use crate::coordinator::Coordinator;
    use crate::health::tests::RecordingNotifier;
    use crate::trigger::{EntityPattern, EventDispatcher, StateChange, run_periodic};

    fn change(entity_id: &str, old: Option<&str>, new: Option<&str>) -> StateChange {
        StateChange {
            entity_id: entity_id.to_string(),
            old_state: old.map(ToString::to_string),
            new_state: new.map(ToString::to_string),
        }
    }

    fn coordinator(hub: &FakeHub) -> Arc<Coordinator> {
        let mut conf = HubServer::new("fake-hub", "key");
        conf.pacing_ms = Some(0);
        conf.scan_interval_secs = std::num::NonZeroU32::new(60);
        Arc::new(Coordinator::new(
            "living",
            Box::new(hub.clone()),
            &conf,
            CleanerMode::Polling,
            Arc::new(RecordingNotifier::default()),
        ))
    }

    #[test]
    fn pattern_matches_domain_and_substring() {
        let pattern = EntityPattern::new("binary_sensor", "entertainment");

        assert!(pattern.matches("binary_sensor.living_room_entertainment"));
        assert!(pattern.matches("binary_sensor.entertainment_area_1"));
        assert!(!pattern.matches("sensor.living_room_entertainment"));
        assert!(!pattern.matches("binary_sensor.motion"));
        assert!(!pattern.matches("entertainment"));
    }

    #[test]
    fn activation_requires_absent_old_state() {
        assert!(change("x", None, Some("on")).is_area_activation());
        assert!(!change("x", Some("off"), Some("on")).is_area_activation());
        assert!(!change("x", None, Some("off")).is_area_activation());
        assert!(!change("x", None, Some("On")).is_area_activation());
        assert!(!change("x", None, None).is_area_activation());
    }

    #[test]
    fn dispatch_only_to_matching_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = EventDispatcher::new();

        let counter = hits.clone();
        dispatcher.subscribe(EntityPattern::new("binary_sensor", "entertainment"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(
            dispatcher.dispatch(&change("binary_sensor.tv_entertainment", None, Some("on"))),
            1
        );
        assert_eq!(
            dispatcher.dispatch(&change("light.kitchen", None, Some("on"))),
            0
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activation_schedules_refresh() {
        let hub = FakeHub::with_areas(vec![area(
            "1",
            "Entertainment area 1",
            EntertainmentStatus::Inactive,
        )]);
        let coord = coordinator(&hub);
        let pattern = EntityPattern::new("binary_sensor", "entertainment");
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe_activations(&pattern, &[coord]);

        // not an activation
        dispatcher.dispatch(&change("binary_sensor.tv_entertainment", Some("off"), Some("on")));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(hub.deleted().await.is_empty());

        dispatcher.dispatch(&change("binary_sensor.tv_entertainment", None, Some("on")));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hub.deleted().await, ["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_until_cancelled() {
        let hub = FakeHub::default();
        let coord = coordinator(&hub);
        let token = CancellationToken::new();

        let task = tokio::spawn(run_periodic(
            coord.clone(),
            coord.scan_interval(),
            token.clone(),
        ));

        // no pass before the first period has elapsed
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(hub.0.lock().await.list_calls, 0);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(hub.0.lock().await.list_calls, 2);

        token.cancel();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(hub.0.lock().await.list_calls, 2);
    }
}
