//! Auto-dismissing notifications.
//!
//! Each notification element gets a [`NotificationLifecycle`] with three entry
//! points (mounted, updated, destroyed) and at most one pending countdown. When
//! the countdown expires the runtime asks the server to clear the
//! notification, provided the connection is live and the element is still in
//! the document.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::config::NotificationConfig;
use crate::connection::ConnectionProbe;
use crate::scheduler::{Scheduler, millis};
use crate::teardown::Teardown;

pub trait NotificationElement {
    fn id(&self) -> String;
    fn attribute(&self, name: &str) -> Option<String>;
    fn is_attached(&self) -> bool;
    /// Changes whenever the element's rendered content changes.
    fn fingerprint(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DismissRequest {
    pub element_id: String,
    pub event: String,
    pub key: String,
}

pub type DismissSink = Rc<dyn Fn(DismissRequest)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Created,
    Counting,
    Destroyed,
}

/// Parses a delay attribute the way `parseInt` would: leading digits after
/// optional whitespace, anything non-positive or unparseable uses the default.
pub fn parse_delay(raw: Option<&str>, default_ms: u64) -> Duration {
    let digits: String = raw
        .unwrap_or_default()
        .trim_start()
        .trim_start_matches('+')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    match digits.parse::<u64>() {
        Ok(value) if value > 0 => millis(value),
        _ => millis(default_ms),
    }
}

#[derive(Clone)]
struct LifecycleDeps {
    config: Rc<NotificationConfig>,
    scheduler: Rc<dyn Scheduler>,
    connection: Rc<dyn ConnectionProbe>,
    sink: DismissSink,
}

pub struct NotificationLifecycle {
    element_id: String,
    element: Rc<RefCell<Rc<dyn NotificationElement>>>,
    fingerprint: String,
    deps: LifecycleDeps,
    phase: LifecyclePhase,
    delay: Option<Duration>,
    // Dropping the lifecycle drops this, which cancels the countdown.
    timer: Option<Teardown>,
}

impl NotificationLifecycle {
    fn new(element: Rc<dyn NotificationElement>, deps: LifecycleDeps) -> Self {
        Self {
            element_id: element.id(),
            fingerprint: element.fingerprint(),
            element: Rc::new(RefCell::new(element)),
            deps,
            phase: LifecyclePhase::Created,
            delay: None,
            timer: None,
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn mounted(&mut self) {
        if self.phase == LifecyclePhase::Destroyed {
            return;
        }
        self.start_timer();
    }

    /// Content changed in place: the visible dwell time starts over.
    pub fn updated(&mut self) {
        if self.phase == LifecyclePhase::Destroyed {
            return;
        }
        self.clear_timer();
        self.start_timer();
    }

    pub fn destroyed(&mut self) {
        self.clear_timer();
        self.phase = LifecyclePhase::Destroyed;
    }

    /// Points the lifecycle at a replacement node for the same notification.
    fn rebind(&mut self, element: Rc<dyn NotificationElement>) {
        *self.element.borrow_mut() = element;
    }

    fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.run();
        }
    }

    fn start_timer(&mut self) {
        self.clear_timer();

        let config = self.deps.config.clone();
        let delay = {
            let element = self.element.borrow();
            parse_delay(
                element.attribute(&config.delay_attribute).as_deref(),
                config.default_delay_ms,
            )
        };

        let element = self.element.clone();
        let element_id = self.element_id.clone();
        let connection = self.deps.connection.clone();
        let sink = self.deps.sink.clone();
        let task = Box::new(move || {
            let current = element.borrow().clone();
            if !connection.is_connected() {
                log::debug!("notification {element_id} expired while disconnected");
                return;
            }
            if !current.is_attached() {
                log::debug!("notification {element_id} expired after detaching");
                return;
            }
            let Some(key) = current.attribute(&config.kind_attribute) else {
                log::debug!("notification {element_id} has no kind, not dismissing");
                return;
            };
            sink(DismissRequest {
                element_id,
                event: config.dismiss_event.clone(),
                key,
            });
        });

        self.timer = Some(self.deps.scheduler.timeout(delay, task));
        self.delay = Some(delay);
        self.phase = LifecyclePhase::Counting;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub mounted: usize,
    pub updated: usize,
    pub destroyed: usize,
}

/// Tracks every notification currently in the document by element id.
pub struct NotificationRegistry {
    deps: LifecycleDeps,
    tracked: BTreeMap<String, NotificationLifecycle>,
}

impl NotificationRegistry {
    pub fn new(
        config: NotificationConfig,
        scheduler: Rc<dyn Scheduler>,
        connection: Rc<dyn ConnectionProbe>,
        sink: DismissSink,
    ) -> Self {
        Self {
            deps: LifecycleDeps {
                config: Rc::new(config),
                scheduler,
                connection,
                sink,
            },
            tracked: BTreeMap::new(),
        }
    }

    pub fn mount(&mut self, element: Rc<dyn NotificationElement>) {
        let id = element.id();
        if let Some(mut previous) = self.tracked.remove(&id) {
            previous.destroyed();
        }
        let mut lifecycle = NotificationLifecycle::new(element, self.deps.clone());
        lifecycle.mounted();
        log::debug!("notification {id} mounted");
        self.tracked.insert(id, lifecycle);
    }

    pub fn update(&mut self, id: &str) {
        if let Some(lifecycle) = self.tracked.get_mut(id) {
            lifecycle.updated();
        }
    }

    pub fn destroy(&mut self, id: &str) {
        if let Some(mut lifecycle) = self.tracked.remove(id) {
            lifecycle.destroyed();
            log::debug!("notification {id} destroyed");
        }
    }

    /// Diffs the notifications currently in the document against the tracked
    /// set and drives each lifecycle accordingly.
    pub fn reconcile(&mut self, present: Vec<Rc<dyn NotificationElement>>) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut seen = BTreeSet::new();

        for element in present {
            let id = element.id();
            if id.is_empty() {
                log::debug!("skipping notification without an id");
                continue;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            match self.tracked.get_mut(&id) {
                Some(lifecycle) => {
                    let fingerprint = element.fingerprint();
                    lifecycle.rebind(element);
                    if fingerprint != lifecycle.fingerprint {
                        lifecycle.fingerprint = fingerprint;
                        lifecycle.updated();
                        summary.updated += 1;
                    }
                }
                None => {
                    self.mount(element);
                    summary.mounted += 1;
                }
            }
        }

        let gone: Vec<String> = self
            .tracked
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in gone {
            self.destroy(&id);
            summary.destroyed += 1;
        }

        summary
    }

    pub fn get(&self, id: &str) -> Option<&NotificationLifecycle> {
        self.tracked.get(id)
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        self.tracked.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        for (_, mut lifecycle) in std::mem::take(&mut self.tracked) {
            lifecycle.destroyed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnectionProbe, FakeNotification, ManualScheduler, as_element};

    struct Harness {
        scheduler: Rc<ManualScheduler>,
        connection: Rc<FakeConnectionProbe>,
        dismissed: Rc<RefCell<Vec<DismissRequest>>>,
        registry: NotificationRegistry,
    }

    fn harness() -> Harness {
        let scheduler = Rc::new(ManualScheduler::new());
        let connection = Rc::new(FakeConnectionProbe::new(true));
        let dismissed = Rc::new(RefCell::new(Vec::new()));
        let sink_log = dismissed.clone();
        let registry = NotificationRegistry::new(
            NotificationConfig::default(),
            scheduler.clone(),
            connection.clone(),
            Rc::new(move |request: DismissRequest| sink_log.borrow_mut().push(request)),
        );
        Harness {
            scheduler,
            connection,
            dismissed,
            registry,
        }
    }

    #[test]
    fn parse_delay_follows_leading_integer_rules() {
        assert_eq!(parse_delay(Some("1500"), 5_000), millis(1_500));
        assert_eq!(parse_delay(Some(" 250ms"), 5_000), millis(250));
        assert_eq!(parse_delay(Some("soon"), 5_000), millis(5_000));
        assert_eq!(parse_delay(Some("0"), 5_000), millis(5_000));
        assert_eq!(parse_delay(Some("-20"), 5_000), millis(5_000));
        assert_eq!(parse_delay(None, 5_000), millis(5_000));
    }

    #[test]
    fn dismisses_after_default_delay() {
        let mut h = harness();
        h.registry.mount(FakeNotification::new("flash-info", Some("info"), None));
        h.scheduler.advance(millis(4_999));
        assert!(h.dismissed.borrow().is_empty());
        h.scheduler.advance(millis(1));
        assert_eq!(
            h.dismissed.borrow().as_slice(),
            &[DismissRequest {
                element_id: "flash-info".to_string(),
                event: "lv:clear-flash".to_string(),
                key: "info".to_string(),
            }]
        );
    }

    #[test]
    fn update_resets_countdown() {
        let mut h = harness();
        h.registry
            .mount(FakeNotification::new("flash-error", Some("error"), Some("1000")));
        h.scheduler.advance(millis(600));
        h.registry.update("flash-error");
        h.scheduler.advance(millis(400));
        assert!(h.dismissed.borrow().is_empty(), "original expiry must not fire");
        h.scheduler.advance(millis(600));
        assert_eq!(h.dismissed.borrow().len(), 1);
        assert_eq!(h.scheduler.active_timers(), 0);
    }

    #[test]
    fn at_most_one_pending_timer_per_element() {
        let mut h = harness();
        h.registry.mount(FakeNotification::new("flash-info", Some("info"), None));
        for _ in 0..5 {
            h.registry.update("flash-info");
        }
        assert_eq!(h.scheduler.active_timers(), 1);
        h.scheduler.advance(millis(10_000));
        assert_eq!(h.dismissed.borrow().len(), 1);
    }

    #[test]
    fn destroy_cancels_countdown() {
        let mut h = harness();
        h.registry.mount(FakeNotification::new("flash-info", Some("info"), None));
        h.registry.destroy("flash-info");
        assert_eq!(h.scheduler.active_timers(), 0);
        h.scheduler.advance(millis(10_000));
        assert!(h.dismissed.borrow().is_empty());
        assert!(h.registry.tracked_ids().is_empty());
    }

    #[test]
    fn detached_element_is_never_dismissed() {
        let mut h = harness();
        let element = FakeNotification::new("flash-info", Some("info"), None);
        h.registry.mount(element.clone());
        element.detach();
        h.scheduler.advance(millis(5_000));
        assert!(h.dismissed.borrow().is_empty());
    }

    #[test]
    fn disconnected_expiry_is_suppressed() {
        let mut h = harness();
        h.registry.mount(FakeNotification::new("flash-info", Some("info"), None));
        h.connection.set_connected(false);
        h.scheduler.advance(millis(5_000));
        assert!(h.dismissed.borrow().is_empty());
    }

    #[test]
    fn missing_kind_is_not_dismissed() {
        let mut h = harness();
        h.registry.mount(FakeNotification::new("flash-anon", None, None));
        h.scheduler.advance(millis(5_000));
        assert!(h.dismissed.borrow().is_empty());
    }

    #[test]
    fn reconcile_mounts_updates_and_destroys() {
        let mut h = harness();
        let info = FakeNotification::new("flash-info", Some("info"), Some("2000"));
        let error = FakeNotification::new("flash-error", Some("error"), Some("2000"));

        let summary = h.registry.reconcile(vec![as_element(&info), as_element(&error)]);
        assert_eq!(summary, ReconcileSummary { mounted: 2, updated: 0, destroyed: 0 });

        info.set_content("Saved again");
        let summary = h.registry.reconcile(vec![as_element(&info)]);
        assert_eq!(summary, ReconcileSummary { mounted: 0, updated: 1, destroyed: 1 });
        assert_eq!(h.registry.tracked_ids(), vec!["flash-info".to_string()]);
        assert_eq!(h.scheduler.active_timers(), 1);
    }

    #[test]
    fn replacement_node_with_same_content_keeps_countdown() {
        let mut h = harness();
        let original = FakeNotification::new("flash-info", Some("info"), Some("1000"));
        h.registry.reconcile(vec![as_element(&original)]);
        h.scheduler.advance(millis(700));

        original.detach();
        let replacement = FakeNotification::new("flash-info", Some("info"), Some("1000"));
        let summary = h.registry.reconcile(vec![as_element(&replacement)]);
        assert_eq!(summary, ReconcileSummary::default());

        h.scheduler.advance(millis(300));
        assert_eq!(h.dismissed.borrow().len(), 1, "expiry consults the replacement node");
    }

    #[test]
    fn lifecycle_reports_phase_and_delay() {
        let mut h = harness();
        h.registry
            .mount(FakeNotification::new("flash-info", Some("info"), Some("1200")));
        let lifecycle = h.registry.get("flash-info").expect("tracked");
        assert_eq!(lifecycle.phase(), LifecyclePhase::Counting);
        assert_eq!(lifecycle.delay(), Some(millis(1_200)));
        assert!(lifecycle.has_pending_timer());
        h.registry.clear();
        assert_eq!(h.scheduler.active_timers(), 0);
    }
}
