//! External authorization in a centered popup window.
//!
//! Completion is inferred from the popup closing; the page is then reloaded so
//! the server can report whatever state the external flow left behind.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::config::PopupConfig;
use crate::scheduler::{Scheduler, millis};
use crate::teardown::Teardown;

/// Position and available size of the monitor the invoking window is on.
///
/// Optional fields mirror browser properties that are missing in some engines.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenGeometry {
    pub screen_x: Option<f64>,
    pub screen_left: Option<f64>,
    pub screen_y: Option<f64>,
    pub screen_top: Option<f64>,
    pub avail_width: Option<f64>,
    pub avail_height: Option<f64>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopupPlacement {
    pub left: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
}

impl PopupPlacement {
    pub fn centered(geometry: &ScreenGeometry, width: u32, height: u32) -> Self {
        let origin_x = first_nonzero(&[geometry.screen_x, geometry.screen_left]);
        let origin_y = first_nonzero(&[geometry.screen_y, geometry.screen_top]);
        let avail_width = first_nonzero(&[geometry.avail_width, Some(geometry.width)]);
        let avail_height = first_nonzero(&[geometry.avail_height, Some(geometry.height)]);
        Self {
            left: origin_x + (avail_width - f64::from(width)) / 2.0,
            top: origin_y + (avail_height - f64::from(height)) / 2.0,
            width,
            height,
        }
    }

    /// `window.open` feature string.
    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={},scrollbars=yes,resizable=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

// `a || b || 0`
fn first_nonzero(candidates: &[Option<f64>]) -> f64 {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|value| *value != 0.0 && value.is_finite())
        .unwrap_or(0.0)
}

pub trait PopupWindow {
    fn is_closed(&self) -> bool;
}

pub trait PopupHost {
    fn geometry(&self) -> ScreenGeometry;
    /// `None` when the browser blocked the popup.
    fn open(&self, url: &str, name: &str, features: &str) -> Option<Rc<dyn PopupWindow>>;
    fn navigate(&self, url: &str);
    fn reload(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupOutcome {
    Opened { session_id: u64 },
    Navigated,
}

struct PopupSession {
    window: Rc<dyn PopupWindow>,
    poll: Option<Teardown>,
}

type Sessions = RefCell<BTreeMap<u64, PopupSession>>;

#[derive(Clone)]
pub struct PopupAuthorizationBridge {
    inner: Rc<PopupInner>,
}

struct PopupInner {
    config: PopupConfig,
    host: Rc<dyn PopupHost>,
    scheduler: Rc<dyn Scheduler>,
    sessions: Rc<Sessions>,
    next_session_id: Cell<u64>,
}

impl PopupAuthorizationBridge {
    pub fn new(config: PopupConfig, host: Rc<dyn PopupHost>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(PopupInner {
                config,
                host,
                scheduler,
                sessions: Rc::new(RefCell::new(BTreeMap::new())),
                next_session_id: Cell::new(1),
            }),
        }
    }

    pub fn open(&self, url: &str) -> PopupOutcome {
        let inner = &self.inner;
        let placement = PopupPlacement::centered(
            &inner.host.geometry(),
            inner.config.width,
            inner.config.height,
        );

        let Some(window) = inner
            .host
            .open(url, &inner.config.window_name, &placement.features())
        else {
            log::info!("authorization popup blocked; navigating instead");
            inner.host.navigate(url);
            return PopupOutcome::Navigated;
        };

        let session_id = inner.next_session_id.get();
        inner.next_session_id.set(session_id + 1);
        inner.sessions.borrow_mut().insert(
            session_id,
            PopupSession {
                window,
                poll: None,
            },
        );

        let sessions: Weak<Sessions> = Rc::downgrade(&inner.sessions);
        let host = inner.host.clone();
        let poll = inner.scheduler.interval(
            millis(inner.config.poll_interval_ms),
            Box::new(move || poll_session(&sessions, session_id, host.as_ref())),
        );
        if let Some(session) = inner.sessions.borrow_mut().get_mut(&session_id) {
            session.poll = Some(poll);
        }
        log::debug!("authorization popup {session_id} opened at {placement:?}");
        PopupOutcome::Opened { session_id }
    }

    pub fn open_sessions(&self) -> usize {
        self.inner.sessions.borrow().len()
    }

    /// Stops polling every open popup. The popups themselves stay open.
    pub fn close_all(&self) {
        let sessions = std::mem::take(&mut *self.inner.sessions.borrow_mut());
        for (session_id, session) in sessions {
            if let Some(poll) = session.poll {
                poll.run();
            }
            log::debug!("authorization popup {session_id} no longer tracked");
        }
    }
}

fn poll_session(sessions: &Weak<Sessions>, session_id: u64, host: &dyn PopupHost) {
    let Some(sessions) = sessions.upgrade() else {
        return;
    };
    let closed = sessions
        .borrow()
        .get(&session_id)
        .is_some_and(|session| session.window.is_closed());
    if !closed {
        return;
    }
    let finished = sessions.borrow_mut().remove(&session_id);
    if let Some(PopupSession {
        poll: Some(poll), ..
    }) = finished
    {
        poll.run();
    }
    log::info!("authorization popup {session_id} closed; reloading");
    host.reload();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePopupHost, ManualScheduler};

    fn bridge(host: Rc<FakePopupHost>) -> (PopupAuthorizationBridge, Rc<ManualScheduler>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let bridge = PopupAuthorizationBridge::new(PopupConfig::default(), host, scheduler.clone());
        (bridge, scheduler)
    }

    #[test]
    fn centers_on_current_monitor() {
        let geometry = ScreenGeometry {
            screen_x: Some(1920.0),
            screen_y: Some(0.0),
            screen_top: Some(40.0),
            avail_width: Some(2560.0),
            avail_height: Some(1400.0),
            width: 2560.0,
            height: 1440.0,
            ..ScreenGeometry::default()
        };
        let placement = PopupPlacement::centered(&geometry, 500, 600);
        assert_eq!(placement.left, 1920.0 + 1030.0);
        assert_eq!(placement.top, 40.0 + 400.0);
        assert_eq!(
            placement.features(),
            "width=500,height=600,left=2950,top=440,scrollbars=yes,resizable=yes"
        );
    }

    #[test]
    fn missing_avail_size_uses_screen_size() {
        let geometry = ScreenGeometry {
            width: 1500.0,
            height: 1000.0,
            ..ScreenGeometry::default()
        };
        let placement = PopupPlacement::centered(&geometry, 500, 600);
        assert_eq!((placement.left, placement.top), (500.0, 200.0));
    }

    #[test]
    fn blocked_popup_navigates_once_without_polling() {
        let host = Rc::new(FakePopupHost::blocking());
        let (bridge, scheduler) = bridge(host.clone());
        assert_eq!(
            bridge.open("https://auth.example.com/start"),
            PopupOutcome::Navigated
        );
        assert_eq!(
            host.navigations(),
            vec!["https://auth.example.com/start".to_string()]
        );
        assert_eq!(scheduler.active_timers(), 0);
        assert_eq!(bridge.open_sessions(), 0);
    }

    #[test]
    fn closing_popup_stops_polling_and_reloads() {
        let host = Rc::new(FakePopupHost::allowing());
        let (bridge, scheduler) = bridge(host.clone());
        let outcome = bridge.open("https://auth.example.com/start");
        assert_eq!(outcome, PopupOutcome::Opened { session_id: 1 });
        assert_eq!(host.opened()[0].1, "oauth-popup");

        scheduler.advance(millis(1_500));
        assert_eq!(host.reloads(), 0);

        host.close_last_popup();
        scheduler.advance(millis(500));
        assert_eq!(host.reloads(), 1);
        assert_eq!(scheduler.active_timers(), 0);
        assert_eq!(bridge.open_sessions(), 0);

        scheduler.advance(millis(5_000));
        assert_eq!(host.reloads(), 1);
    }

    #[test]
    fn close_all_stops_every_poll_without_reloading() {
        let host = Rc::new(FakePopupHost::allowing());
        let (bridge, scheduler) = bridge(host.clone());
        bridge.open("https://auth.example.com/a");
        bridge.open("https://auth.example.com/b");
        assert_eq!(scheduler.active_timers(), 2);

        bridge.close_all();
        assert_eq!(scheduler.active_timers(), 0);
        assert_eq!(bridge.open_sessions(), 0);

        host.close_last_popup();
        scheduler.advance(millis(5_000));
        assert_eq!(host.reloads(), 0);
    }

    #[test]
    fn popup_left_open_keeps_polling() {
        let host = Rc::new(FakePopupHost::allowing());
        let (bridge, scheduler) = bridge(host.clone());
        bridge.open("https://auth.example.com/start");
        scheduler.advance(millis(60_000));
        assert_eq!(scheduler.active_timers(), 1);
        assert_eq!(bridge.open_sessions(), 1);
        assert!(host.navigations().is_empty());
    }
}
