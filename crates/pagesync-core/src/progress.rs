use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::connection::LoadingNotice;
use crate::scheduler::Scheduler;
use crate::teardown::Teardown;

pub trait ProgressView {
    fn show(&self);
    fn hide(&self);
}

/// Shows the progress affordance only for loads that outlast a grace period.
#[derive(Clone)]
pub struct ProgressIndicator {
    inner: Rc<ProgressInner>,
}

struct ProgressInner {
    view: Rc<dyn ProgressView>,
    scheduler: Rc<dyn Scheduler>,
    grace: Duration,
    visible: Cell<bool>,
    pending: RefCell<Option<Teardown>>,
}

impl ProgressIndicator {
    pub fn new(view: Rc<dyn ProgressView>, scheduler: Rc<dyn Scheduler>, grace: Duration) -> Self {
        Self {
            inner: Rc::new(ProgressInner {
                view,
                scheduler,
                grace,
                visible: Cell::new(false),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    pub fn handle(&self, notice: LoadingNotice) {
        match notice {
            LoadingNotice::Started => self.started(),
            LoadingNotice::Stopped => self.stopped(),
        }
    }

    pub fn started(&self) {
        self.cancel_pending();
        if self.is_visible() {
            return;
        }
        let weak: Weak<ProgressInner> = Rc::downgrade(&self.inner);
        let timer = self.inner.scheduler.timeout(
            self.inner.grace,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // Already fired; dropping the handle only clears the slot.
                let fired = inner.pending.borrow_mut().take();
                drop(fired);
                inner.visible.set(true);
                inner.view.show();
            }),
        );
        *self.inner.pending.borrow_mut() = Some(timer);
    }

    pub fn stopped(&self) {
        self.cancel_pending();
        self.inner.visible.set(false);
        self.inner.view.hide();
    }

    fn cancel_pending(&self) {
        let pending = self.inner.pending.borrow_mut().take();
        if let Some(timer) = pending {
            timer.run();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::millis;
    use crate::testing::{FakeProgressView, ManualScheduler};

    fn indicator() -> (ProgressIndicator, Rc<FakeProgressView>, Rc<ManualScheduler>) {
        let view = Rc::new(FakeProgressView::default());
        let scheduler = Rc::new(ManualScheduler::new());
        let indicator = ProgressIndicator::new(view.clone(), scheduler.clone(), millis(300));
        (indicator, view, scheduler)
    }

    #[test]
    fn fast_loads_show_nothing() {
        let (indicator, view, scheduler) = indicator();
        indicator.started();
        scheduler.advance(millis(299));
        indicator.stopped();
        scheduler.advance(millis(1_000));
        assert_eq!(view.shows(), 0);
        assert!(!view.is_visible());
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[test]
    fn slow_loads_show_after_grace_and_hide_on_stop() {
        let (indicator, view, scheduler) = indicator();
        indicator.started();
        scheduler.advance(millis(300));
        assert!(view.is_visible());
        assert!(indicator.is_visible());
        assert!(!indicator.is_pending());
        indicator.stopped();
        assert!(!view.is_visible());
    }

    #[test]
    fn repeated_pairs_never_leave_indicator_visible() {
        let (indicator, view, scheduler) = indicator();
        for step in 0..10 {
            indicator.started();
            indicator.started();
            scheduler.advance(millis(100 * step));
            indicator.stopped();
        }
        scheduler.advance(millis(5_000));
        assert!(!view.is_visible());
        assert!(!indicator.is_pending());
    }

    #[test]
    fn start_while_visible_arms_nothing() {
        let (indicator, view, scheduler) = indicator();
        indicator.started();
        scheduler.advance(millis(300));
        indicator.started();
        assert!(!indicator.is_pending());
        assert_eq!(scheduler.active_timers(), 0);
        assert_eq!(view.shows(), 1);
    }

    #[test]
    fn restart_replaces_pending_timer() {
        let (indicator, view, scheduler) = indicator();
        indicator.started();
        scheduler.advance(millis(200));
        indicator.started();
        assert_eq!(scheduler.active_timers(), 1);
        scheduler.advance(millis(200));
        assert_eq!(view.shows(), 0);
        scheduler.advance(millis(100));
        assert_eq!(view.shows(), 1);
    }
}
