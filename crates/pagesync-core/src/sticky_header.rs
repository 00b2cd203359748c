//! Scroll-direction driven header visibility.
//!
//! The header is `Sticky` while the user scrolls up and `Scrolling` (allowed to
//! leave the viewport) while they scroll down. Only the sign of the movement
//! between consecutive samples matters, never the absolute offset.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::scheduler::Scheduler;
use crate::teardown::Teardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    Sticky,
    Scrolling,
}

/// State of an overlay that pins the header while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Absent,
    Closed,
    Open,
}

pub trait HeaderView {
    fn set_mode(&self, mode: HeaderMode);
    fn set_suppressed(&self, suppressed: bool);
}

pub trait Viewport {
    fn scroll_y(&self) -> f64;
    fn overlay(&self) -> OverlayState;
    fn on_scroll(&self, handler: Box<dyn FnMut()>) -> Teardown;
}

pub trait HeaderDom {
    fn find_header(&self) -> Option<Rc<dyn HeaderView>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollState {
    pub last_scroll_y: f64,
    pub is_scrolling_down: bool,
    pub mode: HeaderMode,
}

/// Visual changes one sample asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleOutcome {
    pub mode: Option<HeaderMode>,
    pub suppressed: Option<bool>,
}

impl ScrollState {
    pub fn new(initial_scroll_y: f64) -> Self {
        Self {
            last_scroll_y: initial_scroll_y,
            is_scrolling_down: false,
            mode: HeaderMode::Sticky,
        }
    }

    pub fn sample(&mut self, scroll_y: f64, overlay: OverlayState) -> SampleOutcome {
        let scrolling_down = scroll_y > self.last_scroll_y;
        let mut outcome = SampleOutcome {
            mode: None,
            suppressed: match overlay {
                OverlayState::Absent => None,
                OverlayState::Closed => Some(false),
                OverlayState::Open => Some(true),
            },
        };

        if scrolling_down != self.is_scrolling_down {
            self.is_scrolling_down = scrolling_down;
            // An open overlay keeps the direction bookkeeping but freezes the header.
            if overlay != OverlayState::Open {
                let mode = if scrolling_down {
                    HeaderMode::Scrolling
                } else {
                    HeaderMode::Sticky
                };
                if mode != self.mode {
                    self.mode = mode;
                    outcome.mode = Some(mode);
                }
            }
        }

        self.last_scroll_y = scroll_y;
        outcome
    }
}

#[derive(Clone)]
pub struct StickyHeaderController {
    inner: Rc<HeaderInner>,
}

struct HeaderInner {
    dom: Rc<dyn HeaderDom>,
    viewport: Rc<dyn Viewport>,
    scheduler: Rc<dyn Scheduler>,
    session: RefCell<Option<Rc<HeaderSession>>>,
}

/// One binding to one header node; discarded wholesale on reinitialization.
struct HeaderSession {
    view: Rc<dyn HeaderView>,
    state: RefCell<ScrollState>,
    ticking: Cell<bool>,
    frame: RefCell<Option<Teardown>>,
}

impl HeaderSession {
    fn sample(&self, viewport: &dyn Viewport) {
        let outcome = self
            .state
            .borrow_mut()
            .sample(viewport.scroll_y(), viewport.overlay());
        if let Some(suppressed) = outcome.suppressed {
            self.view.set_suppressed(suppressed);
        }
        if let Some(mode) = outcome.mode {
            log::debug!("sticky header -> {mode:?}");
            self.view.set_mode(mode);
        }
    }

    fn schedule(self: &Rc<Self>, scheduler: &dyn Scheduler, viewport: Rc<dyn Viewport>) {
        if self.ticking.replace(true) {
            return;
        }
        let session: Weak<HeaderSession> = Rc::downgrade(self);
        let frame = scheduler.animation_frame(Box::new(move || {
            if let Some(session) = session.upgrade() {
                session.sample(viewport.as_ref());
                session.ticking.set(false);
            }
        }));
        *self.frame.borrow_mut() = Some(frame);
    }
}

impl StickyHeaderController {
    pub fn new(
        dom: Rc<dyn HeaderDom>,
        viewport: Rc<dyn Viewport>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Rc::new(HeaderInner {
                dom,
                viewport,
                scheduler,
                session: RefCell::new(None),
            }),
        }
    }

    /// Binds to the current header node with fresh scroll state.
    pub fn attach(&self) -> Teardown {
        let Some(view) = self.inner.dom.find_header() else {
            self.inner.session.borrow_mut().take();
            return Teardown::noop();
        };

        let session = Rc::new(HeaderSession {
            view,
            state: RefCell::new(ScrollState::new(self.inner.viewport.scroll_y())),
            ticking: Cell::new(false),
            frame: RefCell::new(None),
        });
        session.view.set_mode(HeaderMode::Sticky);
        session.sample(self.inner.viewport.as_ref());

        let weak_session = Rc::downgrade(&session);
        let weak_inner = Rc::downgrade(&self.inner);
        let listener = self.inner.viewport.on_scroll(Box::new(move || {
            let (Some(session), Some(inner)) = (weak_session.upgrade(), weak_inner.upgrade())
            else {
                return;
            };
            session.schedule(inner.scheduler.as_ref(), inner.viewport.clone());
        }));

        *self.inner.session.borrow_mut() = Some(session.clone());

        let weak_inner = Rc::downgrade(&self.inner);
        Teardown::new(move || {
            listener.run();
            let pending = session.frame.borrow_mut().take();
            if let Some(frame) = pending {
                frame.run();
            }
            if let Some(inner) = weak_inner.upgrade() {
                let mut current = inner.session.borrow_mut();
                if current
                    .as_ref()
                    .is_some_and(|active| Rc::ptr_eq(active, &session))
                {
                    current.take();
                }
            }
        })
    }

    pub fn scroll_state(&self) -> Option<ScrollState> {
        self.inner
            .session
            .borrow()
            .as_ref()
            .map(|session| session.state.borrow().clone())
    }

    pub fn mode(&self) -> Option<HeaderMode> {
        self.scroll_state().map(|state| state.mode)
    }
}
