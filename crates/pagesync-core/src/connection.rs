//! Lifecycle of the push connection.
//!
//! The primary transport gets a bounded window to come up; if it has not
//! opened when the window closes (or refuses to open at all), the connection
//! switches to the fallback transport. Reconnects after that are the
//! transport's own business.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::teardown::Teardown;

/// Read-only view of connection liveness handed to other components.
pub trait ConnectionProbe {
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    WebSocket,
    LongPoll,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::LongPoll => "longpoll",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "transport", rename_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    Connecting(TransportKind),
    Live(TransportKind),
}

pub trait PushTransport {
    fn open(&self, kind: TransportKind) -> Result<()>;
    fn is_open(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingNotice {
    Started,
    Stopped,
}

type LoadingListener = Rc<dyn Fn(LoadingNotice)>;

#[derive(Clone)]
pub struct PersistentConnection {
    inner: Rc<ConnectionInner>,
}

struct ConnectionInner {
    transport: Rc<dyn PushTransport>,
    scheduler: Rc<dyn Scheduler>,
    fallback_after: Duration,
    phase: Cell<ConnectionPhase>,
    fallback_timer: RefCell<Option<Teardown>>,
    listeners: RefCell<Vec<(u64, LoadingListener)>>,
    next_listener_id: Cell<u64>,
}

impl PersistentConnection {
    pub fn new(
        transport: Rc<dyn PushTransport>,
        scheduler: Rc<dyn Scheduler>,
        fallback_after: Duration,
    ) -> Self {
        Self {
            inner: Rc::new(ConnectionInner {
                transport,
                scheduler,
                fallback_after,
                phase: Cell::new(ConnectionPhase::Idle),
                fallback_timer: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
            }),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.inner.phase.get()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_open()
    }

    pub fn fallback_pending(&self) -> bool {
        self.inner.fallback_timer.borrow().is_some()
    }

    /// Opens the primary transport and arms the fallback deadline.
    ///
    /// Calling this again while connecting or live does nothing.
    pub fn connect(&self) -> Result<()> {
        if self.phase() != ConnectionPhase::Idle {
            return Ok(());
        }
        self.inner
            .phase
            .set(ConnectionPhase::Connecting(TransportKind::WebSocket));

        if let Err(error) = self.inner.transport.open(TransportKind::WebSocket) {
            log::info!("primary transport failed to open ({error}); falling back");
            return self.fall_back();
        }

        let weak: Weak<ConnectionInner> = Rc::downgrade(&self.inner);
        let timer = self.inner.scheduler.timeout(
            self.inner.fallback_after,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let connection = PersistentConnection { inner };
                if connection.phase() != ConnectionPhase::Connecting(TransportKind::WebSocket)
                    || connection.is_connected()
                {
                    return;
                }
                log::info!(
                    "primary transport not live after {:?}; falling back",
                    connection.inner.fallback_after
                );
                if let Err(error) = connection.fall_back() {
                    log::warn!("fallback transport failed to open: {error}");
                }
            }),
        );
        *self.inner.fallback_timer.borrow_mut() = Some(timer);
        Ok(())
    }

    fn fall_back(&self) -> Result<()> {
        self.cancel_fallback();
        self.inner
            .phase
            .set(ConnectionPhase::Connecting(TransportKind::LongPoll));
        self.inner.transport.open(TransportKind::LongPoll)
    }

    /// Disarms the fallback deadline, if one is pending.
    pub fn cancel_fallback(&self) {
        let pending = self.inner.fallback_timer.borrow_mut().take();
        if let Some(timer) = pending {
            timer.run();
        }
    }

    /// Called by the transport binding once a transport is established.
    pub fn transport_opened(&self, kind: TransportKind) {
        self.cancel_fallback();
        if self.phase() != ConnectionPhase::Live(kind) {
            log::info!("push connection live over {}", kind.as_str());
        }
        self.inner.phase.set(ConnectionPhase::Live(kind));
    }

    /// Called by the transport binding when an established transport drops.
    pub fn transport_closed(&self) {
        if let ConnectionPhase::Live(kind) = self.phase() {
            log::info!("push connection over {} dropped", kind.as_str());
            self.inner.phase.set(ConnectionPhase::Connecting(kind));
        }
    }

    pub fn subscribe(&self, listener: impl Fn(LoadingNotice) + 'static) -> Teardown {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak = Rc::downgrade(&self.inner);
        Teardown::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    pub fn loading_started(&self) {
        self.notify(LoadingNotice::Started);
    }

    pub fn loading_stopped(&self) {
        self.notify(LoadingNotice::Stopped);
    }

    fn notify(&self, notice: LoadingNotice) {
        let listeners: Vec<LoadingListener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(notice);
        }
    }
}

impl ConnectionProbe for PersistentConnection {
    fn is_connected(&self) -> bool {
        PersistentConnection::is_connected(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::millis;
    use crate::testing::{FakeTransport, ManualScheduler};

    fn connection(transport: Rc<FakeTransport>) -> (PersistentConnection, Rc<ManualScheduler>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let connection = PersistentConnection::new(transport, scheduler.clone(), millis(2_500));
        (connection, scheduler)
    }

    #[test]
    fn primary_transport_opening_in_time_cancels_fallback() {
        let transport = Rc::new(FakeTransport::default());
        let (connection, scheduler) = connection(transport.clone());
        connection.connect().expect("connect");
        scheduler.advance(millis(1_000));
        transport.set_open(true);
        connection.transport_opened(TransportKind::WebSocket);

        assert!(!connection.fallback_pending());
        scheduler.advance(millis(5_000));
        assert_eq!(transport.opened(), vec![TransportKind::WebSocket]);
        assert_eq!(
            connection.phase(),
            ConnectionPhase::Live(TransportKind::WebSocket)
        );
        assert!(connection.is_connected());
    }

    #[test]
    fn falls_back_when_primary_misses_deadline() {
        let transport = Rc::new(FakeTransport::default());
        let (connection, scheduler) = connection(transport.clone());
        connection.connect().expect("connect");
        scheduler.advance(millis(2_499));
        assert_eq!(transport.opened(), vec![TransportKind::WebSocket]);
        scheduler.advance(millis(1));
        assert_eq!(
            transport.opened(),
            vec![TransportKind::WebSocket, TransportKind::LongPoll]
        );
        assert_eq!(
            connection.phase(),
            ConnectionPhase::Connecting(TransportKind::LongPoll)
        );
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[test]
    fn falls_back_immediately_when_primary_refuses() {
        let transport = Rc::new(FakeTransport::default());
        transport.refuse(TransportKind::WebSocket);
        let (connection, scheduler) = connection(transport.clone());
        connection.connect().expect("fallback opens");
        assert_eq!(
            transport.opened(),
            vec![TransportKind::WebSocket, TransportKind::LongPoll]
        );
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[test]
    fn connect_is_idempotent() {
        let transport = Rc::new(FakeTransport::default());
        let (connection, scheduler) = connection(transport.clone());
        connection.connect().expect("connect");
        connection.connect().expect("second connect");
        assert_eq!(transport.opened().len(), 1);
        assert_eq!(scheduler.active_timers(), 1);
    }

    #[test]
    fn closed_transport_returns_to_connecting() {
        let transport = Rc::new(FakeTransport::default());
        let (connection, _scheduler) = connection(transport.clone());
        connection.connect().expect("connect");
        connection.transport_opened(TransportKind::WebSocket);
        connection.transport_closed();
        assert_eq!(
            connection.phase(),
            ConnectionPhase::Connecting(TransportKind::WebSocket)
        );
    }

    #[test]
    fn loading_notices_reach_subscribers_until_unsubscribed() {
        let transport = Rc::new(FakeTransport::default());
        let (connection, _scheduler) = connection(transport);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let subscription = connection.subscribe(move |notice| log.borrow_mut().push(notice));

        connection.loading_started();
        connection.loading_stopped();
        subscription.run();
        connection.loading_started();

        assert_eq!(
            seen.borrow().as_slice(),
            &[LoadingNotice::Started, LoadingNotice::Stopped]
        );
    }
}
