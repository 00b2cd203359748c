//! Wires every controller to one page and routes push-stream events to them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::bridges::{ClipboardBridge, ClipboardSink, DownloadBridge, DownloadHost};
use crate::config::PageSyncConfig;
use crate::connection::{ConnectionPhase, PersistentConnection, PushTransport, TransportKind};
use crate::error::{PageSyncError, Result};
use crate::events::PushEvent;
use crate::notification::{
    DismissSink, LifecyclePhase, NotificationElement, NotificationRegistry, ReconcileSummary,
};
use crate::popup::{PopupAuthorizationBridge, PopupHost, PopupOutcome};
use crate::progress::{ProgressIndicator, ProgressView};
use crate::scheduler::{Scheduler, millis};
use crate::sticky_header::{HeaderDom, HeaderMode, StickyHeaderController, Viewport};
use crate::teardown::Teardown;
use crate::theme::{DurableStore, Theme, ThemeController, ThemeDom, ThemeRoot};

/// Platform implementations the runtime is built from.
#[derive(Clone)]
pub struct Ports {
    pub scheduler: Rc<dyn Scheduler>,
    pub transport: Rc<dyn PushTransport>,
    pub store: Rc<dyn DurableStore>,
    pub theme_root: Rc<dyn ThemeRoot>,
    pub theme_dom: Rc<dyn ThemeDom>,
    pub header_dom: Rc<dyn HeaderDom>,
    pub viewport: Rc<dyn Viewport>,
    pub progress: Rc<dyn ProgressView>,
    pub popup: Rc<dyn PopupHost>,
    pub clipboard: Rc<dyn ClipboardSink>,
    pub download: Rc<dyn DownloadHost>,
    pub dismiss: DismissSink,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSnapshot {
    pub id: String,
    pub phase: LifecyclePhase,
    pub delay_ms: Option<u64>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeDiagnostics {
    pub started: bool,
    pub connection: ConnectionPhase,
    pub connected: bool,
    pub fallback_pending: bool,
    pub progress_visible: bool,
    pub theme: Theme,
    pub stored_theme: Theme,
    pub theme_toggle_bound: bool,
    pub header_mode: Option<HeaderMode>,
    pub notifications: Vec<NotificationSnapshot>,
    pub open_popups: usize,
    pub reinitializations: u64,
    pub last_error: Option<String>,
}

pub struct PageRuntime {
    config: PageSyncConfig,
    scheduler: Rc<dyn Scheduler>,
    connection: PersistentConnection,
    progress: ProgressIndicator,
    theme: ThemeController,
    header: StickyHeaderController,
    notifications: RefCell<NotificationRegistry>,
    popup: PopupAuthorizationBridge,
    clipboard: ClipboardBridge,
    download: DownloadBridge,
    page_bindings: RefCell<Option<Teardown>>,
    progress_subscription: RefCell<Option<Teardown>>,
    started: Cell<bool>,
    reinitializations: Cell<u64>,
    last_error: Rc<RefCell<Option<String>>>,
}

impl PageRuntime {
    pub fn new(config: PageSyncConfig, ports: Ports) -> Result<Self> {
        config.validate()?;

        let connection = PersistentConnection::new(
            ports.transport,
            ports.scheduler.clone(),
            millis(config.connection.fallback_after_ms),
        );
        let progress = ProgressIndicator::new(
            ports.progress,
            ports.scheduler.clone(),
            millis(config.progress.grace_ms),
        );
        let theme = ThemeController::new(
            config.theme.clone(),
            ports.store,
            ports.theme_root,
            ports.theme_dom,
        );
        let header =
            StickyHeaderController::new(ports.header_dom, ports.viewport, ports.scheduler.clone());
        let notifications = NotificationRegistry::new(
            config.notifications.clone(),
            ports.scheduler.clone(),
            Rc::new(connection.clone()),
            ports.dismiss,
        );
        let popup =
            PopupAuthorizationBridge::new(config.popup.clone(), ports.popup, ports.scheduler.clone());
        let clipboard = ClipboardBridge::new(ports.clipboard);
        let download = DownloadBridge::new(ports.download, config.download.mime_type.clone());

        Ok(Self {
            config,
            scheduler: ports.scheduler,
            connection,
            progress,
            theme,
            header,
            notifications: RefCell::new(notifications),
            popup,
            clipboard,
            download,
            page_bindings: RefCell::new(None),
            progress_subscription: RefCell::new(None),
            started: Cell::new(false),
            reinitializations: Cell::new(0),
            last_error: Rc::new(RefCell::new(None)),
        })
    }

    pub fn config(&self) -> &PageSyncConfig {
        &self.config
    }

    pub fn connection(&self) -> &PersistentConnection {
        &self.connection
    }

    pub fn progress(&self) -> &ProgressIndicator {
        &self.progress
    }

    pub fn theme(&self) -> &ThemeController {
        &self.theme
    }

    pub fn header(&self) -> &StickyHeaderController {
        &self.header
    }

    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Binds page controllers and opens the push connection. Later calls are
    /// no-ops.
    pub fn start(&self) {
        if self.started.replace(true) {
            return;
        }
        let progress = self.progress.clone();
        let subscription = self
            .connection
            .subscribe(move |notice| progress.handle(notice));
        *self.progress_subscription.borrow_mut() = Some(subscription);

        self.reinitialize();
        if let Err(error) = self.connection.connect() {
            self.record_error("connect", &error);
        }
        log::info!("pagesync runtime started");
    }

    /// Discards the theme and header bindings and rebuilds them against the
    /// current document.
    pub fn reinitialize(&self) {
        let previous = self.page_bindings.borrow_mut().take();
        if let Some(bindings) = previous {
            bindings.run();
        }
        let bindings = Teardown::all(vec![self.theme.attach(), self.header.attach()]);
        *self.page_bindings.borrow_mut() = Some(bindings);
        self.reinitializations.set(self.reinitializations.get() + 1);
        log::debug!("page controllers reinitialized");
    }

    /// Decodes and handles a named event from the push stream.
    pub fn dispatch_raw(&self, name: &str, detail: Value) {
        match PushEvent::decode(name, detail, &self.config.events) {
            Ok(Some(event)) => self.dispatch(event),
            Ok(None) => log::trace!("ignoring unconfigured event {name}"),
            Err(error) => self.record_error(name, &error),
        }
    }

    pub fn dispatch(&self, event: PushEvent) {
        log::debug!("push event {}", event.kind());
        match event {
            PushEvent::LoadingStarted => self.connection.loading_started(),
            PushEvent::LoadingStopped => {
                self.connection.loading_stopped();
                self.reinitialize();
            }
            PushEvent::DomPatched => self.reinitialize(),
            PushEvent::Download { data, filename } => {
                if let Err(error) = self.download.download(&data, &filename) {
                    self.record_error("download", &error);
                }
            }
            PushEvent::OpenAuthorizationPopup { url } => {
                if let PopupOutcome::Navigated = self.popup.open(&url) {
                    log::debug!("authorization continued in the current window");
                }
            }
            PushEvent::CopyToClipboard { text } => {
                let clipboard = self.clipboard.clone();
                let last_error = self.last_error.clone();
                self.scheduler.spawn(Box::pin(async move {
                    if !clipboard.copy(text).await {
                        *last_error.borrow_mut() = Some(
                            PageSyncError::Clipboard("write rejected".to_string()).to_string(),
                        );
                    }
                }));
            }
        }
    }

    /// Called by the transport binding when a transport comes up.
    pub fn transport_opened(&self, kind: TransportKind) {
        self.connection.transport_opened(kind);
    }

    pub fn transport_closed(&self) {
        self.connection.transport_closed();
    }

    pub fn reconcile_notifications(
        &self,
        present: Vec<Rc<dyn NotificationElement>>,
    ) -> ReconcileSummary {
        self.notifications.borrow_mut().reconcile(present)
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        self.theme.toggle().inspect_err(|error| {
            self.record_error("toggle theme", error);
        })
    }

    /// Releases every listener and timer the runtime holds.
    pub fn shutdown(&self) {
        let bindings = self.page_bindings.borrow_mut().take();
        if let Some(bindings) = bindings {
            bindings.run();
        }
        let subscription = self.progress_subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            subscription.run();
        }
        self.connection.cancel_fallback();
        self.popup.close_all();
        self.notifications.borrow_mut().clear();
        self.started.set(false);
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn diagnostics(&self) -> RuntimeDiagnostics {
        let notifications = {
            let registry = self.notifications.borrow();
            registry
                .tracked_ids()
                .into_iter()
                .filter_map(|id| {
                    registry.get(&id).map(|lifecycle| NotificationSnapshot {
                        id: lifecycle.element_id().to_string(),
                        phase: lifecycle.phase(),
                        delay_ms: lifecycle
                            .delay()
                            .map(|delay| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
                        pending: lifecycle.has_pending_timer(),
                    })
                })
                .collect()
        };
        RuntimeDiagnostics {
            started: self.is_started(),
            connection: self.connection.phase(),
            connected: self.connection.is_connected(),
            fallback_pending: self.connection.fallback_pending(),
            progress_visible: self.progress.is_visible(),
            theme: self.theme.current(),
            stored_theme: self.theme.stored(),
            theme_toggle_bound: self.theme.has_toggle(),
            header_mode: self.header.mode(),
            notifications,
            open_popups: self.popup.open_sessions(),
            reinitializations: self.reinitializations.get(),
            last_error: self.last_error(),
        }
    }

    fn record_error(&self, context: &str, error: &PageSyncError) {
        log::warn!("{context} failed: {error}");
        *self.last_error.borrow_mut() = Some(error.to_string());
    }
}

impl Drop for PageRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
