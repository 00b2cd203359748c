#[cfg(any(target_arch = "wasm32", test))]
mod live_socket;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::channel::oneshot;
    use futures::future::{LocalBoxFuture, abortable};
    use gloo_timers::future::sleep;
    use js_sys::{Array, Function, Reflect, Uint8Array};
    use pagesync_core::{
        ClipboardSink, DismissRequest, DownloadHost, DurableStore, HeaderDom, HeaderMode,
        HeaderView, NotificationElement, OverlayState, PageRuntime, PageSyncConfig,
        PageSyncError, PopupHost, PopupWindow, Ports, ProgressView, PushTransport,
        RuntimeDiagnostics, Scheduler, ScreenGeometry, Teardown, Theme, ThemeDom, ThemeRoot,
        ThemeToggleView, ToggleAppearance, TransientAnchor, TransportKind, Viewport,
        dismiss_command,
    };
    use serde::Serialize;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::{
        Element, HtmlAnchorElement, HtmlElement, MutationObserver, MutationObserverInit,
    };

    use crate::live_socket::{SocketCall, open_sequence, socket_options};
    use crate::wasm_constants::*;

    mod dom;
    mod lifecycle;
    mod network;

    use dom::*;
    use lifecycle::*;
    use network::*;

    thread_local! {
        static RUNTIME: RefCell<Option<Rc<PageRuntime>>> = const { RefCell::new(None) };
        static DIAGNOSTICS: RefCell<ShellDiagnostics> = RefCell::new(ShellDiagnostics::default());
        static ACTIVE_TRANSPORT: Cell<TransportKind> = const { Cell::new(TransportKind::WebSocket) };
        static DOM_READY_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static WINDOW_EVENT_HANDLERS: RefCell<Vec<(String, Closure<dyn FnMut(web_sys::Event)>)>> = const { RefCell::new(Vec::new()) };
        static NOTIFICATION_OBSERVER: RefCell<Option<NotificationObserver>> = const { RefCell::new(None) };
        static SOCKET_CALLBACKS: RefCell<Vec<Closure<dyn FnMut()>>> = const { RefCell::new(Vec::new()) };
    }

    #[derive(Debug, Clone, Default, Serialize)]
    pub(super) struct ShellDiagnostics {
        phase: String,
        detail: String,
        last_error: Option<String>,
    }

    #[derive(Serialize)]
    struct DiagnosticsReport {
        shell: ShellDiagnostics,
        runtime: Option<RuntimeDiagnostics>,
    }

    pub(super) struct NotificationObserver {
        observer: MutationObserver,
        _callback: Closure<dyn FnMut(Array, MutationObserver)>,
    }

    impl Drop for NotificationObserver {
        fn drop(&mut self) {
            self.observer.disconnect();
        }
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        let (config, config_error) = match load_config() {
            Ok(config) => (config, None),
            Err(error) => (PageSyncConfig::default(), Some(error)),
        };
        let _ = console_log::init_with_level(config.log_level());
        if let Some(error) = config_error {
            log::error!("{error}; continuing with defaults");
            set_shell_error(&error.to_string());
        }

        set_shell_phase("booting", "waiting for document");
        when_document_ready(move || {
            if let Err(error) = boot(config) {
                set_shell_error(&error);
            }
        });
    }

    #[wasm_bindgen]
    pub fn pagesync_diagnostics_json() -> String {
        let report = DiagnosticsReport {
            shell: DIAGNOSTICS.with(|state| state.borrow().clone()),
            runtime: current_runtime().map(|runtime| runtime.diagnostics()),
        };
        serde_json::to_string(&report).unwrap_or_else(|_| {
            "{\"shell\":{\"phase\":\"error\",\"detail\":\"diagnostics serialization failed\"}}"
                .to_string()
        })
    }

    /// Flips the theme; returns the new theme, or an empty string on failure.
    #[wasm_bindgen]
    pub fn pagesync_toggle_theme() -> String {
        let Some(runtime) = current_runtime() else {
            return String::new();
        };
        match runtime.toggle_theme() {
            Ok(theme) => theme.as_str().to_string(),
            Err(error) => {
                set_shell_error(&error.to_string());
                String::new()
            }
        }
    }

    #[wasm_bindgen]
    pub fn pagesync_reinitialize() {
        if let Some(runtime) = current_runtime() {
            runtime.reinitialize();
            reconcile_notifications(&runtime);
        }
    }

    pub(super) fn current_runtime() -> Option<Rc<PageRuntime>> {
        RUNTIME.with(|slot| slot.borrow().clone())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::pagesync_diagnostics_json;

#[cfg(not(target_arch = "wasm32"))]
pub fn pagesync_diagnostics_json() -> String {
    "{\"shell\":{\"phase\":\"native\",\"detail\":\"pagesync only runs on wasm\"},\"runtime\":null}"
        .to_string()
}
