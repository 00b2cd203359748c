use super::*;

    pub(super) fn set_shell_phase(phase: &str, detail: &str) {
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.phase = phase.to_string();
            state.detail = detail.to_string();
        });
        log::debug!("shell {phase}: {detail}");
    }

    pub(super) fn set_shell_error(message: &str) {
        DIAGNOSTICS.with(|state| {
            state.borrow_mut().last_error = Some(message.to_string());
        });
        log::error!("{message}");
    }

    pub(super) fn load_config() -> Result<PageSyncConfig, PageSyncError> {
        let Some(window) = web_sys::window() else {
            return Ok(PageSyncConfig::default());
        };
        let raw = Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL))
            .map_err(|_| PageSyncError::Config(format!("failed to read {CONFIG_GLOBAL}")))?;
        if raw.is_undefined() || raw.is_null() {
            return Ok(PageSyncConfig::default());
        }
        let encoded = js_sys::JSON::stringify(&raw)
            .ok()
            .and_then(|encoded| encoded.as_string())
            .ok_or_else(|| PageSyncError::Config(format!("{CONFIG_GLOBAL} is not JSON")))?;
        PageSyncConfig::from_json(&encoded)
    }

    /// Runs `boot` once the document has been parsed.
    pub(super) fn when_document_ready(boot: impl FnOnce() + 'static) {
        let Some(document) = web_sys::window().and_then(|window| window.document()) else {
            set_shell_error("document is unavailable");
            return;
        };
        if document.ready_state() != "loading" {
            boot();
            return;
        }

        let mut boot = Some(boot);
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
            if let Some(boot) = boot.take() {
                boot();
            }
        }));
        let _ = document
            .add_event_listener_with_callback("DOMContentLoaded", callback.as_ref().unchecked_ref());
        DOM_READY_HANDLER.with(|slot| *slot.borrow_mut() = Some(callback));
    }

    pub(super) fn boot(config: PageSyncConfig) -> Result<(), String> {
        if current_runtime().is_some() {
            return Ok(());
        }
        set_shell_phase("booting", "binding live socket");
        let socket = LiveSocketTransport::bind(&config)?;

        let dismiss_socket = socket.clone();
        let ports = Ports {
            scheduler: Rc::new(WebScheduler),
            transport: Rc::new(socket.clone()),
            store: Rc::new(LocalStorageStore),
            theme_root: Rc::new(DocumentThemeRoot::new(&config.theme.dark_class)),
            theme_dom: Rc::new(DocumentThemeDom::new(&config.theme)),
            header_dom: Rc::new(DocumentHeaderDom::new(&config.header)),
            viewport: Rc::new(WindowViewport::new(&config.header)),
            progress: Rc::new(TopBarProgress::new(&config.progress)),
            popup: Rc::new(WindowPopupHost),
            clipboard: Rc::new(NavigatorClipboard),
            download: Rc::new(BlobDownloadHost),
            dismiss: Rc::new(move |request: DismissRequest| dismiss_socket.push_dismiss(&request)),
        };

        let runtime = PageRuntime::new(config, ports)
            .map(Rc::new)
            .map_err(|error| format!("failed to build runtime: {error}"))?;
        RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime.clone()));

        install_window_event_handlers(&runtime);
        socket.install_callbacks();
        install_notification_observer()?;

        runtime.start();
        reconcile_notifications(&runtime);
        set_shell_phase("ready", "runtime started");
        Ok(())
    }

    fn install_window_event_handlers(runtime: &PageRuntime) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let names: Vec<String> = runtime
            .config()
            .events
            .all()
            .iter()
            .map(|name| name.to_string())
            .collect();

        WINDOW_EVENT_HANDLERS.with(|slot| {
            if !slot.borrow().is_empty() {
                return;
            }
            for name in names {
                let event_name = name.clone();
                let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |event| {
                    handle_window_event(&event_name, event);
                }));
                let _ = window
                    .add_event_listener_with_callback(&name, callback.as_ref().unchecked_ref());
                slot.borrow_mut().push((name, callback));
            }
        });
    }

    fn handle_window_event(name: &str, event: web_sys::Event) {
        let Some(runtime) = current_runtime() else {
            return;
        };
        let detail = event
            .dyn_ref::<web_sys::CustomEvent>()
            .map(|event| event.detail())
            .unwrap_or(JsValue::NULL);
        let detail = match js_value_to_json(&detail) {
            Ok(detail) => detail,
            Err(error) => {
                set_shell_error(&format!("failed to read `{name}` detail: {error}"));
                return;
            }
        };
        runtime.dispatch_raw(name, detail);
        if name == runtime.config().events.dom_patched || name == runtime.config().events.loading_stop
        {
            reconcile_notifications(&runtime);
        }
    }

    fn js_value_to_json(value: &JsValue) -> Result<serde_json::Value, String> {
        if value.is_undefined() || value.is_null() {
            return Ok(serde_json::Value::Null);
        }
        let encoded = js_sys::JSON::stringify(value)
            .map_err(|_| "value is not serializable".to_string())?
            .as_string()
            .ok_or_else(|| "value did not stringify".to_string())?;
        serde_json::from_str(&encoded).map_err(|error| error.to_string())
    }

    fn install_notification_observer() -> Result<(), String> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| "document is unavailable".to_string())?;
        let body = document
            .body()
            .ok_or_else(|| "document body is unavailable".to_string())?;

        let callback = Closure::<dyn FnMut(Array, MutationObserver)>::wrap(Box::new(
            move |_records, _observer| {
                if let Some(runtime) = current_runtime() {
                    reconcile_notifications(&runtime);
                }
            },
        ));
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|_| "failed to create notification observer".to_string())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        options.set_character_data(true);
        observer
            .observe_with_options(&body, &options)
            .map_err(|_| "failed to observe document body".to_string())?;

        NOTIFICATION_OBSERVER.with(|slot| {
            *slot.borrow_mut() = Some(NotificationObserver {
                observer,
                _callback: callback,
            });
        });
        Ok(())
    }

    pub(super) fn reconcile_notifications(runtime: &PageRuntime) {
        let selector = runtime.config().notifications.selector.clone();
        let present = match find_notifications(&selector) {
            Ok(present) => present,
            Err(error) => {
                set_shell_error(&error);
                return;
            }
        };
        let summary = runtime.reconcile_notifications(present);
        if summary.mounted + summary.updated + summary.destroyed > 0 {
            log::debug!("notifications reconciled: {summary:?}");
        }
    }

    /// Timers backed by `gloo-timers` futures; cancelling aborts the future so
    /// no JS callback is ever dropped from inside itself.
    pub(super) struct WebScheduler;

    impl Scheduler for WebScheduler {
        fn timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Teardown {
            let (future, handle) = abortable(async move {
                sleep(delay).await;
                task();
            });
            spawn_local(async move {
                let _ = future.await;
            });
            Teardown::new(move || handle.abort())
        }

        fn interval(&self, period: Duration, mut task: Box<dyn FnMut()>) -> Teardown {
            let (future, handle) = abortable(async move {
                loop {
                    sleep(period).await;
                    task();
                }
            });
            spawn_local(async move {
                let _ = future.await;
            });
            Teardown::new(move || handle.abort())
        }

        fn animation_frame(&self, task: Box<dyn FnOnce()>) -> Teardown {
            let Some(window) = web_sys::window() else {
                return Teardown::noop();
            };
            let (sender, receiver) = oneshot::channel::<()>();
            let callback = Closure::once(move || {
                let _ = sender.send(());
            });
            let request = window.request_animation_frame(callback.as_ref().unchecked_ref());
            let (future, handle) = abortable(async move {
                let _callback = callback;
                if receiver.await.is_ok() {
                    task();
                }
            });
            spawn_local(async move {
                let _ = future.await;
            });
            Teardown::new(move || {
                if let Ok(request) = request {
                    let _ = window.cancel_animation_frame(request);
                }
                handle.abort();
            })
        }

        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            spawn_local(task);
        }
    }
