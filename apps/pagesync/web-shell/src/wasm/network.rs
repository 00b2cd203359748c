use super::*;

    #[wasm_bindgen]
    extern "C" {
        pub(super) type LiveSocketHandle;

        #[wasm_bindgen(method, catch)]
        fn connect(this: &LiveSocketHandle) -> Result<(), JsValue>;

        #[wasm_bindgen(method, js_name = isConnected)]
        fn is_connected(this: &LiveSocketHandle) -> bool;

        #[wasm_bindgen(method, catch, js_name = execJS)]
        fn exec_js(this: &LiveSocketHandle, el: &Element, encoded: &str) -> Result<(), JsValue>;

        #[wasm_bindgen(method, getter)]
        fn socket(this: &LiveSocketHandle) -> PhoenixSocketHandle;

        pub(super) type PhoenixSocketHandle;

        #[wasm_bindgen(method, catch, js_name = replaceTransport)]
        fn replace_transport(this: &PhoenixSocketHandle, transport: &JsValue)
        -> Result<(), JsValue>;

        #[wasm_bindgen(method, catch, js_name = connect)]
        fn connect_socket(this: &PhoenixSocketHandle) -> Result<(), JsValue>;

        #[wasm_bindgen(method, js_name = onOpen)]
        fn on_open(this: &PhoenixSocketHandle, callback: &Function);

        #[wasm_bindgen(method, js_name = onClose)]
        fn on_close(this: &PhoenixSocketHandle, callback: &Function);
    }

    fn global(name: &str) -> Result<JsValue, String> {
        let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
        let value = Reflect::get(&window, &JsValue::from_str(name))
            .map_err(|_| format!("failed to read window.{name}"))?;
        if value.is_undefined() || value.is_null() {
            return Err(format!("window.{name} is not loaded"));
        }
        Ok(value)
    }

    fn member(target: &JsValue, name: &str) -> Result<JsValue, String> {
        let value = Reflect::get(target, &JsValue::from_str(name))
            .map_err(|_| format!("failed to read {name}"))?;
        if value.is_undefined() {
            return Err(format!("{name} is not defined"));
        }
        Ok(value)
    }

    fn csrf_token(meta_name: &str) -> Option<String> {
        let document = web_sys::window()?.document()?;
        document
            .query_selector(&format!("meta[name='{meta_name}']"))
            .ok()
            .flatten()?
            .get_attribute("content")
    }

    /// Push transport backed by the page's Phoenix `LiveSocket`.
    #[derive(Clone)]
    pub(super) struct LiveSocketTransport {
        live_socket: Rc<LiveSocketHandle>,
    }

    impl LiveSocketTransport {
        pub(super) fn bind(config: &PageSyncConfig) -> Result<Self, String> {
            let phoenix = global(PHOENIX_GLOBAL)?;
            let live_view = global(LIVE_VIEW_GLOBAL)?;
            let live_socket_class = member(&live_view, LIVE_SOCKET_CLASS)?
                .dyn_into::<Function>()
                .map_err(|_| "LiveSocket is not a constructor".to_string())?;
            let socket_class = member(&phoenix, SOCKET_CLASS)?;

            let csrf_token = csrf_token(&config.csrf_meta_name);
            if csrf_token.is_none() {
                log::warn!("no `{}` meta tag; connecting without csrf", config.csrf_meta_name);
            }
            let options = socket_options(csrf_token.as_deref(), &config.notifications.selector);
            let options = js_sys::JSON::parse(&options.to_string())
                .map_err(|_| "failed to build LiveSocket options".to_string())?;

            let arguments = Array::of3(
                &JsValue::from_str(&config.live_path),
                &socket_class,
                &options,
            );
            let live_socket = Reflect::construct(&live_socket_class, &arguments)
                .map_err(|_| "failed to construct LiveSocket".to_string())?;
            if let Some(window) = web_sys::window() {
                let _ = Reflect::set(
                    &window,
                    &JsValue::from_str(LIVE_SOCKET_WINDOW_PROPERTY),
                    &live_socket,
                );
            }
            Ok(Self {
                live_socket: Rc::new(live_socket.unchecked_into()),
            })
        }

        /// Forwards socket open/close to the runtime's connection state.
        pub(super) fn install_callbacks(&self) {
            let socket = self.live_socket.socket();
            let opened = Closure::<dyn FnMut()>::wrap(Box::new(|| {
                if let Some(runtime) = current_runtime() {
                    runtime.transport_opened(ACTIVE_TRANSPORT.with(Cell::get));
                }
            }));
            let closed = Closure::<dyn FnMut()>::wrap(Box::new(|| {
                if let Some(runtime) = current_runtime() {
                    runtime.transport_closed();
                }
            }));
            socket.on_open(opened.as_ref().unchecked_ref());
            socket.on_close(closed.as_ref().unchecked_ref());
            SOCKET_CALLBACKS.with(|slot| {
                let mut slot = slot.borrow_mut();
                slot.push(opened);
                slot.push(closed);
            });
        }

        fn perform(&self, call: SocketCall) -> pagesync_core::Result<()> {
            let result = match call {
                SocketCall::ConnectLiveSocket => self.live_socket.connect(),
                SocketCall::ReplaceWithLongPoll => {
                    let long_poll = global(PHOENIX_GLOBAL)
                        .and_then(|phoenix| member(&phoenix, LONG_POLL_CLASS))
                        .map_err(PageSyncError::Transport)?;
                    self.live_socket.socket().replace_transport(&long_poll)
                }
                SocketCall::ConnectSocket => self.live_socket.socket().connect_socket(),
            };
            result.map_err(|error| PageSyncError::Transport(format!("{call:?} threw: {error:?}")))
        }

        pub(super) fn push_dismiss(&self, request: &DismissRequest) {
            let Some(element) = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&request.element_id))
            else {
                log::debug!("notification {} left before dismissal", request.element_id);
                return;
            };
            if self
                .live_socket
                .exec_js(&element, &dismiss_command(request))
                .is_err()
            {
                log::warn!("failed to push {} for {}", request.event, request.element_id);
            }
        }
    }

    impl PushTransport for LiveSocketTransport {
        fn open(&self, kind: TransportKind) -> pagesync_core::Result<()> {
            ACTIVE_TRANSPORT.with(|active| active.set(kind));
            for call in open_sequence(kind) {
                self.perform(*call)?;
            }
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.live_socket.is_connected()
        }
    }

    pub(super) struct NavigatorClipboard;

    #[async_trait(?Send)]
    impl ClipboardSink for NavigatorClipboard {
        async fn write_text(&self, text: &str) -> pagesync_core::Result<()> {
            let window = web_sys::window()
                .ok_or_else(|| PageSyncError::Clipboard("window is unavailable".to_string()))?;
            let clipboard = member(&window.navigator(), "clipboard")
                .map_err(PageSyncError::Clipboard)?;
            let write_text = member(&clipboard, "writeText")
                .map_err(PageSyncError::Clipboard)?
                .dyn_into::<Function>()
                .map_err(|_| PageSyncError::Clipboard("writeText is not callable".to_string()))?;
            let promise = write_text
                .call1(&clipboard, &JsValue::from_str(text))
                .map_err(|error| PageSyncError::Clipboard(format!("{error:?}")))?
                .dyn_into::<js_sys::Promise>()
                .map_err(|_| PageSyncError::Clipboard("writeText returned no promise".to_string()))?;
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|error| PageSyncError::Clipboard(format!("{error:?}")))
        }
    }

    fn number_property(target: &JsValue, name: &str) -> Option<f64> {
        Reflect::get(target, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.as_f64())
    }

    pub(super) struct WindowPopupHost;

    struct WindowPopup {
        window: web_sys::Window,
    }

    impl PopupWindow for WindowPopup {
        fn is_closed(&self) -> bool {
            self.window.closed().unwrap_or(true)
        }
    }

    impl PopupHost for WindowPopupHost {
        fn geometry(&self) -> ScreenGeometry {
            let Some(window) = web_sys::window() else {
                return ScreenGeometry::default();
            };
            let screen = Reflect::get(&window, &JsValue::from_str("screen")).unwrap_or(JsValue::NULL);
            ScreenGeometry {
                screen_x: number_property(&window, "screenX"),
                screen_left: number_property(&window, "screenLeft"),
                screen_y: number_property(&window, "screenY"),
                screen_top: number_property(&window, "screenTop"),
                avail_width: number_property(&screen, "availWidth"),
                avail_height: number_property(&screen, "availHeight"),
                width: number_property(&screen, "width").unwrap_or_default(),
                height: number_property(&screen, "height").unwrap_or_default(),
            }
        }

        fn open(&self, url: &str, name: &str, features: &str) -> Option<Rc<dyn PopupWindow>> {
            let popup = web_sys::window()?
                .open_with_url_and_target_and_features(url, name, features)
                .ok()
                .flatten()?;
            let popup: Rc<dyn PopupWindow> = Rc::new(WindowPopup { window: popup });
            Some(popup)
        }

        fn navigate(&self, url: &str) {
            if let Some(window) = web_sys::window() {
                if window.location().set_href(url).is_err() {
                    log::warn!("failed to navigate to {url}");
                }
            }
        }

        fn reload(&self) {
            if let Some(window) = web_sys::window() {
                let _ = window.location().reload();
            }
        }
    }
