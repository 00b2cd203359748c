use super::*;

    fn document() -> Option<web_sys::Document> {
        web_sys::window().and_then(|window| window.document())
    }

    fn dom_error(context: &str, error: JsValue) -> PageSyncError {
        PageSyncError::dom(format!("{context}: {error:?}"))
    }

    /// Adds or removes a whitespace-separated class list.
    fn apply_classes(element: &Element, add: &str, remove: &str) {
        let list = element.class_list();
        for class in remove.split_whitespace() {
            let _ = list.remove_1(class);
        }
        for class in add.split_whitespace() {
            let _ = list.add_1(class);
        }
    }

    /// Registers `handler` for `event` on `target`; the teardown unregisters it.
    fn listen(
        target: &web_sys::EventTarget,
        event: &'static str,
        mut handler: Box<dyn FnMut()>,
    ) -> Teardown {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| handler()));
        if target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .is_err()
        {
            log::warn!("failed to listen for {event}");
            return Teardown::noop();
        }
        let target = target.clone();
        Teardown::new(move || {
            let _ = target.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
        })
    }

    pub(super) struct LocalStorageStore;

    impl LocalStorageStore {
        fn storage() -> pagesync_core::Result<web_sys::Storage> {
            web_sys::window()
                .and_then(|window| window.local_storage().ok().flatten())
                .ok_or(PageSyncError::StoreUnavailable)
        }
    }

    impl DurableStore for LocalStorageStore {
        fn get(&self, key: &str) -> pagesync_core::Result<Option<String>> {
            Self::storage()?
                .get_item(key)
                .map_err(|error| PageSyncError::StoreRead {
                    key: key.to_string(),
                    message: format!("{error:?}"),
                })
        }

        fn set(&self, key: &str, value: &str) -> pagesync_core::Result<()> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|error| PageSyncError::StoreWrite {
                    key: key.to_string(),
                    message: format!("{error:?}"),
                })
        }
    }

    /// Theme marker on `<html>`.
    pub(super) struct DocumentThemeRoot {
        dark_class: String,
    }

    impl DocumentThemeRoot {
        pub(super) fn new(dark_class: &str) -> Self {
            Self {
                dark_class: dark_class.to_string(),
            }
        }

        fn root() -> Option<Element> {
            document().and_then(|document| document.document_element())
        }
    }

    impl ThemeRoot for DocumentThemeRoot {
        fn current_theme(&self) -> Theme {
            match Self::root() {
                Some(root) if root.class_list().contains(&self.dark_class) => Theme::Dark,
                _ => Theme::Light,
            }
        }

        fn apply_theme(&self, theme: Theme) -> pagesync_core::Result<()> {
            let root = Self::root().ok_or_else(|| PageSyncError::dom("document element is missing"))?;
            let list = root.class_list();
            match theme {
                Theme::Dark => list.add_1(&self.dark_class),
                Theme::Light => list.remove_1(&self.dark_class),
            }
            .map_err(|error| dom_error("failed to update theme class", error))
        }

        fn force_restyle(&self) {
            let Some(root) = Self::root().and_then(|root| root.dyn_into::<HtmlElement>().ok()) else {
                return;
            };
            let style = root.style();
            let _ = style.set_property("display", "none");
            let _ = root.offset_height();
            let _ = style.set_property("display", "");
        }
    }

    pub(super) struct DocumentThemeDom {
        toggle_id: String,
        label_id: String,
    }

    impl DocumentThemeDom {
        pub(super) fn new(config: &pagesync_core::config::ThemeConfig) -> Self {
            Self {
                toggle_id: config.toggle_id.clone(),
                label_id: config.label_id.clone(),
            }
        }
    }

    impl ThemeDom for DocumentThemeDom {
        fn find_toggle(&self) -> Option<Rc<dyn ThemeToggleView>> {
            let document = document()?;
            let toggle = document.get_element_by_id(&self.toggle_id)?;
            let label = document.get_element_by_id(&self.label_id)?;
            let knob = toggle.query_selector(TOGGLE_KNOB_SELECTOR).ok().flatten();
            let view: Rc<dyn ThemeToggleView> = Rc::new(DomThemeToggle { toggle, knob, label });
            Some(view)
        }
    }

    struct DomThemeToggle {
        toggle: Element,
        knob: Option<Element>,
        label: Element,
    }

    impl ThemeToggleView for DomThemeToggle {
        fn render(&self, appearance: &ToggleAppearance) {
            if let Some(knob) = &self.knob {
                apply_classes(knob, &appearance.knob_add, &appearance.knob_remove);
            }
            apply_classes(&self.toggle, &appearance.track_add, &appearance.track_remove);
            self.label.set_text_content(Some(appearance.label));
        }

        fn on_click(&self, handler: Box<dyn FnMut()>) -> Teardown {
            listen(&self.toggle, "click", handler)
        }
    }

    pub(super) struct DocumentHeaderDom {
        element_id: String,
        scrolling_class: String,
        suppressed_class: String,
    }

    impl DocumentHeaderDom {
        pub(super) fn new(config: &pagesync_core::config::HeaderConfig) -> Self {
            Self {
                element_id: config.element_id.clone(),
                scrolling_class: config.scrolling_class.clone(),
                suppressed_class: config.suppressed_class.clone(),
            }
        }
    }

    impl HeaderDom for DocumentHeaderDom {
        fn find_header(&self) -> Option<Rc<dyn HeaderView>> {
            let element = document()?.get_element_by_id(&self.element_id)?;
            let view: Rc<dyn HeaderView> = Rc::new(DomHeaderView {
                element,
                scrolling_class: self.scrolling_class.clone(),
                suppressed_class: self.suppressed_class.clone(),
            });
            Some(view)
        }
    }

    struct DomHeaderView {
        element: Element,
        scrolling_class: String,
        suppressed_class: String,
    }

    impl DomHeaderView {
        fn toggle_class(&self, class: &str, on: bool) {
            let list = self.element.class_list();
            let _ = if on {
                list.add_1(class)
            } else {
                list.remove_1(class)
            };
        }
    }

    impl HeaderView for DomHeaderView {
        fn set_mode(&self, mode: HeaderMode) {
            self.toggle_class(&self.scrolling_class, mode == HeaderMode::Scrolling);
        }

        fn set_suppressed(&self, suppressed: bool) {
            self.toggle_class(&self.suppressed_class, suppressed);
        }
    }

    pub(super) struct WindowViewport {
        overlay_selector: Option<String>,
        overlay_open_selector: String,
    }

    impl WindowViewport {
        pub(super) fn new(config: &pagesync_core::config::HeaderConfig) -> Self {
            Self {
                overlay_selector: config.overlay_selector.clone(),
                overlay_open_selector: config.overlay_open_selector.clone(),
            }
        }
    }

    impl Viewport for WindowViewport {
        fn scroll_y(&self) -> f64 {
            web_sys::window()
                .and_then(|window| window.scroll_y().ok())
                .unwrap_or_default()
        }

        fn overlay(&self) -> OverlayState {
            let (Some(selector), Some(document)) = (&self.overlay_selector, document()) else {
                return OverlayState::Absent;
            };
            let Some(overlay) = document.query_selector(selector).ok().flatten() else {
                return OverlayState::Absent;
            };
            match overlay.query_selector(&self.overlay_open_selector) {
                Ok(Some(_)) => OverlayState::Open,
                _ => OverlayState::Closed,
            }
        }

        fn on_scroll(&self, handler: Box<dyn FnMut()>) -> Teardown {
            match web_sys::window() {
                Some(window) => listen(&window, "scroll", handler),
                None => Teardown::noop(),
            }
        }
    }

    /// Thin bar pinned to the top of the viewport.
    pub(super) struct TopBarProgress {
        element_id: String,
        bar_color: String,
        shadow_color: String,
    }

    impl TopBarProgress {
        pub(super) fn new(config: &pagesync_core::config::ProgressConfig) -> Self {
            Self {
                element_id: config.element_id.clone(),
                bar_color: config.bar_color.clone(),
                shadow_color: config.shadow_color.clone(),
            }
        }

        fn bar(&self) -> Result<HtmlElement, JsValue> {
            let document = document().ok_or_else(|| JsValue::from_str("document is unavailable"))?;
            if let Some(existing) = document.get_element_by_id(&self.element_id) {
                return existing.dyn_into::<HtmlElement>().map_err(JsValue::from);
            }
            let bar = document.create_element("div")?.dyn_into::<HtmlElement>()?;
            bar.set_id(&self.element_id);
            let style = bar.style();
            style.set_property("position", "fixed")?;
            style.set_property("top", "0")?;
            style.set_property("left", "0")?;
            style.set_property("right", "0")?;
            style.set_property("height", PROGRESS_BAR_HEIGHT)?;
            style.set_property("z-index", PROGRESS_BAR_Z_INDEX)?;
            style.set_property("background", &self.bar_color)?;
            style.set_property("box-shadow", &format!("0 0 10px {}", self.shadow_color))?;
            style.set_property("display", "none")?;
            document
                .body()
                .ok_or_else(|| JsValue::from_str("document body is unavailable"))?
                .append_child(&bar)?;
            Ok(bar)
        }

        fn set_display(&self, display: &str) {
            match self.bar() {
                Ok(bar) => {
                    let _ = bar.style().set_property("display", display);
                }
                Err(error) => log::warn!("progress bar unavailable: {error:?}"),
            }
        }
    }

    impl ProgressView for TopBarProgress {
        fn show(&self) {
            self.set_display("block");
        }

        fn hide(&self) {
            self.set_display("none");
        }
    }

    struct DomNotification {
        element: Element,
    }

    impl NotificationElement for DomNotification {
        fn id(&self) -> String {
            self.element.id()
        }

        fn attribute(&self, name: &str) -> Option<String> {
            self.element.get_attribute(name)
        }

        fn is_attached(&self) -> bool {
            self.element.is_connected()
        }

        fn fingerprint(&self) -> String {
            self.element.outer_html()
        }
    }

    pub(super) fn find_notifications(
        selector: &str,
    ) -> Result<Vec<Rc<dyn NotificationElement>>, String> {
        let document = document().ok_or_else(|| "document is unavailable".to_string())?;
        let nodes = document
            .query_selector_all(selector)
            .map_err(|_| format!("invalid notification selector `{selector}`"))?;
        let mut found: Vec<Rc<dyn NotificationElement>> = Vec::with_capacity(nodes.length() as usize);
        for index in 0..nodes.length() {
            let Some(element) = nodes.get(index).and_then(|node| node.dyn_into::<Element>().ok())
            else {
                continue;
            };
            found.push(Rc::new(DomNotification { element }));
        }
        Ok(found)
    }

    pub(super) struct BlobDownloadHost;

    impl DownloadHost for BlobDownloadHost {
        fn create_object_url(&self, data: &[u8], mime_type: &str) -> pagesync_core::Result<String> {
            let bytes = Uint8Array::from(data);
            let options = web_sys::BlobPropertyBag::new();
            options.set_type(mime_type);
            let blob =
                web_sys::Blob::new_with_u8_array_sequence_and_options(&Array::of1(&bytes), &options)
                    .map_err(|error| PageSyncError::Download(format!("{error:?}")))?;
            web_sys::Url::create_object_url_with_blob(&blob)
                .map_err(|error| PageSyncError::Download(format!("{error:?}")))
        }

        fn revoke_object_url(&self, url: &str) {
            let _ = web_sys::Url::revoke_object_url(url);
        }

        fn append_anchor(
            &self,
            url: &str,
            filename: &str,
        ) -> pagesync_core::Result<Box<dyn TransientAnchor>> {
            let document = document().ok_or_else(|| PageSyncError::dom("document is unavailable"))?;
            let anchor = document
                .create_element("a")
                .and_then(|element| element.dyn_into::<HtmlAnchorElement>().map_err(JsValue::from))
                .map_err(|error| dom_error("failed to create anchor", error))?;
            anchor.set_href(url);
            anchor.set_download(filename);
            document
                .body()
                .ok_or_else(|| PageSyncError::dom("document body is unavailable"))?
                .append_child(&anchor)
                .map_err(|error| dom_error("failed to attach anchor", error))?;
            Ok(Box::new(DomAnchor { anchor }))
        }
    }

    struct DomAnchor {
        anchor: HtmlAnchorElement,
    }

    impl TransientAnchor for DomAnchor {
        fn click(&self) -> pagesync_core::Result<()> {
            self.anchor.click();
            Ok(())
        }

        fn remove(&self) {
            self.anchor.remove();
        }
    }
