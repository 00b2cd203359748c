//! In-memory ports and a virtual-clock scheduler.
//!
//! Everything here is deterministic: timers only fire from
//! [`ManualScheduler::advance`], frames only from
//! [`ManualScheduler::run_frames`], and spawned futures only from
//! [`ManualScheduler::run_until_stalled`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use crate::bridges::{ClipboardSink, DownloadHost, TransientAnchor};
use crate::connection::{ConnectionProbe, PushTransport, TransportKind};
use crate::error::{PageSyncError, Result};
use crate::notification::{DismissRequest, NotificationElement};
use crate::popup::{PopupHost, PopupWindow, ScreenGeometry};
use crate::progress::ProgressView;
use crate::runtime::Ports;
use crate::scheduler::Scheduler;
use crate::sticky_header::{HeaderDom, HeaderMode, HeaderView, OverlayState, Viewport};
use crate::teardown::Teardown;
use crate::theme::{DurableStore, Theme, ThemeDom, ThemeRoot, ThemeToggleView, ToggleAppearance};

type Handler = Rc<RefCell<Box<dyn FnMut()>>>;

/// Listener list with removal by id, shared by the fake DOM nodes.
#[derive(Default)]
struct Listeners {
    entries: Rc<RefCell<Vec<(u64, Handler)>>>,
    next_id: Cell<u64>,
}

impl Listeners {
    fn add(&self, handler: Box<dyn FnMut()>) -> Teardown {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(handler))));
        let entries = Rc::downgrade(&self.entries);
        Teardown::new(move || {
            if let Some(entries) = entries.upgrade() {
                entries.borrow_mut().retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    fn fire(&self) {
        let handlers: Vec<Handler> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            (*handler.borrow_mut())();
        }
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

enum TimerTask {
    Once(Box<dyn FnOnce()>),
    Repeat(Handler),
}

struct TimerEntry {
    due: Duration,
    period: Option<Duration>,
    task: Option<TimerTask>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<u64, TimerEntry>,
    frames: BTreeMap<u64, Box<dyn FnOnce()>>,
}

impl Clock {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Single-threaded scheduler driven by an explicit virtual clock.
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            clock: Rc::new(RefCell::new(Clock::default())),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Timers and intervals that are still armed.
    pub fn active_timers(&self) -> usize {
        self.clock.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.clock.borrow().frames.len()
    }

    /// Moves the clock forward, firing every timer that falls due in order.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.borrow().now + by;
        while let Some((id, task)) = self.next_due(target) {
            match task {
                TimerTask::Once(task) => task(),
                TimerTask::Repeat(handler) => {
                    (*handler.borrow_mut())();
                    // Put the handler back unless the interval cancelled itself.
                    if let Some(entry) = self.clock.borrow_mut().timers.get_mut(&id) {
                        entry.task = Some(TimerTask::Repeat(handler));
                    }
                }
            }
        }
        self.clock.borrow_mut().now = target;
    }

    fn next_due(&self, target: Duration) -> Option<(u64, TimerTask)> {
        let mut clock = self.clock.borrow_mut();
        let (id, due) = clock
            .timers
            .iter()
            .filter(|(_, entry)| entry.due <= target && entry.task.is_some())
            .min_by_key(|(id, entry)| (entry.due, **id))
            .map(|(id, entry)| (*id, entry.due))?;
        clock.now = due;
        match clock.timers.get(&id)?.period {
            Some(period) => {
                let entry = clock.timers.get_mut(&id)?;
                entry.due = due + period;
                entry.task.take().map(|task| (id, task))
            }
            None => clock
                .timers
                .remove(&id)
                .and_then(|entry| entry.task)
                .map(|task| (id, task)),
        }
    }

    /// Runs every frame callback requested so far. Frames requested while
    /// running wait for the next call.
    pub fn run_frames(&self) -> usize {
        let frames = std::mem::take(&mut self.clock.borrow_mut().frames);
        let count = frames.len();
        for (_, frame) in frames {
            frame();
        }
        count
    }

    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    fn cancel_timer(clock: &Weak<RefCell<Clock>>, id: u64) -> Teardown {
        let clock = clock.clone();
        Teardown::new(move || {
            if let Some(clock) = clock.upgrade() {
                clock.borrow_mut().timers.remove(&id);
            }
        })
    }
}

impl Scheduler for ManualScheduler {
    fn timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Teardown {
        let id = {
            let mut clock = self.clock.borrow_mut();
            let id = clock.allocate_id();
            let due = clock.now + delay;
            clock.timers.insert(
                id,
                TimerEntry {
                    due,
                    period: None,
                    task: Some(TimerTask::Once(task)),
                },
            );
            id
        };
        Self::cancel_timer(&Rc::downgrade(&self.clock), id)
    }

    fn interval(&self, period: Duration, task: Box<dyn FnMut()>) -> Teardown {
        let period = period.max(Duration::from_millis(1));
        let id = {
            let mut clock = self.clock.borrow_mut();
            let id = clock.allocate_id();
            let due = clock.now + period;
            clock.timers.insert(
                id,
                TimerEntry {
                    due,
                    period: Some(period),
                    task: Some(TimerTask::Repeat(Rc::new(RefCell::new(task)))),
                },
            );
            id
        };
        Self::cancel_timer(&Rc::downgrade(&self.clock), id)
    }

    fn animation_frame(&self, task: Box<dyn FnOnce()>) -> Teardown {
        let id = {
            let mut clock = self.clock.borrow_mut();
            let id = clock.allocate_id();
            clock.frames.insert(id, task);
            id
        };
        let clock = Rc::downgrade(&self.clock);
        Teardown::new(move || {
            if let Some(clock) = clock.upgrade() {
                clock.borrow_mut().frames.remove(&id);
            }
        })
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(error) = self.spawner.spawn_local(task) {
            log::warn!("failed to spawn task: {error}");
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<BTreeMap<String, String>>,
    writes: Cell<usize>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.get() {
            return Err(PageSyncError::StoreRead {
                key: key.to_string(),
                message: "storage disabled".to_string(),
            });
        }
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.get() {
            return Err(PageSyncError::StoreWrite {
                key: key.to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        self.writes.set(self.writes.get() + 1);
        self.insert(key, value);
        Ok(())
    }
}

pub struct FakeThemeRoot {
    theme: Cell<Theme>,
    restyles: Cell<usize>,
}

impl FakeThemeRoot {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme: Cell::new(theme),
            restyles: Cell::new(0),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme.get()
    }

    /// Simulates a server patch re-rendering the root with its own class.
    pub fn overwrite(&self, theme: Theme) {
        self.theme.set(theme);
    }

    pub fn restyle_count(&self) -> usize {
        self.restyles.get()
    }
}

impl ThemeRoot for FakeThemeRoot {
    fn current_theme(&self) -> Theme {
        self.theme.get()
    }

    fn apply_theme(&self, theme: Theme) -> Result<()> {
        self.theme.set(theme);
        Ok(())
    }

    fn force_restyle(&self) {
        self.restyles.set(self.restyles.get() + 1);
    }
}

#[derive(Default)]
pub struct FakeToggle {
    appearance: RefCell<Option<ToggleAppearance>>,
    listeners: Listeners,
}

impl FakeToggle {
    pub fn appearance(&self) -> Option<ToggleAppearance> {
        self.appearance.borrow().clone()
    }

    pub fn label(&self) -> Option<&'static str> {
        self.appearance.borrow().as_ref().map(|appearance| appearance.label)
    }

    pub fn click(&self) {
        self.listeners.fire();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ThemeToggleView for FakeToggle {
    fn render(&self, appearance: &ToggleAppearance) {
        *self.appearance.borrow_mut() = Some(appearance.clone());
    }

    fn on_click(&self, handler: Box<dyn FnMut()>) -> Teardown {
        self.listeners.add(handler)
    }
}

pub struct FakeThemeDom {
    toggle: RefCell<Rc<FakeToggle>>,
    present: Cell<bool>,
}

impl FakeThemeDom {
    pub fn new(with_toggle: bool) -> Self {
        Self {
            toggle: RefCell::new(Rc::new(FakeToggle::default())),
            present: Cell::new(with_toggle),
        }
    }

    pub fn toggle(&self) -> Rc<FakeToggle> {
        self.toggle.borrow().clone()
    }

    /// Swaps in a fresh toggle node, as a DOM patch would.
    pub fn replace_toggle(&self) {
        *self.toggle.borrow_mut() = Rc::new(FakeToggle::default());
    }

    pub fn set_present(&self, present: bool) {
        self.present.set(present);
    }
}

impl ThemeDom for FakeThemeDom {
    fn find_toggle(&self) -> Option<Rc<dyn ThemeToggleView>> {
        if !self.present.get() {
            return None;
        }
        let toggle: Rc<dyn ThemeToggleView> = self.toggle();
        Some(toggle)
    }
}

pub struct FakeHeader {
    mode: Cell<HeaderMode>,
    suppressed: Cell<bool>,
}

impl Default for FakeHeader {
    fn default() -> Self {
        Self {
            mode: Cell::new(HeaderMode::Sticky),
            suppressed: Cell::new(false),
        }
    }
}

impl FakeHeader {
    pub fn mode(&self) -> HeaderMode {
        self.mode.get()
    }

    pub fn suppressed(&self) -> bool {
        self.suppressed.get()
    }
}

impl HeaderView for FakeHeader {
    fn set_mode(&self, mode: HeaderMode) {
        self.mode.set(mode);
    }

    fn set_suppressed(&self, suppressed: bool) {
        self.suppressed.set(suppressed);
    }
}

#[derive(Default)]
pub struct FakeHeaderDom {
    header: RefCell<Option<Rc<FakeHeader>>>,
}

impl FakeHeaderDom {
    pub fn with_header() -> Self {
        Self {
            header: RefCell::new(Some(Rc::new(FakeHeader::default()))),
        }
    }

    pub fn header(&self) -> Option<Rc<FakeHeader>> {
        self.header.borrow().clone()
    }

    pub fn replace_header(&self) {
        *self.header.borrow_mut() = Some(Rc::new(FakeHeader::default()));
    }

    pub fn remove_header(&self) {
        self.header.borrow_mut().take();
    }
}

impl HeaderDom for FakeHeaderDom {
    fn find_header(&self) -> Option<Rc<dyn HeaderView>> {
        let header = self.header()?;
        let view: Rc<dyn HeaderView> = header;
        Some(view)
    }
}

pub struct FakeViewport {
    scroll_y: Cell<f64>,
    overlay: Cell<OverlayState>,
    listeners: Listeners,
}

impl FakeViewport {
    pub fn new(scroll_y: f64) -> Self {
        Self {
            scroll_y: Cell::new(scroll_y),
            overlay: Cell::new(OverlayState::Absent),
            listeners: Listeners::default(),
        }
    }

    pub fn scroll_to(&self, scroll_y: f64) {
        self.scroll_y.set(scroll_y);
        self.listeners.fire();
    }

    pub fn set_overlay(&self, overlay: OverlayState) {
        self.overlay.set(overlay);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Viewport for FakeViewport {
    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn overlay(&self) -> OverlayState {
        self.overlay.get()
    }

    fn on_scroll(&self, handler: Box<dyn FnMut()>) -> Teardown {
        self.listeners.add(handler)
    }
}

pub struct FakeConnectionProbe {
    connected: Cell<bool>,
}

impl FakeConnectionProbe {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Cell::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }
}

impl ConnectionProbe for FakeConnectionProbe {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }
}

pub struct FakeNotification {
    id: String,
    attributes: BTreeMap<String, String>,
    content: RefCell<String>,
    attached: Cell<bool>,
}

impl FakeNotification {
    pub fn new(id: &str, kind: Option<&str>, delay: Option<&str>) -> Rc<Self> {
        let mut attributes = BTreeMap::new();
        if let Some(kind) = kind {
            attributes.insert("data-kind".to_string(), kind.to_string());
        }
        if let Some(delay) = delay {
            attributes.insert("data-delay".to_string(), delay.to_string());
        }
        Rc::new(Self {
            id: id.to_string(),
            attributes,
            content: RefCell::new(String::new()),
            attached: Cell::new(true),
        })
    }

    pub fn detach(&self) {
        self.attached.set(false);
    }

    pub fn set_content(&self, content: &str) {
        *self.content.borrow_mut() = content.to_string();
    }
}

impl NotificationElement for FakeNotification {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn is_attached(&self) -> bool {
        self.attached.get()
    }

    fn fingerprint(&self) -> String {
        format!("{:?}|{}", self.attributes, self.content.borrow())
    }
}

pub fn as_element(notification: &Rc<FakeNotification>) -> Rc<dyn NotificationElement> {
    notification.clone()
}

#[derive(Default)]
pub struct FakeTransport {
    opened: RefCell<Vec<TransportKind>>,
    refused: RefCell<Vec<TransportKind>>,
    open: Cell<bool>,
}

impl FakeTransport {
    pub fn set_open(&self, open: bool) {
        self.open.set(open);
    }

    pub fn opened(&self) -> Vec<TransportKind> {
        self.opened.borrow().clone()
    }

    pub fn refuse(&self, kind: TransportKind) {
        self.refused.borrow_mut().push(kind);
    }
}

impl PushTransport for FakeTransport {
    fn open(&self, kind: TransportKind) -> Result<()> {
        self.opened.borrow_mut().push(kind);
        if self.refused.borrow().contains(&kind) {
            return Err(PageSyncError::Transport(format!(
                "{} unavailable",
                kind.as_str()
            )));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }
}

#[derive(Default)]
pub struct FakeProgressView {
    visible: Cell<bool>,
    shows: Cell<usize>,
}

impl FakeProgressView {
    pub fn shows(&self) -> usize {
        self.shows.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

impl ProgressView for FakeProgressView {
    fn show(&self) {
        self.shows.set(self.shows.get() + 1);
        self.visible.set(true);
    }

    fn hide(&self) {
        self.visible.set(false);
    }
}

#[derive(Default)]
pub struct FakePopupWindow {
    closed: Cell<bool>,
}

impl FakePopupWindow {
    pub fn close(&self) {
        self.closed.set(true);
    }
}

impl PopupWindow for FakePopupWindow {
    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

pub struct FakePopupHost {
    allow: bool,
    geometry: ScreenGeometry,
    opened: RefCell<Vec<(String, String, String)>>,
    windows: RefCell<Vec<Rc<FakePopupWindow>>>,
    navigations: RefCell<Vec<String>>,
    reloads: Cell<usize>,
}

impl FakePopupHost {
    fn with(allow: bool) -> Self {
        Self {
            allow,
            geometry: ScreenGeometry {
                screen_x: Some(0.0),
                screen_y: Some(0.0),
                avail_width: Some(1920.0),
                avail_height: Some(1080.0),
                width: 1920.0,
                height: 1080.0,
                ..ScreenGeometry::default()
            },
            opened: RefCell::new(Vec::new()),
            windows: RefCell::new(Vec::new()),
            navigations: RefCell::new(Vec::new()),
            reloads: Cell::new(0),
        }
    }

    pub fn allowing() -> Self {
        Self::with(true)
    }

    /// A host whose browser blocks every popup.
    pub fn blocking() -> Self {
        Self::with(false)
    }

    /// `(url, window name, features)` for every popup opened.
    pub fn opened(&self) -> Vec<(String, String, String)> {
        self.opened.borrow().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.get()
    }

    pub fn close_last_popup(&self) {
        if let Some(window) = self.windows.borrow().last() {
            window.close();
        }
    }
}

impl PopupHost for FakePopupHost {
    fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }

    fn open(&self, url: &str, name: &str, features: &str) -> Option<Rc<dyn PopupWindow>> {
        if !self.allow {
            return None;
        }
        self.opened
            .borrow_mut()
            .push((url.to_string(), name.to_string(), features.to_string()));
        let window = Rc::new(FakePopupWindow::default());
        self.windows.borrow_mut().push(window.clone());
        let window: Rc<dyn PopupWindow> = window;
        Some(window)
    }

    fn navigate(&self, url: &str) {
        self.navigations.borrow_mut().push(url.to_string());
    }

    fn reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    contents: RefCell<Option<String>>,
    attempts: Cell<usize>,
    fail: bool,
}

impl FakeClipboard {
    /// A clipboard whose permission is always denied.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

#[async_trait(?Send)]
impl ClipboardSink for FakeClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        if self.fail {
            return Err(PageSyncError::Clipboard("permission denied".to_string()));
        }
        *self.contents.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct DownloadState {
    next_url: usize,
    blobs: BTreeMap<String, (Vec<u8>, String)>,
    anchors: usize,
    clicked: Vec<(String, Vec<u8>, String)>,
}

#[derive(Default)]
pub struct FakeDownloadHost {
    state: Rc<RefCell<DownloadState>>,
    fail_clicks: bool,
}

impl FakeDownloadHost {
    pub fn failing_clicks() -> Self {
        Self {
            fail_clicks: true,
            ..Self::default()
        }
    }

    /// `(filename, bytes, mime type)` of every completed download.
    pub fn clicked(&self) -> Vec<(String, Vec<u8>, String)> {
        self.state.borrow().clicked.clone()
    }

    /// Object URLs created and not yet revoked.
    pub fn live_urls(&self) -> Vec<String> {
        self.state.borrow().blobs.keys().cloned().collect()
    }

    pub fn anchors_in_document(&self) -> usize {
        self.state.borrow().anchors
    }

    pub fn created(&self) -> usize {
        self.state.borrow().next_url
    }
}

struct FakeAnchor {
    state: Rc<RefCell<DownloadState>>,
    url: String,
    filename: String,
    fail: bool,
}

impl TransientAnchor for FakeAnchor {
    fn click(&self) -> Result<()> {
        if self.fail {
            return Err(PageSyncError::Download("click was blocked".to_string()));
        }
        let mut state = self.state.borrow_mut();
        let Some((data, mime_type)) = state.blobs.get(&self.url).cloned() else {
            return Err(PageSyncError::Download(format!("{} was revoked", self.url)));
        };
        state.clicked.push((self.filename.clone(), data, mime_type));
        Ok(())
    }

    fn remove(&self) {
        let mut state = self.state.borrow_mut();
        state.anchors = state.anchors.saturating_sub(1);
    }
}

impl DownloadHost for FakeDownloadHost {
    fn create_object_url(&self, data: &[u8], mime_type: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.next_url += 1;
        let url = format!("blob:fake/{}", state.next_url);
        state
            .blobs
            .insert(url.clone(), (data.to_vec(), mime_type.to_string()));
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        self.state.borrow_mut().blobs.remove(url);
    }

    fn append_anchor(&self, url: &str, filename: &str) -> Result<Box<dyn TransientAnchor>> {
        self.state.borrow_mut().anchors += 1;
        Ok(Box::new(FakeAnchor {
            state: self.state.clone(),
            url: url.to_string(),
            filename: filename.to_string(),
            fail: self.fail_clicks,
        }))
    }
}

/// Every fake a [`crate::runtime::PageRuntime`] needs, pre-wired.
pub struct FakePage {
    pub scheduler: Rc<ManualScheduler>,
    pub transport: Rc<FakeTransport>,
    pub store: Rc<MemoryStore>,
    pub theme_root: Rc<FakeThemeRoot>,
    pub theme_dom: Rc<FakeThemeDom>,
    pub header_dom: Rc<FakeHeaderDom>,
    pub viewport: Rc<FakeViewport>,
    pub progress: Rc<FakeProgressView>,
    pub popup: Rc<FakePopupHost>,
    pub clipboard: Rc<FakeClipboard>,
    pub download: Rc<FakeDownloadHost>,
    pub dismissed: Rc<RefCell<Vec<DismissRequest>>>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    /// A page with a toggle, a header and an empty store, rendered dark.
    pub fn new() -> Self {
        Self {
            scheduler: Rc::new(ManualScheduler::new()),
            transport: Rc::new(FakeTransport::default()),
            store: Rc::new(MemoryStore::default()),
            theme_root: Rc::new(FakeThemeRoot::new(Theme::Dark)),
            theme_dom: Rc::new(FakeThemeDom::new(true)),
            header_dom: Rc::new(FakeHeaderDom::with_header()),
            viewport: Rc::new(FakeViewport::new(0.0)),
            progress: Rc::new(FakeProgressView::default()),
            popup: Rc::new(FakePopupHost::allowing()),
            clipboard: Rc::new(FakeClipboard::default()),
            download: Rc::new(FakeDownloadHost::default()),
            dismissed: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn ports(&self) -> Ports {
        let dismissed = self.dismissed.clone();
        Ports {
            scheduler: self.scheduler.clone(),
            transport: self.transport.clone(),
            store: self.store.clone(),
            theme_root: self.theme_root.clone(),
            theme_dom: self.theme_dom.clone(),
            header_dom: self.header_dom.clone(),
            viewport: self.viewport.clone(),
            progress: self.progress.clone(),
            popup: self.popup.clone(),
            clipboard: self.clipboard.clone(),
            download: self.download.clone(),
            dismiss: Rc::new(move |request: DismissRequest| dismissed.borrow_mut().push(request)),
        }
    }
}
