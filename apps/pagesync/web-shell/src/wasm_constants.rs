pub(crate) const CONFIG_GLOBAL: &str = "__PAGESYNC_CONFIG__";
pub(crate) const LIVE_VIEW_GLOBAL: &str = "LiveView";
pub(crate) const PHOENIX_GLOBAL: &str = "Phoenix";
pub(crate) const LIVE_SOCKET_CLASS: &str = "LiveSocket";
pub(crate) const SOCKET_CLASS: &str = "Socket";
pub(crate) const LONG_POLL_CLASS: &str = "LongPoll";
pub(crate) const LIVE_SOCKET_WINDOW_PROPERTY: &str = "liveSocket";
pub(crate) const TOGGLE_KNOB_SELECTOR: &str = "span:last-child";
pub(crate) const PROGRESS_BAR_HEIGHT: &str = "3px";
pub(crate) const PROGRESS_BAR_Z_INDEX: &str = "100001";
