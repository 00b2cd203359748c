use serde::{Deserialize, Serialize};

use crate::error::{PageSyncError, Result};
use crate::theme::Theme;

const DEFAULT_LIVE_PATH: &str = "/live";
const DEFAULT_CSRF_META_NAME: &str = "csrf-token";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FALLBACK_AFTER_MS: u64 = 2_500;
const DEFAULT_PROGRESS_GRACE_MS: u64 = 300;
const DEFAULT_PROGRESS_BAR_COLOR: &str = "#29d";
const DEFAULT_PROGRESS_SHADOW_COLOR: &str = "rgba(0, 0, 0, .3)";
const DEFAULT_PROGRESS_ELEMENT_ID: &str = "pagesync-progress";
const DEFAULT_THEME_STORAGE_KEY: &str = "theme";
const DEFAULT_THEME_DARK_CLASS: &str = "dark";
const DEFAULT_THEME_TOGGLE_ID: &str = "theme-toggle";
const DEFAULT_THEME_LABEL_ID: &str = "theme-label";
const DEFAULT_HEADER_ELEMENT_ID: &str = "sticky-header";
const DEFAULT_HEADER_SCROLLING_CLASS: &str = "scrolling";
const DEFAULT_HEADER_SUPPRESSED_CLASS: &str = "no-sticky";
const DEFAULT_HEADER_OVERLAY_SELECTOR: &str = "[phx-click-away=\"close_search_dropdown\"]";
const DEFAULT_HEADER_OVERLAY_OPEN_SELECTOR: &str = ".absolute";
const DEFAULT_NOTIFICATION_SELECTOR: &str = "[phx-hook=\"AutoDismiss\"]";
const DEFAULT_NOTIFICATION_DELAY_MS: u64 = 5_000;
const DEFAULT_NOTIFICATION_DELAY_ATTRIBUTE: &str = "data-delay";
const DEFAULT_NOTIFICATION_KIND_ATTRIBUTE: &str = "data-kind";
const DEFAULT_NOTIFICATION_DISMISS_EVENT: &str = "lv:clear-flash";
const DEFAULT_POPUP_WIDTH: u32 = 500;
const DEFAULT_POPUP_HEIGHT: u32 = 600;
const DEFAULT_POPUP_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_POPUP_WINDOW_NAME: &str = "oauth-popup";
const DEFAULT_DOWNLOAD_MIME_TYPE: &str = "text/csv";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSyncConfig {
    pub live_path: String,
    pub csrf_meta_name: String,
    pub log_level: String,
    pub connection: ConnectionConfig,
    pub progress: ProgressConfig,
    pub theme: ThemeConfig,
    pub header: HeaderConfig,
    pub notifications: NotificationConfig,
    pub popup: PopupConfig,
    pub download: DownloadConfig,
    pub events: EventNames,
}

impl Default for PageSyncConfig {
    fn default() -> Self {
        Self {
            live_path: DEFAULT_LIVE_PATH.to_string(),
            csrf_meta_name: DEFAULT_CSRF_META_NAME.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            connection: ConnectionConfig::default(),
            progress: ProgressConfig::default(),
            theme: ThemeConfig::default(),
            header: HeaderConfig::default(),
            notifications: NotificationConfig::default(),
            popup: PopupConfig::default(),
            download: DownloadConfig::default(),
            events: EventNames::default(),
        }
    }
}

impl PageSyncConfig {
    /// Parses a (possibly partial) JSON config; missing fields keep defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| PageSyncError::Config(format!("failed to decode config: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.popup.width == 0 || self.popup.height == 0 {
            return Err(PageSyncError::Config(
                "popup dimensions must be positive".to_string(),
            ));
        }
        if self.popup.poll_interval_ms == 0 {
            return Err(PageSyncError::Config(
                "popup.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.theme.storage_key.trim().is_empty() {
            return Err(PageSyncError::Config(
                "theme.storage_key must not be empty".to_string(),
            ));
        }
        if self.theme.dark_class.trim().is_empty() {
            return Err(PageSyncError::Config(
                "theme.dark_class must not be empty".to_string(),
            ));
        }
        if let Some(empty) = self.events.all().iter().find(|name| name.trim().is_empty()) {
            return Err(PageSyncError::Config(format!(
                "event names must not be empty (got {empty:?})"
            )));
        }
        let level = self.log_level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(PageSyncError::Config(format!(
                "unknown log level `{}`",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::Level {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "error" => log::Level::Error,
            "warn" => log::Level::Warn,
            "debug" => log::Level::Debug,
            "trace" => log::Level::Trace,
            _ => log::Level::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub fallback_after_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            fallback_after_ms: DEFAULT_FALLBACK_AFTER_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub grace_ms: u64,
    pub bar_color: String,
    pub shadow_color: String,
    pub element_id: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_PROGRESS_GRACE_MS,
            bar_color: DEFAULT_PROGRESS_BAR_COLOR.to_string(),
            shadow_color: DEFAULT_PROGRESS_SHADOW_COLOR.to_string(),
            element_id: DEFAULT_PROGRESS_ELEMENT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub storage_key: String,
    pub default: Theme,
    pub dark_class: String,
    pub toggle_id: String,
    pub label_id: String,
    pub toggle_classes: ToggleClasses,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_THEME_STORAGE_KEY.to_string(),
            default: Theme::Dark,
            dark_class: DEFAULT_THEME_DARK_CLASS.to_string(),
            toggle_id: DEFAULT_THEME_TOGGLE_ID.to_string(),
            label_id: DEFAULT_THEME_LABEL_ID.to_string(),
            toggle_classes: ToggleClasses::default(),
        }
    }
}

/// Classes the toggle switch carries for each theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleClasses {
    pub knob_light: String,
    pub knob_dark: String,
    pub track_light: String,
    pub track_dark: String,
}

impl Default for ToggleClasses {
    fn default() -> Self {
        Self {
            knob_light: "translate-x-6".to_string(),
            knob_dark: "translate-x-1".to_string(),
            track_light: "bg-theme-surface-muted".to_string(),
            track_dark: "bg-gray-200".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub element_id: String,
    pub scrolling_class: String,
    pub suppressed_class: String,
    /// Root of an overlay (e.g. a search dropdown) that pins the header in place.
    pub overlay_selector: Option<String>,
    /// Descendant of the overlay root that is only present while it is open.
    pub overlay_open_selector: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            element_id: DEFAULT_HEADER_ELEMENT_ID.to_string(),
            scrolling_class: DEFAULT_HEADER_SCROLLING_CLASS.to_string(),
            suppressed_class: DEFAULT_HEADER_SUPPRESSED_CLASS.to_string(),
            overlay_selector: Some(DEFAULT_HEADER_OVERLAY_SELECTOR.to_string()),
            overlay_open_selector: DEFAULT_HEADER_OVERLAY_OPEN_SELECTOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub selector: String,
    pub default_delay_ms: u64,
    pub delay_attribute: String,
    pub kind_attribute: String,
    pub dismiss_event: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            selector: DEFAULT_NOTIFICATION_SELECTOR.to_string(),
            default_delay_ms: DEFAULT_NOTIFICATION_DELAY_MS,
            delay_attribute: DEFAULT_NOTIFICATION_DELAY_ATTRIBUTE.to_string(),
            kind_attribute: DEFAULT_NOTIFICATION_KIND_ATTRIBUTE.to_string(),
            dismiss_event: DEFAULT_NOTIFICATION_DISMISS_EVENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    pub width: u32,
    pub height: u32,
    pub poll_interval_ms: u64,
    pub window_name: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_POPUP_WIDTH,
            height: DEFAULT_POPUP_HEIGHT,
            poll_interval_ms: DEFAULT_POPUP_POLL_INTERVAL_MS,
            window_name: DEFAULT_POPUP_WINDOW_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub mime_type: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_DOWNLOAD_MIME_TYPE.to_string(),
        }
    }
}

/// DOM event names the push stream dispatches on `window`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventNames {
    pub loading_start: String,
    pub loading_stop: String,
    pub dom_patched: String,
    pub download: String,
    pub open_authorization_popup: String,
    pub copy_to_clipboard: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            loading_start: "phx:page-loading-start".to_string(),
            loading_stop: "phx:page-loading-stop".to_string(),
            dom_patched: "phx:update".to_string(),
            download: "phx:download".to_string(),
            open_authorization_popup: "phx:open_oauth_popup".to_string(),
            copy_to_clipboard: "phx:copy-to-clipboard".to_string(),
        }
    }
}

impl EventNames {
    pub fn all(&self) -> [&str; 6] {
        [
            &self.loading_start,
            &self.loading_stop,
            &self.dom_patched,
            &self.download,
            &self.open_authorization_popup,
            &self.copy_to_clipboard,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = PageSyncConfig::from_json("{}").expect("empty config is valid");
        assert_eq!(config, PageSyncConfig::default());
        assert_eq!(config.connection.fallback_after_ms, 2_500);
        assert_eq!(config.progress.grace_ms, 300);
        assert_eq!(config.theme.default, Theme::Dark);
        assert_eq!((config.popup.width, config.popup.height), (500, 600));
        assert_eq!(config.download.mime_type, "text/csv");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = PageSyncConfig::from_json(
            r#"{"popup":{"width":640},"events":{"dom_patched":"phx:patched"}}"#,
        )
        .expect("partial config");
        assert_eq!(config.popup.width, 640);
        assert_eq!(config.popup.height, 600);
        assert_eq!(config.events.dom_patched, "phx:patched");
        assert_eq!(config.events.download, "phx:download");
    }

    #[test]
    fn rejects_zero_popup_dimensions() {
        let error = PageSyncConfig::from_json(r#"{"popup":{"height":0}}"#)
            .expect_err("zero height is invalid");
        assert!(matches!(error, PageSyncError::Config(_)));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let error =
            PageSyncConfig::from_json(r#"{"log_level":"chatty"}"#).expect_err("unknown level");
        assert_eq!(
            error,
            PageSyncError::Config("unknown log level `chatty`".to_string())
        );
    }

    #[test]
    fn rejects_empty_event_name() {
        assert!(PageSyncConfig::from_json(r#"{"events":{"download":" "}}"#).is_err());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let config = PageSyncConfig::from_json(r#"{"log_level":"DEBUG"}"#).expect("valid");
        assert_eq!(config.log_level(), log::Level::Debug);
    }
}
