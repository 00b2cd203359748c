//! Browser-side runtime that keeps a server-rendered page in sync with a push
//! stream: connection lifecycle, progress feedback, theme preference, sticky
//! header, auto-dismissing notifications, and the popup, clipboard and
//! download bridges.
//!
//! Everything here talks to the browser through port traits; the WASM shell
//! supplies the real implementations.

pub mod bridges;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod notification;
pub mod popup;
pub mod progress;
pub mod runtime;
pub mod scheduler;
pub mod sticky_header;
pub mod teardown;
pub mod theme;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridges::{ClipboardBridge, ClipboardSink, DownloadBridge, DownloadHost, TransientAnchor};
pub use config::PageSyncConfig;
pub use connection::{
    ConnectionPhase, ConnectionProbe, LoadingNotice, PersistentConnection, PushTransport,
    TransportKind,
};
pub use error::{PageSyncError, Result};
pub use events::{PushEvent, dismiss_command, push_command};
pub use notification::{
    DismissRequest, DismissSink, LifecyclePhase, NotificationElement, NotificationLifecycle,
    NotificationRegistry, ReconcileSummary, parse_delay,
};
pub use popup::{
    PopupAuthorizationBridge, PopupHost, PopupOutcome, PopupPlacement, PopupWindow,
    ScreenGeometry,
};
pub use progress::{ProgressIndicator, ProgressView};
pub use runtime::{NotificationSnapshot, PageRuntime, Ports, RuntimeDiagnostics};
pub use scheduler::Scheduler;
pub use sticky_header::{
    HeaderDom, HeaderMode, HeaderView, OverlayState, ScrollState, StickyHeaderController, Viewport,
};
pub use teardown::Teardown;
pub use theme::{
    DurableStore, Theme, ThemeController, ThemeDom, ThemeRoot, ThemeToggleView, ToggleAppearance,
};
