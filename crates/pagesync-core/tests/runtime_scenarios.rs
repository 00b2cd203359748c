use std::rc::Rc;
use std::time::Duration;

use pagesync_core::testing::{FakeClipboard, FakeNotification, FakePage, FakePopupHost, as_element};
use pagesync_core::{
    ConnectionPhase, HeaderMode, PageRuntime, PageSyncConfig, PushEvent, Theme, TransportKind,
};
use serde_json::{Value, json};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn started(page: &FakePage) -> anyhow::Result<PageRuntime> {
    let runtime = PageRuntime::new(PageSyncConfig::default(), page.ports())?;
    runtime.start();
    Ok(runtime)
}

#[test]
fn empty_store_starts_dark_with_dark_label() -> anyhow::Result<()> {
    let page = FakePage::new();
    page.theme_root.overwrite(Theme::Light);
    let _runtime = started(&page)?;

    assert_eq!(page.theme_root.theme(), Theme::Dark);
    assert_eq!(page.store.value("theme").as_deref(), Some("dark"));
    assert_eq!(page.theme_dom.toggle().label(), Some("Dark"));
    Ok(())
}

#[test]
fn dom_patch_restores_stored_theme_and_rebinds_toggle() -> anyhow::Result<()> {
    let page = FakePage::new();
    page.store.insert("theme", "light");
    let runtime = started(&page)?;
    assert_eq!(page.theme_root.theme(), Theme::Light);

    let old_toggle = page.theme_dom.toggle();
    page.theme_root.overwrite(Theme::Dark);
    page.theme_dom.replace_toggle();
    runtime.dispatch_raw("phx:update", Value::Null);

    assert_eq!(page.theme_root.theme(), Theme::Light);
    assert_eq!(old_toggle.listener_count(), 0);
    assert_eq!(page.theme_dom.toggle().listener_count(), 1);
    assert_eq!(page.theme_dom.toggle().label(), Some("Light"));
    Ok(())
}

#[test]
fn toggle_click_flips_to_light() -> anyhow::Result<()> {
    let page = FakePage::new();
    let _runtime = started(&page)?;

    page.theme_dom.toggle().click();

    assert_eq!(page.theme_root.theme(), Theme::Light);
    assert_eq!(page.store.value("theme").as_deref(), Some("light"));
    assert_eq!(page.theme_dom.toggle().label(), Some("Light"));
    Ok(())
}

#[test]
fn exported_toggle_works_without_affordance() -> anyhow::Result<()> {
    let page = FakePage::new();
    page.theme_dom.set_present(false);
    let runtime = started(&page)?;

    assert_eq!(runtime.toggle_theme()?, Theme::Light);
    assert_eq!(page.store.value("theme").as_deref(), Some("light"));
    assert!(!runtime.diagnostics().theme_toggle_bound);
    Ok(())
}

#[test]
fn dom_patch_rebinds_header_with_fresh_scroll_state() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;

    page.viewport.scroll_to(300.0);
    page.scheduler.run_frames();
    let old_header = page.header_dom.header().ok_or_else(|| anyhow::anyhow!("header"))?;
    assert_eq!(old_header.mode(), HeaderMode::Scrolling);

    page.header_dom.replace_header();
    runtime.dispatch(PushEvent::DomPatched);
    assert_eq!(page.viewport.listener_count(), 1);

    let new_header = page.header_dom.header().ok_or_else(|| anyhow::anyhow!("header"))?;
    assert_eq!(new_header.mode(), HeaderMode::Sticky);

    page.viewport.scroll_to(250.0);
    page.scheduler.run_frames();
    assert_eq!(new_header.mode(), HeaderMode::Sticky);
    page.viewport.scroll_to(600.0);
    page.scheduler.run_frames();
    assert_eq!(new_header.mode(), HeaderMode::Scrolling);
    Ok(())
}

#[test]
fn progress_waits_out_grace_period_and_stop_reinitializes() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;
    let before = runtime.diagnostics().reinitializations;

    runtime.dispatch_raw("phx:page-loading-start", Value::Null);
    page.scheduler.advance(ms(299));
    assert!(!page.progress.is_visible());
    page.scheduler.advance(ms(1));
    assert!(page.progress.is_visible());

    runtime.dispatch_raw("phx:page-loading-stop", Value::Null);
    assert!(!page.progress.is_visible());
    assert_eq!(runtime.diagnostics().reinitializations, before + 1);
    Ok(())
}

#[test]
fn primary_transport_timeout_falls_back_to_long_poll() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;

    page.scheduler.advance(ms(2_500));
    assert_eq!(
        page.transport.opened(),
        vec![TransportKind::WebSocket, TransportKind::LongPoll]
    );

    page.transport.set_open(true);
    runtime.transport_opened(TransportKind::LongPoll);
    let diagnostics = runtime.diagnostics();
    assert_eq!(
        diagnostics.connection,
        ConnectionPhase::Live(TransportKind::LongPoll)
    );
    assert!(diagnostics.connected);
    assert!(!diagnostics.fallback_pending);
    Ok(())
}

#[test]
fn notification_dismissed_only_after_reset_delay() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;
    page.transport.set_open(true);
    runtime.transport_opened(TransportKind::WebSocket);

    let flash = FakeNotification::new("flash-info", Some("info"), Some("1000"));
    runtime.reconcile_notifications(vec![as_element(&flash)]);
    page.scheduler.advance(ms(800));

    flash.set_content("Saved twice");
    let summary = runtime.reconcile_notifications(vec![as_element(&flash)]);
    assert_eq!(summary.updated, 1);

    page.scheduler.advance(ms(200));
    assert!(page.dismissed.borrow().is_empty());
    page.scheduler.advance(ms(800));
    let dismissed = page.dismissed.borrow();
    assert_eq!(dismissed.len(), 1);
    assert_eq!(dismissed[0].key, "info");
    assert_eq!(dismissed[0].event, "lv:clear-flash");
    Ok(())
}

#[test]
fn notification_expiring_while_disconnected_is_kept() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;

    let flash = FakeNotification::new("flash-error", Some("error"), None);
    runtime.reconcile_notifications(vec![as_element(&flash)]);
    page.scheduler.advance(ms(5_000));

    assert!(page.dismissed.borrow().is_empty());
    Ok(())
}

#[test]
fn removed_notifications_stop_counting() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;
    page.transport.set_open(true);

    let flash = FakeNotification::new("flash-info", Some("info"), None);
    runtime.reconcile_notifications(vec![as_element(&flash)]);
    let summary = runtime.reconcile_notifications(Vec::new());
    assert_eq!(summary.destroyed, 1);

    page.scheduler.advance(ms(10_000));
    assert!(page.dismissed.borrow().is_empty());
    assert!(runtime.diagnostics().notifications.is_empty());
    Ok(())
}

#[test]
fn download_event_leaves_nothing_behind() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;

    runtime.dispatch_raw(
        "phx:download",
        json!({ "data": "id,total\n1,42\n", "filename": "report.csv" }),
    );

    let clicked = page.download.clicked();
    assert_eq!(clicked.len(), 1);
    assert_eq!(clicked[0].0, "report.csv");
    assert_eq!(clicked[0].2, "text/csv");
    assert!(page.download.live_urls().is_empty());
    assert_eq!(page.download.anchors_in_document(), 0);
    Ok(())
}

#[test]
fn blocked_popup_navigates_current_page() -> anyhow::Result<()> {
    let mut page = FakePage::new();
    page.popup = Rc::new(FakePopupHost::blocking());
    let runtime = started(&page)?;

    runtime.dispatch_raw(
        "phx:open_oauth_popup",
        json!({ "url": "https://auth.example.com/authorize" }),
    );

    assert_eq!(
        page.popup.navigations(),
        vec!["https://auth.example.com/authorize".to_string()]
    );
    assert_eq!(runtime.diagnostics().open_popups, 0);
    Ok(())
}

#[test]
fn closed_popup_reloads_page() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;
    page.transport.set_open(true);
    runtime.transport_opened(TransportKind::WebSocket);

    runtime.dispatch(PushEvent::OpenAuthorizationPopup {
        url: "https://auth.example.com/authorize".to_string(),
    });
    let (_, name, features) = page
        .popup
        .opened()
        .pop()
        .ok_or_else(|| anyhow::anyhow!("popup opened"))?;
    assert_eq!(name, "oauth-popup");
    assert_eq!(
        features,
        "width=500,height=600,left=710,top=240,scrollbars=yes,resizable=yes"
    );
    assert_eq!(runtime.diagnostics().open_popups, 1);

    page.popup.close_last_popup();
    page.scheduler.advance(ms(500));
    assert_eq!(page.popup.reloads(), 1);
    assert_eq!(runtime.diagnostics().open_popups, 0);
    assert_eq!(page.scheduler.active_timers(), 0);
    Ok(())
}

#[test]
fn clipboard_copy_completes_on_scheduler() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;

    runtime.dispatch_raw("phx:copy-to-clipboard", json!({ "text": "ref-7781" }));
    assert_eq!(page.clipboard.contents(), None);
    page.scheduler.run_until_stalled();
    assert_eq!(page.clipboard.contents().as_deref(), Some("ref-7781"));
    assert_eq!(runtime.last_error(), None);
    Ok(())
}

#[test]
fn clipboard_failure_is_recorded_and_runtime_keeps_going() -> anyhow::Result<()> {
    let mut page = FakePage::new();
    page.clipboard = Rc::new(FakeClipboard::failing());
    let runtime = started(&page)?;

    runtime.dispatch_raw("phx:copy-to-clipboard", json!({ "text": "ref-7781" }));
    page.scheduler.run_until_stalled();
    assert_eq!(page.clipboard.attempts(), 1);
    assert!(runtime.last_error().is_some());

    runtime.dispatch_raw("phx:update", Value::Null);
    assert_eq!(page.viewport.listener_count(), 1);
    Ok(())
}

#[test]
fn diagnostics_snapshot_serializes() -> anyhow::Result<()> {
    let page = FakePage::new();
    let runtime = started(&page)?;
    page.transport.set_open(true);
    runtime.transport_opened(TransportKind::WebSocket);
    let flash = FakeNotification::new("flash-info", Some("info"), Some("750"));
    runtime.reconcile_notifications(vec![as_element(&flash)]);

    let value = serde_json::to_value(runtime.diagnostics())?;
    assert_eq!(value["started"], json!(true));
    assert_eq!(
        value["connection"],
        json!({ "phase": "live", "transport": "web_socket" })
    );
    assert_eq!(value["header_mode"], json!("sticky"));
    assert_eq!(value["notifications"][0]["id"], json!("flash-info"));
    assert_eq!(value["notifications"][0]["delay_ms"], json!(750));
    assert_eq!(value["notifications"][0]["phase"], json!("counting"));
    Ok(())
}
