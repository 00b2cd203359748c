//! Host-independent parts of the LiveSocket binding: constructor options and
//! the call sequence that brings each transport up.

use pagesync_core::TransportKind;
use serde_json::{Map, Value, json};

pub(crate) const CSRF_PARAM: &str = "_csrf_token";

/// One call against the page's `LiveSocket` or its underlying Phoenix socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SocketCall {
    /// `liveSocket.connect()`: opens the socket and joins the root views.
    ConnectLiveSocket,
    /// `liveSocket.socket.replaceTransport(Phoenix.LongPoll)`: drops the
    /// current connection without reconnecting.
    ReplaceWithLongPoll,
    /// `liveSocket.socket.connect()`: reconnects with the current transport;
    /// joined views rejoin on open.
    ConnectSocket,
}

/// Calls that open `kind`. The views are joined only once, by the primary
/// transport; the fallback reconnects the socket underneath them.
pub(crate) fn open_sequence(kind: TransportKind) -> &'static [SocketCall] {
    match kind {
        TransportKind::WebSocket => &[SocketCall::ConnectLiveSocket],
        TransportKind::LongPoll => &[SocketCall::ReplaceWithLongPoll, SocketCall::ConnectSocket],
    }
}

/// Hook names referenced by `phx-hook="..."` attribute selectors.
pub(crate) fn hook_names(selector: &str) -> Vec<String> {
    const MARKER: &str = "phx-hook=";
    let mut names = Vec::new();
    let mut rest = selector;
    while let Some(start) = rest.find(MARKER) {
        rest = &rest[start + MARKER.len()..];
        let quote = rest.chars().next();
        let name = match quote {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                body.find(quote).map(|end| &body[..end])
            }
            _ => rest.find(']').map(|end| &rest[..end]),
        };
        if let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Options object for the `LiveSocket` constructor.
///
/// Every hook the notification selector names is registered as an empty
/// hook object; the lifecycle itself runs from the shell.
pub(crate) fn socket_options(csrf_token: Option<&str>, notification_selector: &str) -> Value {
    let mut params = Map::new();
    if let Some(token) = csrf_token {
        params.insert(CSRF_PARAM.to_string(), Value::String(token.to_string()));
    }
    let hooks: Map<String, Value> = hook_names(notification_selector)
        .into_iter()
        .map(|name| (name, json!({})))
        .collect();
    let mut options = Map::new();
    options.insert("params".to_string(), Value::Object(params));
    options.insert("hooks".to_string(), Value::Object(hooks));
    Value::Object(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_poll_fallback_reconnects_socket_after_swap() {
        let sequence = open_sequence(TransportKind::LongPoll);
        assert_eq!(
            sequence,
            &[SocketCall::ReplaceWithLongPoll, SocketCall::ConnectSocket]
        );
        assert!(!sequence.contains(&SocketCall::ConnectLiveSocket));
    }

    #[test]
    fn primary_transport_joins_views_once() {
        assert_eq!(
            open_sequence(TransportKind::WebSocket),
            &[SocketCall::ConnectLiveSocket]
        );
    }

    #[test]
    fn hook_names_come_from_attribute_selectors() {
        assert_eq!(hook_names(r#"[phx-hook="AutoDismiss"]"#), vec!["AutoDismiss"]);
        assert_eq!(
            hook_names("[phx-hook='Flash'], .toast[phx-hook=Toast], [phx-hook=\"Flash\"]"),
            vec!["Flash", "Toast"]
        );
        assert!(hook_names(".flash[data-kind]").is_empty());
    }

    #[test]
    fn options_register_notification_hook_and_csrf() {
        let options = socket_options(Some("tok-1"), r#"[phx-hook="AutoDismiss"]"#);
        assert_eq!(
            options,
            json!({
                "params": { "_csrf_token": "tok-1" },
                "hooks": { "AutoDismiss": {} }
            })
        );
    }

    #[test]
    fn options_without_token_or_hooks_stay_empty() {
        assert_eq!(
            socket_options(None, ".flash"),
            json!({ "params": {}, "hooks": {} })
        );
    }
}
