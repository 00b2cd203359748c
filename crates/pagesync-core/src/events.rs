//! Named events dispatched by the push stream, and the commands sent back.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::EventNames;
use crate::error::{PageSyncError, Result};
use crate::notification::DismissRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    LoadingStarted,
    LoadingStopped,
    DomPatched,
    Download { data: Vec<u8>, filename: String },
    OpenAuthorizationPopup { url: String },
    CopyToClipboard { text: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DownloadData {
    Text(String),
    Bytes(Vec<u8>),
}

impl DownloadData {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DownloadPayload {
    data: DownloadData,
    filename: String,
}

#[derive(Debug, Deserialize)]
struct PopupPayload {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ClipboardPayload {
    text: String,
}

impl PushEvent {
    /// Maps a DOM event name and its `detail` to a typed event.
    ///
    /// Names that are not configured decode to `None`.
    pub fn decode(name: &str, detail: Value, names: &EventNames) -> Result<Option<Self>> {
        let event = if name == names.loading_start {
            Self::LoadingStarted
        } else if name == names.loading_stop {
            Self::LoadingStopped
        } else if name == names.dom_patched {
            Self::DomPatched
        } else if name == names.download {
            let payload: DownloadPayload = parse(name, detail)?;
            Self::Download {
                data: payload.data.into_bytes(),
                filename: payload.filename,
            }
        } else if name == names.open_authorization_popup {
            let payload: PopupPayload = parse(name, detail)?;
            if payload.url.trim().is_empty() {
                return Err(PageSyncError::payload(name, "url must not be empty"));
            }
            Self::OpenAuthorizationPopup { url: payload.url }
        } else if name == names.copy_to_clipboard {
            let payload: ClipboardPayload = parse(name, detail)?;
            Self::CopyToClipboard { text: payload.text }
        } else {
            return Ok(None);
        };
        Ok(Some(event))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadingStarted => "loading_started",
            Self::LoadingStopped => "loading_stopped",
            Self::DomPatched => "dom_patched",
            Self::Download { .. } => "download",
            Self::OpenAuthorizationPopup { .. } => "open_authorization_popup",
            Self::CopyToClipboard { .. } => "copy_to_clipboard",
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(name: &str, detail: Value) -> Result<T> {
    serde_json::from_value(detail).map_err(|error| PageSyncError::payload(name, error))
}

/// Encodes a server push as a JS command list executed against an element.
pub fn push_command(event: &str, value: Value) -> String {
    json!([["push", { "event": event, "value": value }]]).to_string()
}

pub fn dismiss_command(request: &DismissRequest) -> String {
    push_command(&request.event, json!({ "key": request.key }))
}
