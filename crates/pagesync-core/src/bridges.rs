//! One-shot side effects requested by the server: clipboard writes and
//! in-memory file downloads.

use std::rc::Rc;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait(?Send)]
pub trait ClipboardSink {
    async fn write_text(&self, text: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct ClipboardBridge {
    sink: Rc<dyn ClipboardSink>,
}

impl ClipboardBridge {
    pub fn new(sink: Rc<dyn ClipboardSink>) -> Self {
        Self { sink }
    }

    /// Writes `text` to the system clipboard. Failures are logged, never retried.
    pub async fn copy(&self, text: String) -> bool {
        match self.sink.write_text(&text).await {
            Ok(()) => true,
            Err(error) => {
                log::error!("Failed to copy text: {error}");
                false
            }
        }
    }
}

/// A link element that exists only for the duration of one download.
pub trait TransientAnchor {
    fn click(&self) -> Result<()>;
    fn remove(&self);
}

pub trait DownloadHost {
    fn create_object_url(&self, data: &[u8], mime_type: &str) -> Result<String>;
    fn revoke_object_url(&self, url: &str);
    fn append_anchor(&self, url: &str, filename: &str) -> Result<Box<dyn TransientAnchor>>;
}

#[derive(Clone)]
pub struct DownloadBridge {
    host: Rc<dyn DownloadHost>,
    mime_type: String,
}

impl DownloadBridge {
    pub fn new(host: Rc<dyn DownloadHost>, mime_type: impl Into<String>) -> Self {
        Self {
            host,
            mime_type: mime_type.into(),
        }
    }

    /// Saves `data` as `filename`. An empty name leaves the choice to the
    /// browser. The object URL is revoked and the anchor removed on every
    /// path, including failed clicks.
    pub fn download(&self, data: &[u8], filename: &str) -> Result<()> {
        let url = self.host.create_object_url(data, &self.mime_type)?;
        let clicked = self
            .host
            .append_anchor(&url, filename)
            .and_then(|anchor| {
                let clicked = anchor.click();
                anchor.remove();
                clicked
            });
        self.host.revoke_object_url(&url);
        clicked
    }
}
