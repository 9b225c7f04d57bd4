//! WebSocket adapter feeding a [`PushHub`].
//!
//! Reads JSON text frames shaped `{"event": <name>, "payload": <value>}`
//! (`type` / `data` accepted as aliases) and publishes them. Connection
//! management stops at connect-and-read: no reconnection, no heartbeats.

use futures_util::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::{EventKind, PushError, PushHub};

/// Decode one text frame into an event kind and its payload.
///
/// Returns `None` for malformed JSON, unknown event names or non-object
/// frames. A frame without a payload field publishes `null`.
pub fn parse_frame(text: &str) -> Option<(EventKind, Value)> {
    let mut frame: Value = serde_json::from_str(text).ok()?;
    let obj = frame.as_object_mut()?;

    let name = ["event", "type"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))?;
    let kind = EventKind::parse(name)?;

    let payload = ["payload", "data"]
        .iter()
        .find_map(|k| obj.remove(*k))
        .unwrap_or(Value::Null);
    Some((kind, payload))
}

/// Running WebSocket reader. Dropping it stops the reader task.
#[derive(Debug)]
pub struct WsPushSource {
    url: String,
    reader: JoinHandle<()>,
}

impl WsPushSource {
    /// Connect to `url` and start publishing decoded frames into `hub`.
    pub async fn connect(url: &str, hub: PushHub) -> Result<Self, PushError> {
        let (stream, _resp) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| PushError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        info!(url, "push channel connected");

        let (_write, mut read) = stream.split();
        let owned_url = url.to_string();
        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match parse_frame(&text) {
                        Some((kind, payload)) => {
                            let n = hub.publish(kind, payload);
                            debug!(event = kind.as_str(), delivered = n, "push event");
                        }
                        None => debug!("ignoring unrecognised push frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(url = %owned_url, error = %e, "push channel read failed");
                        break;
                    }
                }
            }
            info!(url = %owned_url, "push channel closed");
        });

        Ok(Self {
            url: url.to_string(),
            reader,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `true` once the server closed the stream or a read failed.
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished()
    }
}

impl Drop for WsPushSource {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
