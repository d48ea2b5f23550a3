//! Browser automation sink.
//!
//! The terminal never launches or kills the browser.  It only attaches to a
//! page that is already open and asks it to run scripts or load URLs.
//!
//! - [`DevToolsBrowser`] speaks the Chromium remote-debugging protocol over
//!   the page's websocket (`ws://127.0.0.1:9222/devtools/page/<id>`), issuing
//!   `Runtime.evaluate` and `Page.navigate`.
//! - [`LoggingBrowser`] only logs, for terminals without a configured page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

/// How long to wait for the page to answer one command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for browser sink operations.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to connect to DevTools endpoint {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("websocket error: {0}")]
    Transport(String),
    #[error("no reply to command {id} within {timeout:?}")]
    Timeout { id: u64, timeout: Duration },
    #[error("page rejected command: {0}")]
    Rejected(String),
    #[error("script threw: {0}")]
    ScriptException(String),
}

/// Opaque sink receiving navigation and script-injection calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserSink: Send + Sync {
    /// Runs `script` in the page.
    async fn evaluate(&self, script: &str) -> Result<(), BrowserError>;
    /// Loads `url` in the page.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;
}

/// Builds the script dispatching a DOM event named `event` on `window`.
///
/// The page's own listeners decide what the event does.
pub fn dispatch_event_script(event: &str) -> String {
    // JSON string literal escaping is valid JavaScript string escaping.
    let name = Value::String(event.to_string());
    format!("window.dispatchEvent(new Event({name}))")
}

type PageSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Chromium DevTools page session.
///
/// Connects lazily on first use and reconnects after a transport failure.
pub struct DevToolsBrowser {
    url: String,
    next_id: AtomicU64,
    socket: Mutex<Option<PageSocket>>,
}

impl DevToolsBrowser {
    /// Creates a sink for the page websocket at `url`.  No I/O happens until
    /// the first command.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            next_id: AtomicU64::new(1),
            socket: Mutex::new(None),
        }
    }

    /// Sends one protocol command and waits for its reply.
    async fn call(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({ "id": id, "method": method, "params": params });

        // Commands are serialised on the socket lock so replies cannot
        // interleave.
        let mut guard = self.socket.lock().await;
        if guard.is_none() {
            let (ws, _) = connect_async(self.url.as_str())
                .await
                .map_err(|e| BrowserError::Connect {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
            info!(url = %self.url, "attached to DevTools page");
            *guard = Some(ws);
        }
        let Some(ws) = guard.as_mut() else {
            return Err(BrowserError::Transport("socket unavailable".to_string()));
        };

        let result = match timeout(COMMAND_TIMEOUT, exchange(ws, id, request.to_string())).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout {
                id,
                timeout: COMMAND_TIMEOUT,
            }),
        };
        if matches!(result, Err(BrowserError::Transport(_) | BrowserError::Timeout { .. })) {
            // Drop the socket so the next command reconnects.
            *guard = None;
        }
        result
    }
}

/// Writes `request` and reads frames until the reply carrying `id` arrives.
/// Protocol events received in between are skipped.
async fn exchange(ws: &mut PageSocket, id: u64, request: String) -> Result<Value, BrowserError> {
    ws.send(WsMessage::Text(request))
        .await
        .map_err(|e| BrowserError::Transport(e.to_string()))?;

    loop {
        let frame = match ws.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(BrowserError::Transport(e.to_string())),
            None => return Err(BrowserError::Transport("page closed the socket".to_string())),
        };
        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => {
                return Err(BrowserError::Transport("page closed the socket".to_string()))
            }
            _ => continue,
        };
        let reply: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                debug!("ignoring non-JSON DevTools frame: {e}");
                continue;
            }
        };
        if reply.get("id").and_then(Value::as_u64) != Some(id) {
            continue;
        }
        return parse_reply(reply);
    }
}

/// Maps a DevTools reply to its `result`, surfacing protocol errors and
/// script exceptions.
fn parse_reply(reply: Value) -> Result<Value, BrowserError> {
    if let Some(err) = reply.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(BrowserError::Rejected(message.to_string()));
    }
    let result = reply.get("result").cloned().unwrap_or(Value::Null);
    if let Some(details) = result.get("exceptionDetails") {
        let text = details
            .pointer("/exception/description")
            .or_else(|| details.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("exception");
        return Err(BrowserError::ScriptException(text.to_string()));
    }
    Ok(result)
}

#[async_trait]
impl BrowserSink for DevToolsBrowser {
    async fn evaluate(&self, script: &str) -> Result<(), BrowserError> {
        self.call("Runtime.evaluate", json!({ "expression": script }))
            .await
            .map(|_| ())
    }

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::Rejected(error_text.to_string()));
        }
        Ok(())
    }
}

/// Sink that logs every call and never fails.
#[derive(Debug, Default)]
pub struct LoggingBrowser;

#[async_trait]
impl BrowserSink for LoggingBrowser {
    async fn evaluate(&self, script: &str) -> Result<(), BrowserError> {
        warn!(script, "no browser attached; script not run");
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        warn!(url, "no browser attached; navigation skipped");
        Ok(())
    }
}
