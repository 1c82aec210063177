//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// A rebuild succeeded; reload the page
    Reload,

    /// A rebuild failed
    BuildFailed {
        /// Error reported by the builder
        message: String,
    },
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is not an error
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the next message for one client.
///
/// A client that falls behind skips the messages it missed and keeps
/// listening; `None` means the hub is gone.
pub async fn next_message(rx: &mut broadcast::Receiver<ReloadMessage>) -> Option<ReloadMessage> {
    loop {
        match rx.recv().await {
            Ok(msg) => return Some(msg),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Live reload client skipped {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Generate the client-side live reload script.
///
/// The script connects to `ws_path` on the serving host. With `overlay` set,
/// build failures are shown in a full-page overlay instead of only being
/// logged to the console.
pub fn client_script(ws_path: &str, overlay: bool) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const showOverlay = {overlay};
  const protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
  const ws = new WebSocket(protocol + '//' + location.host + '{ws_path}');

  function renderOverlay(message) {{
    let el = document.getElementById('__quire-overlay');
    if (!el) {{
      el = document.createElement('pre');
      el.id = '__quire-overlay';
      el.style.cssText = 'position:fixed;inset:0;margin:0;padding:2rem;z-index:2147483647;' +
        'background:rgba(0,0,0,0.88);color:#ff6b6b;font:14px/1.5 monospace;white-space:pre-wrap;overflow:auto';
      document.body.appendChild(el);
    }}
    el.textContent = 'Build failed\n\n' + message;
  }}

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'build_failed':
        console.error('[quire] Build failed:', msg.message);
        if (showOverlay) {{
          renderOverlay(msg.message);
        }}
        break;

      case 'connected':
        console.log('[quire] Live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[quire] Disconnected, retrying...');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            other => panic!("Expected Reload message, got {:?}", other),
        }
    }

    #[test]
    fn send_without_subscribers_is_ignored() {
        let hub = ReloadHub::new();

        hub.send(ReloadMessage::Reload);

        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        let msg = ReloadMessage::BuildFailed {
            message: "bad css".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(json, r#"{"type":"build_failed","message":"bad css"}"#);
    }

    #[tokio::test]
    async fn lagging_client_keeps_receiving() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        for _ in 0..150 {
            hub.send(ReloadMessage::Reload);
        }
        hub.send(ReloadMessage::BuildFailed {
            message: "latest".to_string(),
        });

        let mut last = None;
        while let Ok(Some(msg)) =
            tokio::time::timeout(Duration::from_millis(100), next_message(&mut rx)).await
        {
            last = Some(msg);
        }

        assert_eq!(
            last,
            Some(ReloadMessage::BuildFailed {
                message: "latest".to_string()
            })
        );
    }

    #[tokio::test]
    async fn closed_hub_ends_client_stream() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();
        hub.send(ReloadMessage::Reload);
        drop(hub);

        assert_eq!(next_message(&mut rx).await, Some(ReloadMessage::Reload));
        assert_eq!(next_message(&mut rx).await, None);
    }

    #[test]
    fn client_script_targets_socket_path() {
        let script = client_script("/__quire/ws", true);

        assert!(script.contains("'/__quire/ws'"));
        assert!(script.contains("const showOverlay = true;"));
    }
}
