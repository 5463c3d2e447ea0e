//! In-process extension messaging: named, ordered channels between the editor
//! page and the background context.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::BridgeError;
use crate::protocol::LinkMessage;

/// Error a port reports when nothing in the background accepted it.
pub const NO_RECEIVER_ERROR: &str = "Could not establish connection. Receiving end does not exist.";

type DisconnectListener = Box<dyn FnOnce(Option<String>) + Send>;

#[derive(Default)]
struct DisconnectSlot {
    listener: Option<DisconnectListener>,
    // Outer `Some` once disconnected; inner value is the error, if any.
    disconnected: Option<Option<String>>,
}

fn lock_slot(slot: &Mutex<DisconnectSlot>) -> MutexGuard<'_, DisconnectSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opens the host side of a channel.
pub trait PortConnector {
    fn connect(&self, name: &str) -> Port;
}

/// Editor end of a channel.
pub struct Port {
    name: String,
    tx: mpsc::UnboundedSender<LinkMessage>,
    disconnect: Arc<Mutex<DisconnectSlot>>,
}

/// Background end of a channel.
pub struct PortPeer {
    name: String,
    rx: mpsc::UnboundedReceiver<LinkMessage>,
    disconnect: Arc<Mutex<DisconnectSlot>>,
}

#[must_use]
pub fn open_channel(name: &str) -> (Port, PortPeer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let disconnect = Arc::new(Mutex::new(DisconnectSlot::default()));
    (
        Port {
            name: name.to_string(),
            tx,
            disconnect: Arc::clone(&disconnect),
        },
        PortPeer {
            name: name.to_string(),
            rx,
            disconnect,
        },
    )
}

impl Port {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn post_message(&self, message: LinkMessage) -> Result<(), BridgeError> {
        tracing::debug!(channel = %self.name, reason = message.reason.as_str(), "Posting link message");
        self.tx
            .send(message)
            .map_err(|_| BridgeError::PortDisconnected {
                channel: self.name.clone(),
            })
    }

    /// Registers the listener called once when the peer goes away. A port that
    /// is already disconnected calls it right away.
    pub fn on_disconnect(&self, listener: impl FnOnce(Option<String>) + Send + 'static) {
        let mut slot = lock_slot(&self.disconnect);
        match slot.disconnected.clone() {
            Some(error) => {
                drop(slot);
                listener(error);
            }
            None => slot.listener = Some(Box::new(listener)),
        }
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        lock_slot(&self.disconnect).disconnected.is_some()
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

impl PortPeer {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next message in send order; `None` once the editor end is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<LinkMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LinkMessage> {
        self.rx.try_recv().ok()
    }

    /// Closes the channel, handing `error` to the editor's disconnect listener.
    pub fn disconnect(mut self, error: Option<String>) {
        self.fire_disconnect(error);
    }

    fn fire_disconnect(&mut self, error: Option<String>) {
        self.rx.close();
        let listener = {
            let mut slot = lock_slot(&self.disconnect);
            if slot.disconnected.is_some() {
                return;
            }
            slot.disconnected = Some(error.clone());
            slot.listener.take()
        };
        if let Some(listener) = listener {
            listener(error);
        }
    }
}

impl Drop for PortPeer {
    fn drop(&mut self) {
        self.fire_disconnect(None);
    }
}

/// Connector backed by an in-process background context.
#[derive(Debug, Clone)]
pub struct LocalRuntime {
    connections: mpsc::UnboundedSender<PortPeer>,
}

/// Background-side stream of newly opened channels.
#[derive(Debug)]
pub struct ConnectionListener {
    connections: mpsc::UnboundedReceiver<PortPeer>,
}

impl std::fmt::Debug for PortPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortPeer").field("name", &self.name).finish()
    }
}

impl LocalRuntime {
    #[must_use]
    pub fn new() -> (Self, ConnectionListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self { connections: tx },
            ConnectionListener { connections: rx },
        )
    }
}

impl PortConnector for LocalRuntime {
    fn connect(&self, name: &str) -> Port {
        let (port, peer) = open_channel(name);
        if let Err(mpsc::error::SendError(peer)) = self.connections.send(peer) {
            tracing::warn!(channel = name, "No background listener accepted port");
            peer.disconnect(Some(NO_RECEIVER_ERROR.to_string()));
        }
        port
    }
}

impl ConnectionListener {
    pub async fn accept(&mut self) -> Option<PortPeer> {
        self.connections.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usw_api::Style;

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, impl FnOnce(Option<String>) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |error| {
            sink.lock().expect("lock").push(error);
        })
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let (port, mut peer) = open_channel("test");
        port.post_message(LinkMessage::revoke(Style::new("1")))
            .expect("post");
        port.post_message(LinkMessage::publish(Style::new("2")))
            .expect("post");

        let first = peer.try_recv().expect("first");
        let second = peer.try_recv().expect("second");
        assert_eq!(first.data.source_code, "1");
        assert_eq!(second.data.source_code, "2");
        assert!(peer.try_recv().is_none());
    }

    #[test]
    fn peer_disconnect_fires_listener_once_with_error() {
        let (port, peer) = open_channel("test");
        let (seen, listener) = recorder();
        port.on_disconnect(listener);

        peer.disconnect(Some("boom".to_string()));

        assert_eq!(*seen.lock().expect("lock"), vec![Some("boom".to_string())]);
        assert!(port.is_disconnected());
    }

    #[test]
    fn dropping_peer_disconnects_without_error() {
        let (port, peer) = open_channel("test");
        let (seen, listener) = recorder();
        port.on_disconnect(listener);

        drop(peer);

        assert_eq!(*seen.lock().expect("lock"), vec![None]);
    }

    #[test]
    fn post_after_disconnect_fails() {
        let (port, peer) = open_channel("test");
        drop(peer);

        let error = port
            .post_message(LinkMessage::revoke(Style::default()))
            .expect_err("disconnected");
        assert!(matches!(error, BridgeError::PortDisconnected { channel } if channel == "test"));
    }

    #[test]
    fn connect_without_listener_yields_dead_port() {
        let (runtime, listener) = LocalRuntime::new();
        drop(listener);

        let port = runtime.connect("test");
        let (seen, on_disconnect) = recorder();
        port.on_disconnect(on_disconnect);

        assert_eq!(
            *seen.lock().expect("lock"),
            vec![Some(NO_RECEIVER_ERROR.to_string())]
        );
    }

    #[tokio::test]
    async fn listener_accepts_connected_ports() {
        let (runtime, mut listener) = LocalRuntime::new();
        let port = runtime.connect("named");
        port.post_message(LinkMessage::publish(Style::new("x")))
            .expect("post");

        let mut peer = listener.accept().await.expect("peer");
        assert_eq!(peer.name(), "named");
        let message = peer.recv().await.expect("message");
        assert_eq!(message.data.source_code, "x");

        drop(port);
        assert!(peer.recv().await.is_none());
    }
}
