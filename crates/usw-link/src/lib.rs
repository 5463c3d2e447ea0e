//! Linking styles to userstyles.world.
//!
//! The editor page drives an [`EditorBridge`], which lazily opens one
//! long-lived channel and posts `publish` / `revoke` messages on it. The
//! background context accepts channels from a [`ConnectionListener`] and hands
//! each one to a [`LinkDispatcher`], which calls the remote API.

use thiserror::Error;
use usw_api::ApiError;

pub mod background;
pub mod bridge;
pub mod port;
pub mod protocol;

pub use background::{LinkDispatcher, LinkOutcome, StylePublisher};
pub use bridge::{EditorBridge, LinkDisplay, LinkView, StyleEditor};
pub use port::{ConnectionListener, LocalRuntime, Port, PortConnector, PortPeer, open_channel};
pub use protocol::{LINK_CHANNEL_NAME, LinkMessage, LinkReason};

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The other end closed the channel with an error. Fatal for the editor:
    /// the channel is never reopened.
    #[error("link_channel_closed:{channel}:{reason}")]
    ChannelClosed { channel: String, reason: String },
    #[error("link_port_disconnected:{channel}")]
    PortDisconnected { channel: String },
    #[error("link_no_source_editor")]
    NoSourceEditor,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Host-wide sink for errors nobody up the stack can handle.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &BridgeError);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: &BridgeError) {
        tracing::error!(%error, "Unrecoverable link error");
    }
}
