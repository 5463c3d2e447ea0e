use std::sync::Arc;

use async_trait::async_trait;
use usw_api::{ApiError, Style, StyleInfo, UswApiClient};

use crate::BridgeError;
use crate::port::{ConnectionListener, PortPeer};
use crate::protocol::{LinkMessage, LinkReason};

/// Remote side of a publish.
#[async_trait]
pub trait StylePublisher: Send + Sync {
    async fn upload_style(&self, style: &Style) -> Result<StyleInfo, ApiError>;
}

#[async_trait]
impl StylePublisher for UswApiClient {
    async fn upload_style(&self, style: &Style) -> Result<StyleInfo, ApiError> {
        UswApiClient::upload_style(self, style).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// The service accepted the upload and returned its view of the style.
    Published(StyleInfo),
    /// The style with its linkage removed, ready to be stored.
    Revoked(Style),
}

/// Background consumer of the link channel.
#[derive(Debug)]
pub struct LinkDispatcher<P> {
    publisher: P,
}

impl<P: StylePublisher> LinkDispatcher<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub async fn handle(&self, message: LinkMessage) -> Result<LinkOutcome, BridgeError> {
        match message.reason {
            LinkReason::Publish => {
                let info = self.publisher.upload_style(&message.data).await?;
                Ok(LinkOutcome::Published(info))
            }
            LinkReason::Revoke => Ok(LinkOutcome::Revoked(message.data.without_linkage())),
        }
    }

    /// Handles messages from one channel in arrival order until the editor
    /// end goes away. Returns how many messages were handled.
    pub async fn serve(&self, mut peer: PortPeer) -> usize {
        let mut handled = 0;
        while let Some(message) = peer.recv().await {
            let reason = message.reason.as_str();
            match self.handle(message).await {
                Ok(outcome) => {
                    tracing::info!(channel = peer.name(), reason, ?outcome, "Link message handled");
                }
                Err(error) => {
                    tracing::warn!(channel = peer.name(), reason, %error, "Link message failed");
                }
            }
            handled += 1;
        }
        tracing::debug!(channel = peer.name(), handled, "Link channel drained");
        handled
    }
}

impl<P: StylePublisher + 'static> LinkDispatcher<P> {
    /// Accepts channels until the runtime is gone, serving each on its own task.
    pub async fn run(self: Arc<Self>, mut listener: ConnectionListener) {
        while let Some(peer) = listener.accept().await {
            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move {
                dispatcher.serve(peer).await;
            });
        }
    }
}
