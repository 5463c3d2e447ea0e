use serde::{Deserialize, Serialize};
use usw_api::Style;

/// Name of the channel the editor opens to the background context.
pub const LINK_CHANNEL_NAME: &str = "link-style-usw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkReason {
    Revoke,
    Publish,
}

impl LinkReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revoke => "revoke",
            Self::Publish => "publish",
        }
    }
}

/// A message on the link channel: what to do, and the style snapshot taken
/// when the message was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMessage {
    pub reason: LinkReason,
    pub data: Style,
}

impl LinkMessage {
    #[must_use]
    pub fn revoke(style: Style) -> Self {
        Self {
            reason: LinkReason::Revoke,
            data: style,
        }
    }

    #[must_use]
    pub fn publish(style: Style) -> Self {
        Self {
            reason: LinkReason::Publish,
            data: style,
        }
    }
}
