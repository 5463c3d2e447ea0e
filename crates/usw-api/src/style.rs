use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user-editable stylesheet as the extension stores it.
///
/// Only the fields the publish flow reads are typed; everything else the
/// extension keeps on a style rides along in `extra` so a snapshot sent over
/// the link channel is not truncated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default)]
    pub source_code: String,
    #[serde(rename = "_usw", default, skip_serializing_if = "Option::is_none")]
    pub usw: Option<UswLinkage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remote linkage of a style to a userstyles.world account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UswLinkage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StyleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remote style id. Stored styles carry it as a number, but a string is
/// accepted too since it is only ever interpolated into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleId {
    Number(u64),
    Text(String),
}

impl StyleId {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl std::fmt::Display for StyleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id.trim()),
        }
    }
}

impl From<u64> for StyleId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for StyleId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Server-side representation of a published style. Its shape belongs to
/// the service, so it is kept as raw JSON.
pub type StyleInfo = Value;

impl Style {
    #[must_use]
    pub fn new(source_code: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
            ..Self::default()
        }
    }

    /// Copy of this style with the remote linkage dropped.
    #[must_use]
    pub fn without_linkage(&self) -> Self {
        Self {
            usw: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn linkage_token(&self) -> Option<&str> {
        self.usw.as_ref().and_then(UswLinkage::token)
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linkage_token().is_some()
    }
}

impl UswLinkage {
    /// The bearer token, treating an empty string as absent.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}
