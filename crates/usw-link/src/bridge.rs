use std::sync::Arc;

use usw_api::Style;

use crate::port::{Port, PortConnector};
use crate::protocol::{LINK_CHANNEL_NAME, LinkMessage};
use crate::{BridgeError, ErrorSink, TracingErrorSink};

/// The style editor the bridge works for.
pub trait StyleEditor {
    /// The style currently open in the editor.
    fn style(&self) -> &Style;

    fn style_mut(&mut self) -> &mut Style;

    /// Live contents of the primary source editor, which may be ahead of
    /// `style().source_code`.
    fn primary_source(&self) -> Option<String>;
}

/// Where the linkage state of a style is shown.
pub trait LinkView {
    fn set_connected(&mut self, connected: bool);
    fn set_style_name(&mut self, name: &str);
    fn set_style_description(&mut self, description: &str);
}

/// What the link view shows for a style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDisplay {
    pub connected: bool,
    pub name: String,
    pub description: String,
}

impl LinkDisplay {
    #[must_use]
    pub fn from_style(style: &Style) -> Self {
        let usw = style.usw.as_ref();
        Self {
            connected: style.is_linked(),
            name: usw
                .and_then(|usw| usw.name.clone())
                .unwrap_or_default(),
            description: usw
                .and_then(|usw| usw.description.clone())
                .unwrap_or_default(),
        }
    }

    pub fn apply(&self, view: &mut impl LinkView) {
        view.set_connected(self.connected);
        view.set_style_name(&self.name);
        view.set_style_description(&self.description);
    }
}

/// Editor-side end of the link flow.
///
/// The channel to the background is opened on the first `revoke_linking` or
/// `publish_style` call and reused for the bridge's lifetime. If the
/// background closes it with an error, the error goes to the [`ErrorSink`]
/// and the channel stays dead.
///
/// Publishing writes the live source buffer into the open style before
/// sending it, so later revokes and view updates see the published source.
pub struct EditorBridge<E, V, C> {
    editor: E,
    view: V,
    connector: C,
    errors: Arc<dyn ErrorSink>,
    port: Option<Port>,
}

impl<E, V, C> EditorBridge<E, V, C>
where
    E: StyleEditor,
    V: LinkView,
    C: PortConnector,
{
    pub fn new(editor: E, view: V, connector: C) -> Self {
        Self {
            editor,
            view,
            connector,
            errors: Arc::new(TracingErrorSink),
            port: None,
        }
    }

    #[must_use]
    pub fn with_error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = errors;
        self
    }

    pub fn revoke_linking(&mut self) -> Result<(), BridgeError> {
        let message = LinkMessage::revoke(self.editor.style().clone());
        self.port().post_message(message)
    }

    pub fn publish_style(&mut self) -> Result<(), BridgeError> {
        self.port();
        let source_code = self
            .editor
            .primary_source()
            .ok_or(BridgeError::NoSourceEditor)?;
        let style = self.editor.style_mut();
        style.source_code = source_code;
        let data = style.clone();
        self.port().post_message(LinkMessage::publish(data))
    }

    /// Reflects the linkage of `style` (or of the open style) in the view.
    pub fn update_ui(&mut self, style: Option<&Style>) {
        let display = LinkDisplay::from_style(style.unwrap_or_else(|| self.editor.style()));
        display.apply(&mut self.view);
    }

    #[must_use]
    pub fn has_channel(&self) -> bool {
        self.port.is_some()
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    fn port(&mut self) -> &Port {
        let connector = &self.connector;
        let errors = &self.errors;
        self.port
            .get_or_insert_with(|| connect_port(connector, Arc::clone(errors)))
    }
}

fn connect_port(connector: &impl PortConnector, errors: Arc<dyn ErrorSink>) -> Port {
    let port = connector.connect(LINK_CHANNEL_NAME);
    tracing::debug!(channel = LINK_CHANNEL_NAME, "Opened link channel");
    port.on_disconnect(move |error| match error {
        Some(reason) => errors.report(&BridgeError::ChannelClosed {
            channel: LINK_CHANNEL_NAME.to_string(),
            reason,
        }),
        None => tracing::debug!(channel = LINK_CHANNEL_NAME, "Link channel closed"),
    });
    port
}
