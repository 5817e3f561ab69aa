use super::ComponentError;
use tokio::sync::mpsc;

/// Actions a component raises towards whatever hosts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    SearchRequested { search_text: String },
    /// `model` names the binding the chosen path will be written to
    OpenFileBrowser { model: String },
}

/// Sending half of a component's action channel.
#[derive(Debug, Clone)]
pub struct ActionSender {
    inner: mpsc::UnboundedSender<UiAction>,
}

pub type ActionReceiver = mpsc::UnboundedReceiver<UiAction>;

pub fn action_channel() -> (ActionSender, ActionReceiver) {
    let (inner, receiver) = mpsc::unbounded_channel();
    (ActionSender { inner }, receiver)
}

impl ActionSender {
    pub fn send(&self, action: UiAction) -> Result<(), ComponentError> {
        self.inner
            .send(action)
            .map_err(|_| ComponentError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
