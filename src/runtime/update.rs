use crate::types::{ConversationId, ConversationSummary};
use tokio::sync::oneshot;

/// Messages from background tasks to the UI loop.
pub enum UiUpdate {
    TurnStarted { conversation_id: ConversationId },
    TurnProgress,
    TurnComplete,
    TurnFailed(String),
    MessagesAppended { count: usize },
    ConversationsLoaded(Vec<ConversationSummary>),
    ConversationOpened(ConversationSummary),
    ConversationCleared,
    Alert(String),
    PermissionRequest(PermissionRequest),
}

/// A yes/no question the UI answers through its confirm dialog.
pub struct PermissionRequest {
    pub prompt: String,
    pub response_tx: oneshot::Sender<bool>,
}

#[cfg(test)]
impl PermissionRequest {
    pub fn test_stub() -> (Self, oneshot::Receiver<bool>) {
        let (response_tx, response_rx) = oneshot::channel::<bool>();
        (
            Self {
                prompt: "Allow desktop notifications?".to_string(),
                response_tx,
            },
            response_rx,
        )
    }
}
