use super::driver::StreamDriver;
use super::poller::PollReconciler;
use super::UiUpdate;
use crate::state::session::NEW_CONVERSATION_TITLE;
use crate::state::ChatSession;
use crate::types::{ConversationId, ConversationSummary};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Dispatch surface handed to every `RuntimeMode` callback.
///
/// Each action runs as a background task and reports back through `UiUpdate`s,
/// so callbacks never block the UI loop.
pub struct RuntimeContext {
    session: ChatSession,
    shutdown: CancellationToken,
}

impl RuntimeContext {
    pub fn new(session: ChatSession, shutdown: CancellationToken) -> Self {
        Self { session, shutdown }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Sends `text` as a new turn, creating a conversation first when none is active.
    pub fn start_turn(&mut self, text: String) {
        let session = self.session.clone();
        tokio::spawn(async move {
            let (conversation, created) = match session.ensure_conversation(&text).await {
                Ok(ensured) => ensured,
                Err(error) => {
                    tracing::warn!(error = %format!("{error:#}"), "could not create conversation");
                    session.send_update(UiUpdate::TurnFailed(format!("{error:#}")));
                    return;
                }
            };
            if created {
                session.send_update(UiUpdate::ConversationOpened(conversation.clone()));
                load_conversations(&session).await;
            }
            StreamDriver::new(session)
                .run(conversation.id, &text)
                .await;
        });
    }

    pub fn open_conversation(&mut self, conversation: ConversationSummary) {
        let session = self.session.clone();
        tokio::spawn(async move {
            match session.open_conversation(conversation.clone()).await {
                Ok(_) => session.send_update(UiUpdate::ConversationOpened(conversation)),
                Err(error) => {
                    tracing::warn!(
                        conversation_id = %conversation.id,
                        error = %format!("{error:#}"),
                        "failed to load conversation"
                    );
                    session.send_update(UiUpdate::Alert(
                        "Failed to load conversation.".to_string(),
                    ));
                }
            }
        });
    }

    pub fn new_conversation(&mut self) {
        let session = self.session.clone();
        tokio::spawn(async move {
            let created = match session.create_conversation(NEW_CONVERSATION_TITLE).await {
                Ok(created) => created,
                Err(error) => {
                    tracing::warn!(error = %format!("{error:#}"), "failed to create conversation");
                    session.send_update(UiUpdate::Alert(
                        "Failed to create conversation.".to_string(),
                    ));
                    return;
                }
            };
            load_conversations(&session).await;
            match session.open_conversation(created.clone()).await {
                Ok(_) => session.send_update(UiUpdate::ConversationOpened(created)),
                Err(error) => {
                    tracing::warn!(error = %format!("{error:#}"), "failed to open new conversation");
                }
            }
        });
    }

    pub fn delete_conversation(&mut self, id: ConversationId) {
        let session = self.session.clone();
        tokio::spawn(async move {
            match session.delete_conversation(id).await {
                Ok(was_active) => {
                    if was_active {
                        session.send_update(UiUpdate::ConversationCleared);
                    }
                    load_conversations(&session).await;
                }
                Err(error) => {
                    tracing::warn!(conversation_id = %id, error = %format!("{error:#}"), "failed to delete conversation");
                    session.send_update(UiUpdate::Alert(
                        "Failed to delete conversation.".to_string(),
                    ));
                }
            }
        });
    }

    pub fn refresh_conversations(&mut self) {
        let session = self.session.clone();
        tokio::spawn(async move { load_conversations(&session).await });
    }

    /// Starts the background reconciler; it stops when the context shuts down.
    pub fn start_polling(&mut self, interval: Duration, notification_title: String) {
        let poller = PollReconciler::new(self.session.clone(), interval, notification_title);
        tokio::spawn(poller.run(self.shutdown.child_token()));
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn load_conversations(session: &ChatSession) {
    match session.list_conversations().await {
        Ok(conversations) => session.send_update(UiUpdate::ConversationsLoaded(conversations)),
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "failed to load conversations");
        }
    }
}
