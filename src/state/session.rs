use super::gate::TurnGate;
use super::view::{ConversationView, Placeholder};
use crate::api::ChatService;
use crate::runtime::notify::Notifier;
use crate::runtime::UiUpdate;
use crate::types::{ConversationId, ConversationSummary};
use crate::ui::markdown::MarkdownRenderer;
use anyhow::Result;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

pub const NEW_CONVERSATION_TITLE: &str = "New Chat";
const TITLE_PREFIX_CHARS: usize = 20;

/// Controller state shared by the UI, the stream driver and the poll reconciler.
///
/// Cloning is cheap; every clone talks to the same view and gate.
#[derive(Clone)]
pub struct ChatSession {
    service: Arc<dyn ChatService>,
    markdown: Arc<dyn MarkdownRenderer>,
    notifier: Arc<dyn Notifier>,
    view: Arc<Mutex<ConversationView>>,
    gate: TurnGate,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
}

impl ChatSession {
    pub fn new(
        service: Arc<dyn ChatService>,
        markdown: Arc<dyn MarkdownRenderer>,
        notifier: Arc<dyn Notifier>,
        update_tx: mpsc::UnboundedSender<UiUpdate>,
    ) -> Self {
        Self {
            service,
            markdown,
            notifier,
            view: Arc::new(Mutex::new(ConversationView::new())),
            gate: TurnGate::new(),
            update_tx,
        }
    }

    pub fn service(&self) -> &dyn ChatService {
        self.service.as_ref()
    }

    pub fn markdown(&self) -> &dyn MarkdownRenderer {
        self.markdown.as_ref()
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    pub fn gate(&self) -> &TurnGate {
        &self.gate
    }

    /// Runs `f` against the shared view. Never call this across an await.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut ConversationView) -> R) -> R {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut view)
    }

    pub fn send_update(&self, update: UiUpdate) {
        let _ = self.update_tx.send(update);
    }

    pub fn active_conversation(&self) -> Option<ConversationSummary> {
        self.with_view(|view| view.conversation().cloned())
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.service.list_conversations().await
    }

    /// Makes `conversation` active and renders its stored history.
    pub async fn open_conversation(&self, conversation: ConversationSummary) -> Result<usize> {
        let messages = self.service.list_messages(conversation.id).await?;
        let count = messages.len();
        tracing::debug!(conversation_id = %conversation.id, count, "opened conversation");
        self.with_view(|view| view.open(conversation, &messages, self.markdown.as_ref()));
        Ok(count)
    }

    pub async fn create_conversation(&self, title: &str) -> Result<ConversationSummary> {
        let created = self.service.create_conversation(title).await?;
        tracing::info!(conversation_id = %created.id, title = %created.title, "created conversation");
        Ok(created)
    }

    /// Deletes a conversation; returns true when it was the active one.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<bool> {
        self.service.delete_conversation(id).await?;
        tracing::info!(conversation_id = %id, "deleted conversation");
        Ok(self.with_view(|view| {
            let was_active = view.active_id() == Some(id);
            if was_active {
                view.clear(Placeholder::Deleted);
            }
            was_active
        }))
    }

    /// Returns the active conversation, creating one titled after `first_text`
    /// when none is active.
    pub async fn ensure_conversation(&self, first_text: &str) -> Result<(ConversationSummary, bool)> {
        if let Some(active) = self.active_conversation() {
            return Ok((active, false));
        }
        let created = self
            .create_conversation(&conversation_title(first_text))
            .await?;
        self.with_view(|view| view.activate_new(created.clone()));
        Ok((created, true))
    }
}

/// First characters of the opening message followed by an ellipsis.
pub fn conversation_title(first_text: &str) -> String {
    let prefix: String = first_text.chars().take(TITLE_PREFIX_CHARS).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::MockChatService;
    use crate::runtime::notify::recording::RecordingNotifier;
    use crate::runtime::notify::Permission;
    use crate::types::{Message, Role};
    use crate::ui::markdown::PlainText;
    use pretty_assertions::assert_eq;

    fn session_with(service: MockChatService) -> (ChatSession, Arc<MockChatService>) {
        let service = Arc::new(service);
        let (update_tx, _update_rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(
            service.clone(),
            Arc::new(PlainText),
            Arc::new(RecordingNotifier::new(Permission::Denied)),
            update_tx,
        );
        (session, service)
    }

    #[test]
    fn test_conversation_title_uses_first_twenty_chars() {
        assert_eq!(
            conversation_title("remind me to water the plants"),
            "remind me to water t..."
        );
        assert_eq!(conversation_title("hi"), "hi...");
        assert_eq!(conversation_title("日本語のテキスト"), "日本語のテキスト...");
    }

    #[tokio::test]
    async fn test_open_conversation_renders_history() {
        let (session, _) = session_with(MockChatService::new().with_conversation(
            3,
            "Plants",
            vec![
                Message::new(Role::User, "water?"),
                Message::new(Role::Assistant, "daily"),
            ],
        ));

        let count = session
            .open_conversation(ConversationSummary {
                id: ConversationId(3),
                title: "Plants".to_string(),
            })
            .await
            .expect("open");
        assert_eq!(count, 2);
        assert_eq!(session.with_view(|v| v.rendered_message_count()), 2);
        assert_eq!(
            session.active_conversation().map(|c| c.title),
            Some("Plants".to_string())
        );
    }

    #[tokio::test]
    async fn test_ensure_conversation_creates_titled_conversation_once() {
        let (session, service) = session_with(MockChatService::new());

        let (created, was_created) = session
            .ensure_conversation("what is the weather tomorrow")
            .await
            .expect("create");
        assert!(was_created);
        assert_eq!(created.title, "what is the weather ...");
        assert_eq!(session.with_view(|v| v.placeholder()), None);

        let (again, was_created) = session.ensure_conversation("second").await.expect("reuse");
        assert!(!was_created);
        assert_eq!(again.id, created.id);
        assert_eq!(service.conversation_titles(), vec!["what is the weather ..."]);
    }

    #[tokio::test]
    async fn test_deleting_active_conversation_clears_view() {
        let (session, service) =
            session_with(MockChatService::new().with_conversation(1, "a", Vec::new()));
        session
            .open_conversation(ConversationSummary {
                id: ConversationId(1),
                title: "a".to_string(),
            })
            .await
            .expect("open");

        assert!(session
            .delete_conversation(ConversationId(1))
            .await
            .expect("delete"));
        assert!(session.active_conversation().is_none());
        assert_eq!(
            session.with_view(|v| v.placeholder()),
            Some(Placeholder::Deleted)
        );
        assert!(service.conversation_titles().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_other_conversation_keeps_view() {
        let (session, _) = session_with(
            MockChatService::new()
                .with_conversation(1, "a", Vec::new())
                .with_conversation(2, "b", Vec::new()),
        );
        session
            .open_conversation(ConversationSummary {
                id: ConversationId(1),
                title: "a".to_string(),
            })
            .await
            .expect("open");

        assert!(!session
            .delete_conversation(ConversationId(2))
            .await
            .expect("delete"));
        assert_eq!(
            session.active_conversation().map(|c| c.id),
            Some(ConversationId(1))
        );
    }
}
