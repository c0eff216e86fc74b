use crate::api::client::{ByteStream, ChatService};
use crate::types::{ConversationId, ConversationSummary, Message};
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::future::{ready, BoxFuture};
use futures::{stream, FutureExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Notify};

enum ChatScript {
    Chunks(Vec<Result<Bytes>>),
    Refuse(String),
    Live(mpsc::UnboundedReceiver<Result<Bytes>>),
}

#[derive(Default)]
struct MockState {
    conversations: Vec<ConversationSummary>,
    next_id: i64,
    messages: HashMap<ConversationId, Vec<Message>>,
    chat_scripts: VecDeque<ChatScript>,
    failing_message_fetches: usize,
    message_fetches: usize,
    fetch_release: Option<Arc<Notify>>,
    failing_deletes: usize,
    sent: Vec<(ConversationId, String)>,
}

/// In-memory conversation service with scripted chat responses.
#[derive(Default)]
pub struct MockChatService {
    state: Mutex<MockState>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_conversation(self, id: i64, title: &str, messages: Vec<Message>) -> Self {
        {
            let mut state = self.lock();
            let id = ConversationId(id);
            state.conversations.push(ConversationSummary {
                id,
                title: title.to_string(),
            });
            state.messages.insert(id, messages);
            state.next_id = state.next_id.max(id.0);
        }
        self
    }

    pub fn set_messages(&self, id: i64, messages: Vec<Message>) {
        self.lock().messages.insert(ConversationId(id), messages);
    }

    /// Queues a chat response delivered as the given body chunks.
    pub fn push_chat_chunks(&self, chunks: &[&str]) {
        let chunks = chunks
            .iter()
            .map(|chunk| Ok(Bytes::from(chunk.to_string())))
            .collect();
        self.lock().chat_scripts.push_back(ChatScript::Chunks(chunks));
    }

    /// Queues a chat response whose body fails after the given chunks.
    pub fn push_chat_chunks_then_error(&self, chunks: &[&str], error: &str) {
        let mut items: Vec<Result<Bytes>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::from(chunk.to_string())))
            .collect();
        items.push(Err(anyhow!(error.to_string())));
        self.lock().chat_scripts.push_back(ChatScript::Chunks(items));
    }

    /// Queues a chat request that fails before any body is returned.
    pub fn push_chat_refusal(&self, error: &str) {
        self.lock()
            .chat_scripts
            .push_back(ChatScript::Refuse(error.to_string()));
    }

    /// Queues a chat response the test feeds chunk by chunk; dropping the sender ends it.
    pub fn push_live_chat(&self) -> mpsc::UnboundedSender<Result<Bytes>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().chat_scripts.push_back(ChatScript::Live(rx));
        tx
    }

    pub fn fail_next_message_fetches(&self, count: usize) {
        self.lock().failing_message_fetches = count;
    }

    pub fn fail_next_delete(&self) {
        self.lock().failing_deletes = 1;
    }

    /// Makes every later message fetch wait until the returned handle is notified.
    pub fn hold_message_fetches(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        self.lock().fetch_release = Some(Arc::clone(&release));
        release
    }

    pub fn message_fetches(&self) -> usize {
        self.lock().message_fetches
    }

    pub fn sent_chats(&self) -> Vec<(ConversationId, String)> {
        self.lock().sent.clone()
    }

    pub fn conversation_titles(&self) -> Vec<String> {
        self.lock()
            .conversations
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }
}

impl ChatService for MockChatService {
    fn list_conversations(&self) -> BoxFuture<'_, Result<Vec<ConversationSummary>>> {
        let conversations = self.lock().conversations.iter().rev().cloned().collect();
        ready(Ok(conversations)).boxed()
    }

    fn create_conversation<'a>(
        &'a self,
        title: &'a str,
    ) -> BoxFuture<'a, Result<ConversationSummary>> {
        let mut state = self.lock();
        state.next_id += 1;
        let summary = ConversationSummary {
            id: ConversationId(state.next_id),
            title: title.to_string(),
        };
        state.conversations.push(summary.clone());
        state.messages.insert(summary.id, Vec::new());
        ready(Ok(summary)).boxed()
    }

    fn delete_conversation(&self, id: ConversationId) -> BoxFuture<'_, Result<()>> {
        let mut state = self.lock();
        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return ready(Err(anyhow!("MockChatService: scripted delete failure"))).boxed();
        }
        state.conversations.retain(|c| c.id != id);
        state.messages.remove(&id);
        ready(Ok(())).boxed()
    }

    fn list_messages(&self, id: ConversationId) -> BoxFuture<'_, Result<Vec<Message>>> {
        let mut state = self.lock();
        state.message_fetches += 1;
        let result = if state.failing_message_fetches > 0 {
            state.failing_message_fetches -= 1;
            Err(anyhow!("MockChatService: scripted message fetch failure"))
        } else {
            Ok(state.messages.get(&id).cloned().unwrap_or_default())
        };
        match state.fetch_release.clone() {
            Some(release) => async move {
                release.notified().await;
                result
            }
            .boxed(),
            None => ready(result).boxed(),
        }
    }

    fn send_chat<'a>(
        &'a self,
        id: ConversationId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<ByteStream>> {
        let mut state = self.lock();
        state.sent.push((id, text.to_string()));
        let result: Result<ByteStream> = match state.chat_scripts.pop_front() {
            None => Err(anyhow!("MockChatService: no more chat responses configured")),
            Some(ChatScript::Refuse(error)) => Err(anyhow!(error)),
            Some(ChatScript::Chunks(chunks)) => Ok(Box::pin(stream::iter(chunks))),
            Some(ChatScript::Live(rx)) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }))),
        };
        ready(result).boxed()
    }
}
