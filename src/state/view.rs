use super::render::AssistantView;
use crate::types::{ConversationId, ConversationSummary, Message, Role};
use crate::ui::markdown::MarkdownRenderer;
use ratatui::text::Text;

pub const SEND_FAILURE_TEXT: &str = "Error: Failed to send message.";

/// What the message pane shows when it has no entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Welcome,
    EmptyConversation,
    Deleted,
}

impl Placeholder {
    pub fn message(self) -> &'static str {
        match self {
            Placeholder::Welcome => "Select a conversation or start typing to begin.",
            Placeholder::EmptyConversation => "Start a new conversation...",
            Placeholder::Deleted => "Conversation deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub enum EntryBody {
    /// A stored message rendered once.
    Rendered(Text<'static>),
    /// An assistant turn streamed in this session.
    Assistant(AssistantView),
}

#[derive(Debug, Clone)]
pub struct MessageEntry {
    pub role: Role,
    pub body: EntryBody,
}

impl MessageEntry {
    fn rendered(role: Role, content: &str, markdown: &dyn MarkdownRenderer) -> Self {
        Self {
            role,
            body: EntryBody::Rendered(markdown.render(content)),
        }
    }
}

/// Ties a streaming turn to the assistant entry it created.
///
/// The handle only resolves while the view still shows the same conversation
/// it was issued for; after a switch the turn keeps rendering into its own
/// detached `AssistantView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnHandle {
    epoch: u64,
    index: usize,
}

/// Everything the message pane shows for the active conversation.
///
/// The number of entries is the rendered message count the poller reconciles
/// against.
#[derive(Debug)]
pub struct ConversationView {
    conversation: Option<ConversationSummary>,
    entries: Vec<MessageEntry>,
    placeholder: Option<Placeholder>,
    epoch: u64,
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationView {
    pub fn new() -> Self {
        Self {
            conversation: None,
            entries: Vec::new(),
            placeholder: Some(Placeholder::Welcome),
            epoch: 0,
        }
    }

    pub fn conversation(&self) -> Option<&ConversationSummary> {
        self.conversation.as_ref()
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.conversation.as_ref().map(|c| c.id)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        self.placeholder
    }

    pub fn rendered_message_count(&self) -> usize {
        self.entries.len()
    }

    fn reset(&mut self, conversation: Option<ConversationSummary>, placeholder: Option<Placeholder>) {
        self.epoch += 1;
        self.conversation = conversation;
        self.entries.clear();
        self.placeholder = placeholder;
    }

    /// Switches to `conversation` and renders its full history.
    pub fn open(
        &mut self,
        conversation: ConversationSummary,
        messages: &[Message],
        markdown: &dyn MarkdownRenderer,
    ) {
        let placeholder = messages
            .is_empty()
            .then_some(Placeholder::EmptyConversation);
        self.reset(Some(conversation), placeholder);
        self.append_messages(messages, markdown);
    }

    /// Switches to a conversation that has just been created and has no history.
    pub fn activate_new(&mut self, conversation: ConversationSummary) {
        self.reset(Some(conversation), None);
    }

    pub fn clear(&mut self, placeholder: Placeholder) {
        self.reset(None, Some(placeholder));
    }

    pub fn append_messages(&mut self, messages: &[Message], markdown: &dyn MarkdownRenderer) {
        if messages.is_empty() {
            return;
        }
        self.placeholder = None;
        self.entries.extend(
            messages
                .iter()
                .map(|message| MessageEntry::rendered(message.role, &message.content, markdown)),
        );
    }

    /// Appends whatever part of `fetched` lies beyond the rendered count.
    ///
    /// Returns the number of appended messages. Existing entries are never
    /// touched, so a second call with the same list appends nothing.
    pub fn reconcile(&mut self, fetched: &[Message], markdown: &dyn MarkdownRenderer) -> usize {
        let rendered = self.rendered_message_count();
        let Some(suffix) = fetched.get(rendered..) else {
            return 0;
        };
        self.append_messages(suffix, markdown);
        suffix.len()
    }

    /// Adds the user entry and an empty assistant placeholder for a new turn.
    ///
    /// Returns `None` when the view no longer shows `conversation_id`.
    pub fn begin_turn(
        &mut self,
        conversation_id: ConversationId,
        user_text: &str,
        markdown: &dyn MarkdownRenderer,
    ) -> Option<TurnHandle> {
        if self.active_id() != Some(conversation_id) {
            return None;
        }
        self.placeholder = None;
        self.entries
            .push(MessageEntry::rendered(Role::User, user_text, markdown));
        self.entries.push(MessageEntry {
            role: Role::Assistant,
            body: EntryBody::Assistant(AssistantView::new()),
        });
        Some(TurnHandle {
            epoch: self.epoch,
            index: self.entries.len() - 1,
        })
    }

    fn turn_entry(&mut self, handle: TurnHandle) -> Option<&mut MessageEntry> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.entries.get_mut(handle.index)
    }

    /// Copies the turn's current assistant view into its entry.
    pub fn publish_turn(&mut self, handle: TurnHandle, view: &AssistantView) -> bool {
        match self.turn_entry(handle) {
            Some(entry) => {
                let mut next = view.clone();
                if let EntryBody::Assistant(previous) = &entry.body {
                    next.inherit_expansion(previous);
                }
                entry.body = EntryBody::Assistant(next);
                true
            }
            None => false,
        }
    }

    /// Replaces the turn's assistant entry with the send-failure message.
    pub fn fail_turn(&mut self, handle: TurnHandle, markdown: &dyn MarkdownRenderer) -> bool {
        match self.turn_entry(handle) {
            Some(entry) => {
                entry.body = EntryBody::Rendered(markdown.render(SEND_FAILURE_TEXT));
                true
            }
            None => false,
        }
    }

    /// Toggles argument visibility for the tool blocks of the newest streamed turn.
    pub fn toggle_latest_tool_args(&mut self) -> bool {
        let latest = self.entries.iter_mut().rev().find_map(|entry| match &mut entry.body {
            EntryBody::Assistant(view) if !view.tools().is_empty() => Some(view),
            _ => None,
        });
        match latest {
            Some(view) => {
                view.toggle_all_tool_args();
                true
            }
            None => false,
        }
    }
}
