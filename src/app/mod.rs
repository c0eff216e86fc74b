use crate::api::ApiClient;
use crate::config::Config;
use crate::runtime::context::RuntimeContext;
use crate::runtime::frontend::{Command, ScrollAction, UserInputEvent};
use crate::runtime::mode::RuntimeMode;
use crate::runtime::notify::TerminalNotifier;
use crate::runtime::r#loop::Runtime;
use crate::runtime::{PermissionRequest, UiUpdate};
use crate::state::ChatSession;
use crate::types::{ConversationId, ConversationSummary};
use crate::ui::markdown::TerminalMarkdown;
use crate::ui::render::{conversation_lines, wrapped_row_count, Modal};
use anyhow::Result;
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const NO_CONVERSATION_TITLE: &str = "Select or create a conversation";
const DELETE_PROMPT: &str = "Delete this conversation?";
const CONFIRM_HINT: &str = "y/enter confirm   n/esc cancel";
const ALERT_HINT: &str = "enter/esc dismiss";

enum Dialog {
    ConfirmDelete(ConversationSummary),
    Permission(PermissionRequest),
    Alert(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogAnswer {
    Yes,
    No,
}

fn dialog_answer(input: &str) -> Option<DialogAnswer> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "enter" => Some(DialogAnswer::Yes),
        "n" | "no" | "esc" => Some(DialogAnswer::No),
        _ => None,
    }
}

/// UI-side controller: conversation list, dialogs, scrolling and command dispatch.
///
/// Message content lives in the session's `ConversationView`; the app only
/// tracks what the frontend needs to draw around it.
pub struct App {
    session: ChatSession,
    conversations: Vec<ConversationSummary>,
    selected: usize,
    sidebar_visible: bool,
    dialogs: VecDeque<Dialog>,
    busy: bool,
    scroll_from_bottom: usize,
    /// Width and height of the history pane at the last draw; zero until drawn.
    history_viewport: Cell<(u16, u16)>,
    notice: Option<String>,
    quit_requested: bool,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            conversations: Vec::new(),
            selected: 0,
            sidebar_visible: true,
            dialogs: VecDeque::new(),
            busy: false,
            scroll_from_bottom: 0,
            history_viewport: Cell::new((0, 0)),
            notice: None,
            quit_requested: false,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.conversations.is_empty()).then_some(self.selected)
    }

    fn selected_conversation(&self) -> Option<&ConversationSummary> {
        self.conversations.get(self.selected)
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.session.with_view(|view| view.active_id())
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn header_title(&self) -> String {
        self.session
            .active_conversation()
            .map(|conversation| conversation.title)
            .unwrap_or_else(|| NO_CONVERSATION_TITLE.to_string())
    }

    pub fn status_line(&self) -> String {
        let mode = if self.overlay_active() {
            "dialog"
        } else if self.busy {
            "streaming"
        } else {
            "ready"
        };
        let view = if self.scroll_from_bottom == 0 {
            "following"
        } else {
            "scrolled"
        };
        let mut status = format!(
            "mode:{mode} chats:{} view:{view}",
            self.conversations.len()
        );
        if let Some(notice) = &self.notice {
            status.push_str(" | ");
            status.push_str(notice);
        }
        status
    }

    pub fn scroll_from_bottom(&self) -> usize {
        self.scroll_from_bottom
    }

    pub fn overlay_active(&self) -> bool {
        !self.dialogs.is_empty()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Whether Enter would send `input` right now.
    pub fn can_submit(&self, input: &str) -> bool {
        !self.busy && !self.overlay_active() && !input.trim().is_empty()
    }

    pub fn modal(&self) -> Option<Modal<'_>> {
        let modal = match self.dialogs.front()? {
            Dialog::ConfirmDelete(_) => Modal {
                title: "Confirm",
                body: DELETE_PROMPT,
                hint: CONFIRM_HINT,
            },
            Dialog::Permission(request) => Modal {
                title: "Notifications",
                body: &request.prompt,
                hint: CONFIRM_HINT,
            },
            Dialog::Alert(message) => Modal {
                title: "Alert",
                body: message,
                hint: ALERT_HINT,
            },
        };
        Some(modal)
    }

    fn answer_dialog(&mut self, input: &str, ctx: &mut RuntimeContext) {
        let Some(answer) = dialog_answer(input) else {
            return;
        };
        let Some(dialog) = self.dialogs.pop_front() else {
            return;
        };
        match dialog {
            Dialog::ConfirmDelete(conversation) => {
                if answer == DialogAnswer::Yes {
                    ctx.delete_conversation(conversation.id);
                }
            }
            Dialog::Permission(request) => {
                let _ = request.response_tx.send(answer == DialogAnswer::Yes);
            }
            Dialog::Alert(_) => {}
        }
    }

    /// Called by the frontend while drawing so scroll limits follow wrapping.
    pub fn record_history_viewport(&self, width: u16, height: u16) {
        self.history_viewport.set((width, height));
    }

    fn max_scroll(&self) -> usize {
        let (width, height) = self.history_viewport.get();
        self.session.with_view(|view| {
            let lines = conversation_lines(view);
            if width == 0 {
                return lines.len();
            }
            wrapped_row_count(&lines, width as usize).saturating_sub(height as usize)
        })
    }

    fn scroll(&mut self, action: ScrollAction) {
        let max = self.max_scroll();
        self.scroll_from_bottom = match action {
            ScrollAction::LineUp => self.scroll_from_bottom.saturating_add(1),
            ScrollAction::LineDown => self.scroll_from_bottom.saturating_sub(1),
            ScrollAction::PageUp(step) => self.scroll_from_bottom.saturating_add(step.max(1)),
            ScrollAction::PageDown(step) => self.scroll_from_bottom.saturating_sub(step.max(1)),
            ScrollAction::Home => max,
            ScrollAction::End => 0,
        }
        .min(max);
    }

    fn select_active(&mut self) {
        if let Some(active) = self.active_id() {
            if let Some(index) = self.conversations.iter().position(|c| c.id == active) {
                self.selected = index;
            }
        }
    }

    fn run_command(&mut self, command: Command, ctx: &mut RuntimeContext) {
        if self.overlay_active() {
            return;
        }
        match command {
            Command::NewConversation => ctx.new_conversation(),
            Command::SelectPrevious => self.selected = self.selected.saturating_sub(1),
            Command::SelectNext => {
                if self.selected + 1 < self.conversations.len() {
                    self.selected += 1;
                }
            }
            Command::OpenSelected => {
                if let Some(conversation) = self.selected_conversation().cloned() {
                    ctx.open_conversation(conversation);
                }
            }
            Command::DeleteSelected => {
                if let Some(conversation) = self.selected_conversation().cloned() {
                    self.dialogs.push_back(Dialog::ConfirmDelete(conversation));
                }
            }
            Command::ToggleSidebar => self.sidebar_visible = !self.sidebar_visible,
            Command::ToggleToolArgs => {
                if !self.session.with_view(|view| view.toggle_latest_tool_args()) {
                    self.notice = Some("no tool calls in the latest reply".to_string());
                }
            }
        }
    }

    fn submit_or_answer(&mut self, input: String, ctx: &mut RuntimeContext) {
        if self.overlay_active() {
            self.answer_dialog(&input, ctx);
            return;
        }
        if self.busy {
            self.notice = Some("busy - reply still streaming, input kept".to_string());
            return;
        }
        let text = input.trim();
        if text.is_empty() {
            return;
        }

        self.busy = true;
        self.notice = None;
        self.scroll_from_bottom = 0;
        ctx.start_turn(text.to_string());
    }

    /// Ctrl-C closes the open dialog first and quits only when none is showing.
    fn interrupt(&mut self, ctx: &mut RuntimeContext) {
        if self.overlay_active() {
            self.answer_dialog("esc", ctx);
            return;
        }
        self.quit_requested = true;
    }
}

impl RuntimeMode for App {
    fn on_background_update(&mut self, update: UiUpdate, _ctx: &mut RuntimeContext) {
        match update {
            UiUpdate::TurnStarted { .. } => self.busy = true,
            UiUpdate::TurnProgress => {}
            UiUpdate::TurnComplete => self.busy = false,
            UiUpdate::TurnFailed(error) => {
                self.busy = false;
                self.notice = Some(format!("error: {error}"));
            }
            UiUpdate::MessagesAppended { count } => {
                self.notice = Some(format!("{count} new message(s)"));
            }
            UiUpdate::ConversationsLoaded(conversations) => {
                self.conversations = conversations;
                self.selected = self
                    .selected
                    .min(self.conversations.len().saturating_sub(1));
                self.select_active();
            }
            UiUpdate::ConversationOpened(_) => {
                self.scroll_from_bottom = 0;
                self.notice = None;
                self.select_active();
            }
            UiUpdate::ConversationCleared => self.scroll_from_bottom = 0,
            UiUpdate::Alert(message) => self.dialogs.push_back(Dialog::Alert(message)),
            UiUpdate::PermissionRequest(request) => {
                self.dialogs.push_back(Dialog::Permission(request))
            }
        }
    }

    fn on_input_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext) {
        match event {
            UserInputEvent::Text(text) => self.submit_or_answer(text, ctx),
            UserInputEvent::Interrupt => self.interrupt(ctx),
            UserInputEvent::Scroll(action) => self.scroll(action),
            UserInputEvent::Command(command) => self.run_command(command, ctx),
        }
    }

    fn is_streaming(&self) -> bool {
        self.busy
    }
}

/// Wires the HTTP client, notifier and session into a runnable UI loop.
pub fn build_runtime(config: &Config) -> Result<(Runtime<App>, RuntimeContext)> {
    let client = ApiClient::new(config)?;
    let (update_tx, update_rx) = mpsc::unbounded_channel::<UiUpdate>();
    let notifier = TerminalNotifier::new(config.notification_permission, update_tx.clone());
    let session = ChatSession::new(
        Arc::new(client),
        Arc::new(TerminalMarkdown),
        Arc::new(notifier),
        update_tx,
    );

    let ctx = RuntimeContext::new(session.clone(), CancellationToken::new());
    let runtime = Runtime::new(App::new(session), update_rx);
    Ok((runtime, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::MockChatService;
    use crate::runtime::notify::recording::RecordingNotifier;
    use crate::runtime::notify::Permission;
    use crate::state::Placeholder;
    use crate::types::{Message, Role};
    use crate::ui::markdown::PlainText;
    use pretty_assertions::assert_eq;

    struct Harness {
        app: App,
        ctx: RuntimeContext,
        service: Arc<MockChatService>,
        update_rx: mpsc::UnboundedReceiver<UiUpdate>,
    }

    fn harness(service: MockChatService) -> Harness {
        let service = Arc::new(service);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(
            service.clone(),
            Arc::new(PlainText),
            Arc::new(RecordingNotifier::new(Permission::Denied)),
            update_tx,
        );
        Harness {
            app: App::new(session.clone()),
            ctx: RuntimeContext::new(session, CancellationToken::new()),
            service,
            update_rx,
        }
    }

    fn summary(id: i64, title: &str) -> ConversationSummary {
        ConversationSummary {
            id: ConversationId(id),
            title: title.to_string(),
        }
    }

    impl Harness {
        /// Feeds background updates to the app until `done` says stop.
        async fn pump_until(&mut self, done: impl Fn(&UiUpdate) -> bool) {
            while let Some(update) = self.update_rx.recv().await {
                let stop = done(&update);
                self.app.on_background_update(update, &mut self.ctx);
                if stop {
                    return;
                }
            }
        }

        fn event(&mut self, event: UserInputEvent) {
            self.app.on_input_event(event, &mut self.ctx);
        }

        fn text(&mut self, text: &str) {
            self.event(UserInputEvent::Text(text.to_string()));
        }
    }

    #[tokio::test]
    async fn test_send_is_disabled_while_busy_or_blank() {
        let mut h = harness(MockChatService::new());
        assert!(!h.app.can_submit("   "));
        assert!(h.app.can_submit("hi"));

        h.service
            .push_chat_chunks(&["{\"type\":\"content\",\"data\":\"pong\"}\n"]);
        h.text("ping");
        assert!(h.app.is_streaming());
        assert!(!h.app.can_submit("again"));

        h.text("again");
        assert!(h.app.status_line().contains("busy"));

        h.pump_until(|u| matches!(u, UiUpdate::TurnComplete)).await;
        assert!(!h.app.is_streaming());
        assert_eq!(h.service.sent_chats().len(), 1);
        assert_eq!(h.app.header_title(), "ping...");
        assert_eq!(h.app.conversations().len(), 1);
    }

    #[tokio::test]
    async fn test_header_falls_back_without_conversation() {
        let h = harness(MockChatService::new());
        assert_eq!(h.app.header_title(), NO_CONVERSATION_TITLE);
        assert!(h.app.status_line().starts_with("mode:ready"));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut h = harness(
            MockChatService::new()
                .with_conversation(1, "a", Vec::new())
                .with_conversation(2, "b", Vec::new()),
        );
        h.app.on_background_update(
            UiUpdate::ConversationsLoaded(vec![summary(2, "b"), summary(1, "a")]),
            &mut h.ctx,
        );

        h.event(UserInputEvent::Command(Command::DeleteSelected));
        assert_eq!(h.app.modal().map(|m| m.body), Some(DELETE_PROMPT));
        h.text("n");
        assert!(!h.app.overlay_active());
        assert_eq!(h.service.conversation_titles(), vec!["a", "b"]);

        h.event(UserInputEvent::Command(Command::DeleteSelected));
        h.text("y");
        h.pump_until(|u| matches!(u, UiUpdate::ConversationsLoaded(_)))
            .await;
        assert_eq!(h.service.conversation_titles(), vec!["a"]);
        assert_eq!(h.app.conversations().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_open_conversation_resets_header() {
        let mut h = harness(MockChatService::new().with_conversation(1, "Trip", Vec::new()));
        h.app
            .on_background_update(UiUpdate::ConversationsLoaded(vec![summary(1, "Trip")]), &mut h.ctx);
        h.event(UserInputEvent::Command(Command::OpenSelected));
        h.pump_until(|u| matches!(u, UiUpdate::ConversationOpened(_)))
            .await;
        assert_eq!(h.app.header_title(), "Trip");

        h.event(UserInputEvent::Command(Command::DeleteSelected));
        h.text("enter");
        h.pump_until(|u| matches!(u, UiUpdate::ConversationsLoaded(_)))
            .await;
        assert_eq!(h.app.header_title(), NO_CONVERSATION_TITLE);
        assert_eq!(
            h.app.session().with_view(|v| v.placeholder()),
            Some(Placeholder::Deleted)
        );
    }

    #[tokio::test]
    async fn test_permission_request_is_answered_through_dialog() {
        let mut h = harness(MockChatService::new());
        let (request, answer_rx) = PermissionRequest::test_stub();
        h.app
            .on_background_update(UiUpdate::PermissionRequest(request), &mut h.ctx);
        assert_eq!(h.app.modal().map(|m| m.title), Some("Notifications"));
        assert!(!h.app.can_submit("hello"));

        h.text("maybe");
        assert!(h.app.overlay_active());
        h.text("y");
        assert!(!h.app.overlay_active());
        assert_eq!(answer_rx.await, Ok(true));
    }

    #[tokio::test]
    async fn test_interrupt_dismisses_dialog_before_quitting() {
        let mut h = harness(MockChatService::new());
        h.app.on_background_update(
            UiUpdate::Alert("Failed to delete conversation.".to_string()),
            &mut h.ctx,
        );
        h.event(UserInputEvent::Interrupt);
        assert!(!h.app.overlay_active());
        assert!(!h.app.quit_requested());

        h.event(UserInputEvent::Interrupt);
        assert!(h.app.quit_requested());
    }

    #[tokio::test]
    async fn test_dialogs_queue_in_arrival_order() {
        let mut h = harness(MockChatService::new());
        h.app
            .on_background_update(UiUpdate::Alert("first".to_string()), &mut h.ctx);
        h.app
            .on_background_update(UiUpdate::Alert("second".to_string()), &mut h.ctx);
        assert_eq!(h.app.modal().map(|m| m.body), Some("first"));
        h.text("esc");
        assert_eq!(h.app.modal().map(|m| m.body), Some("second"));
    }

    #[tokio::test]
    async fn test_selection_stays_in_bounds() {
        let mut h = harness(MockChatService::new());
        h.app.on_background_update(
            UiUpdate::ConversationsLoaded(vec![summary(3, "c"), summary(2, "b")]),
            &mut h.ctx,
        );
        h.event(UserInputEvent::Command(Command::SelectPrevious));
        assert_eq!(h.app.selected_index(), Some(0));
        h.event(UserInputEvent::Command(Command::SelectNext));
        h.event(UserInputEvent::Command(Command::SelectNext));
        assert_eq!(h.app.selected_index(), Some(1));

        h.app
            .on_background_update(UiUpdate::ConversationsLoaded(Vec::new()), &mut h.ctx);
        assert_eq!(h.app.selected_index(), None);
    }

    #[tokio::test]
    async fn test_scrolling_up_stops_following_until_end() {
        let mut h = harness(MockChatService::new().with_conversation(
            1,
            "chat",
            (0..10)
                .map(|i| Message::new(Role::Assistant, format!("line {i}")))
                .collect(),
        ));
        h.app
            .on_background_update(UiUpdate::ConversationsLoaded(vec![summary(1, "chat")]), &mut h.ctx);
        h.event(UserInputEvent::Command(Command::OpenSelected));
        h.pump_until(|u| matches!(u, UiUpdate::ConversationOpened(_)))
            .await;

        h.event(UserInputEvent::Scroll(ScrollAction::PageUp(5)));
        assert_eq!(h.app.scroll_from_bottom(), 5);
        assert!(h.app.status_line().contains("view:scrolled"));
        h.app.on_background_update(UiUpdate::TurnProgress, &mut h.ctx);
        assert_eq!(h.app.scroll_from_bottom(), 5);

        h.event(UserInputEvent::Scroll(ScrollAction::Home));
        assert_eq!(h.app.scroll_from_bottom(), h.app.max_scroll());
        h.event(UserInputEvent::Scroll(ScrollAction::End));
        assert_eq!(h.app.scroll_from_bottom(), 0);
    }

    #[tokio::test]
    async fn test_scroll_limit_counts_wrapped_rows() {
        let mut h = harness(MockChatService::new().with_conversation(
            1,
            "long",
            vec![Message::new(Role::Assistant, "a".repeat(100))],
        ));
        h.app
            .on_background_update(UiUpdate::ConversationsLoaded(vec![summary(1, "long")]), &mut h.ctx);
        h.event(UserInputEvent::Command(Command::OpenSelected));
        h.pump_until(|u| matches!(u, UiUpdate::ConversationOpened(_)))
            .await;

        h.app.record_history_viewport(10, 3);
        let (logical, wrapped) = h.app.session().with_view(|view| {
            let lines = conversation_lines(view);
            (lines.len(), wrapped_row_count(&lines, 10))
        });
        assert!(wrapped > logical + 3);

        h.event(UserInputEvent::Scroll(ScrollAction::Home));
        assert_eq!(h.app.scroll_from_bottom(), wrapped - 3);
        h.event(UserInputEvent::Scroll(ScrollAction::PageUp(50)));
        assert_eq!(h.app.scroll_from_bottom(), wrapped - 3);
    }

    #[tokio::test]
    async fn test_toggle_tool_args_without_tools_leaves_notice() {
        let mut h = harness(MockChatService::new());
        h.event(UserInputEvent::Command(Command::ToggleToolArgs));
        assert!(h.app.status_line().contains("no tool calls"));

        h.event(UserInputEvent::Command(Command::ToggleSidebar));
        assert!(!h.app.sidebar_visible());
    }
}
