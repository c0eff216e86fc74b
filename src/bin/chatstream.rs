use anyhow::Result;
use chatstream::api::logging::init_logging;
use chatstream::app::{build_runtime, App};
use chatstream::config::Config;
use chatstream::runtime::frontend::{Command, FrontendAdapter, ScrollAction, UserInputEvent};
use chatstream::runtime::mode::RuntimeMode;
use chatstream::terminal;
use chatstream::ui::editor::PromptEditor;
use chatstream::ui::layout::split_chat_layout;
use chatstream::ui::render::{
    conversation_lines, input_visual_rows, render_header, render_history, render_input,
    render_modal, render_sidebar,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::Clear;
use std::time::Duration;

const SIDEBAR_WIDTH: u16 = 28;
const MAX_INPUT_ROWS: usize = 6;
const PAGE_ROWS: usize = 10;

struct TerminalFrontend {
    terminal: terminal::ChatTerminal,
    editor: PromptEditor,
    quit: bool,
}

fn ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

fn typed_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(ch)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            Some(ch)
        }
        _ => None,
    }
}

impl TerminalFrontend {
    fn new() -> Result<Self> {
        Ok(Self {
            terminal: terminal::setup()?,
            editor: PromptEditor::new(),
            quit: false,
        })
    }

    fn map_dialog_key(&mut self, key: KeyEvent) -> Option<UserInputEvent> {
        match key.code {
            KeyCode::Char('c') if ctrl(&key) => Some(UserInputEvent::Interrupt),
            KeyCode::Enter => Some(UserInputEvent::Text("enter".to_string())),
            KeyCode::Esc => Some(UserInputEvent::Text("esc".to_string())),
            _ => typed_char(&key).map(|ch| UserInputEvent::Text(ch.to_string())),
        }
    }

    fn map_regular_key(&mut self, key: KeyEvent, mode: &App) -> Option<UserInputEvent> {
        let command = |command| Some(UserInputEvent::Command(command));
        let scroll = |action| Some(UserInputEvent::Scroll(action));
        match key.code {
            KeyCode::Char('c') if ctrl(&key) => Some(UserInputEvent::Interrupt),
            KeyCode::Char('d') if ctrl(&key) => {
                if self.editor.is_empty() {
                    self.quit = true;
                }
                None
            }
            KeyCode::Char('j') if ctrl(&key) => {
                self.editor.insert_newline();
                None
            }
            KeyCode::Char('n') if ctrl(&key) => command(Command::NewConversation),
            KeyCode::Char('o') if ctrl(&key) => command(Command::OpenSelected),
            KeyCode::Char('x') if ctrl(&key) => command(Command::DeleteSelected),
            KeyCode::Char('b') if ctrl(&key) => command(Command::ToggleSidebar),
            KeyCode::Char('t') if ctrl(&key) => command(Command::ToggleToolArgs),
            KeyCode::Char('z') if ctrl(&key) => {
                self.editor.undo();
                None
            }
            KeyCode::Char('y') if ctrl(&key) => {
                self.editor.redo();
                None
            }
            KeyCode::Up if ctrl(&key) => command(Command::SelectPrevious),
            KeyCode::Down if ctrl(&key) => command(Command::SelectNext),
            KeyCode::Up => {
                self.editor.history_up();
                None
            }
            KeyCode::Down => {
                self.editor.history_down();
                None
            }
            KeyCode::PageUp => scroll(ScrollAction::PageUp(PAGE_ROWS)),
            KeyCode::PageDown => scroll(ScrollAction::PageDown(PAGE_ROWS)),
            KeyCode::Home if ctrl(&key) => scroll(ScrollAction::Home),
            KeyCode::End if ctrl(&key) => scroll(ScrollAction::End),
            KeyCode::Home => {
                self.editor.move_home();
                None
            }
            KeyCode::End => {
                self.editor.move_end();
                None
            }
            KeyCode::Left => {
                self.editor.move_left();
                None
            }
            KeyCode::Right => {
                self.editor.move_right();
                None
            }
            KeyCode::Backspace => {
                self.editor.backspace();
                None
            }
            KeyCode::Delete => {
                self.editor.delete();
                None
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.editor.insert_newline();
                None
            }
            KeyCode::Enter => {
                if !mode.can_submit(self.editor.buffer()) {
                    return None;
                }
                self.editor.take_submission().map(UserInputEvent::Text)
            }
            _ => {
                if let Some(ch) = typed_char(&key) {
                    self.editor.insert_str(ch.encode_utf8(&mut [0u8; 4]));
                }
                None
            }
        }
    }
}

impl Drop for TerminalFrontend {
    fn drop(&mut self) {
        terminal::restore();
    }
}

impl FrontendAdapter<App> for TerminalFrontend {
    fn poll_user_input(&mut self, mode: &App) -> Option<UserInputEvent> {
        if mode.quit_requested() {
            self.quit = true;
            return None;
        }

        let Ok(has_event) = event::poll(Duration::from_millis(16)) else {
            self.quit = true;
            return None;
        };
        if !has_event {
            return None;
        }
        let Ok(ev) = event::read() else {
            self.quit = true;
            return None;
        };

        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if mode.overlay_active() {
                    self.map_dialog_key(key)
                } else {
                    self.map_regular_key(key, mode)
                }
            }
            Event::Paste(text) if !mode.overlay_active() => {
                self.editor.insert_str(&text);
                None
            }
            _ => None,
        }
    }

    fn render(&mut self, mode: &App) {
        let title = mode.header_title();
        let status = mode.status_line();
        let lines = mode.session().with_view(|view| conversation_lines(view));
        let ready = !mode.overlay_active() && !mode.is_streaming();
        let input = self.editor.buffer();
        let cursor = self.editor.cursor();

        let _ = self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
            let input_width = area.width.saturating_sub(2).max(1) as usize;
            let input_rows = input_visual_rows(input, input_width).clamp(1, MAX_INPUT_ROWS) as u16;
            let sidebar_width = mode.sidebar_visible().then_some(SIDEBAR_WIDTH);
            let panes = split_chat_layout(area, input_rows, sidebar_width);

            if let Some(sidebar) = panes.sidebar {
                render_sidebar(
                    frame,
                    sidebar,
                    mode.conversations(),
                    mode.selected_index(),
                    mode.active_id(),
                );
            }
            mode.record_history_viewport(panes.history.width, panes.history.height);
            render_header(frame, panes.header, &title, &status);
            render_history(frame, panes.history, &lines, mode.scroll_from_bottom());
            render_input(frame, panes.input, input, cursor, ready);
            if let Some(modal) = mode.modal() {
                render_modal(frame, modal);
            }
        });
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    let _log_guard = init_logging(&config)?;
    tracing::info!(server_url = %config.server_url, "starting chatstream");

    let (mut runtime, mut ctx) = build_runtime(&config)?;
    ctx.refresh_conversations();
    ctx.start_polling(config.poll_interval, config.notification_title.clone());

    let mut frontend = TerminalFrontend::new()?;
    runtime.run(&mut frontend, &mut ctx).await;
    ctx.shutdown();
    Ok(())
}
