use super::mode::RuntimeMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp(usize),
    PageDown(usize),
    Home,
    End,
}

/// Conversation-level actions bound to dedicated keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    NewConversation,
    SelectPrevious,
    SelectNext,
    OpenSelected,
    DeleteSelected,
    ToggleSidebar,
    ToggleToolArgs,
}

#[derive(Debug, PartialEq, Eq)]
pub enum UserInputEvent {
    /// A submitted prompt, or a dialog answer (`y`, `n`, `enter`, `esc`).
    Text(String),
    Interrupt,
    Scroll(ScrollAction),
    Command(Command),
}

pub trait FrontendAdapter<M: RuntimeMode> {
    fn poll_user_input(&mut self, mode: &M) -> Option<UserInputEvent>;
    fn render(&mut self, mode: &M);
    fn should_quit(&self) -> bool;
}
