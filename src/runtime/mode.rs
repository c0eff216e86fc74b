use super::context::RuntimeContext;
use super::frontend::UserInputEvent;
use super::UiUpdate;

/// UI-side state driven by [`super::r#loop::Runtime`].
pub trait RuntimeMode {
    /// Applies one message sent by a background task.
    fn on_background_update(&mut self, update: UiUpdate, ctx: &mut RuntimeContext);

    fn on_input_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext);

    /// True while a chat turn is streaming.
    fn is_streaming(&self) -> bool;
}
