use super::UiUpdate;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use super::{context::RuntimeContext, frontend::FrontendAdapter, mode::RuntimeMode};

pub struct Runtime<M: RuntimeMode> {
    pub mode: M,
    update_rx: mpsc::UnboundedReceiver<UiUpdate>,
}

impl<M: RuntimeMode> Runtime<M> {
    pub fn new(mode: M, update_rx: mpsc::UnboundedReceiver<UiUpdate>) -> Self {
        Self { mode, update_rx }
    }

    /// Drives the UI until the frontend asks to quit: apply background updates,
    /// draw, then handle at most one input event per tick.
    pub async fn run<F: FrontendAdapter<M>>(&mut self, frontend: &mut F, ctx: &mut RuntimeContext) {
        loop {
            if !self.drain_updates(ctx) {
                tracing::debug!("update channel closed; leaving UI loop");
                break;
            }
            frontend.render(&self.mode);
            if let Some(event) = frontend.poll_user_input(&self.mode) {
                self.mode.on_input_event(event, ctx);
            }
            if frontend.should_quit() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    fn drain_updates(&mut self, ctx: &mut RuntimeContext) -> bool {
        loop {
            match self.update_rx.try_recv() {
                Ok(update) => self.mode.on_background_update(update, ctx),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}
