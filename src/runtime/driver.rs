use super::UiUpdate;
use crate::api::logging::{emit_dropped_partial_line, emit_transport_failure};
use crate::api::StreamParser;
use crate::state::{AssistantView, ChatSession, RenderState, TurnHandle};
use crate::types::ConversationId;
use anyhow::Result;
use futures::StreamExt;

/// Runs one chat turn from request to end of body.
pub struct StreamDriver {
    session: ChatSession,
}

impl StreamDriver {
    pub fn new(session: ChatSession) -> Self {
        Self { session }
    }

    /// Streams the assistant reply to `user_text` into the conversation view.
    ///
    /// Never fails: transport errors replace the assistant placeholder with an
    /// inline error and the turn ends. Polling is held off until this returns.
    pub async fn run(&self, conversation_id: ConversationId, user_text: &str) {
        let permit = match self.session.gate().begin_stream().await {
            Ok(permit) => permit,
            Err(error) => {
                emit_transport_failure(conversation_id, &error);
                self.session
                    .send_update(UiUpdate::TurnFailed(format!("{error:#}")));
                return;
            }
        };

        let handle = self.session.with_view(|view| {
            view.begin_turn(conversation_id, user_text, self.session.markdown())
        });
        if handle.is_none() {
            tracing::debug!(%conversation_id, "conversation no longer active; streaming detached");
        }
        self.session
            .send_update(UiUpdate::TurnStarted { conversation_id });

        let outcome = self.pump(conversation_id, user_text, handle).await;
        if let Err(error) = &outcome {
            emit_transport_failure(conversation_id, error);
            if let Some(handle) = handle {
                self.session
                    .with_view(|view| view.fail_turn(handle, self.session.markdown()));
            }
        }
        drop(permit);

        match outcome {
            Ok(()) => self.session.send_update(UiUpdate::TurnComplete),
            Err(error) => self
                .session
                .send_update(UiUpdate::TurnFailed(format!("{error:#}"))),
        }
    }

    async fn pump(
        &self,
        conversation_id: ConversationId,
        user_text: &str,
        handle: Option<TurnHandle>,
    ) -> Result<()> {
        let mut body = self
            .session
            .service()
            .send_chat(conversation_id, user_text)
            .await?;

        let mut parser = StreamParser::new();
        let mut state = RenderState::new();
        let mut assistant = AssistantView::new();

        while let Some(chunk) = body.next().await {
            let events = parser.process(&chunk?);
            if events.is_empty() {
                continue;
            }
            for event in &events {
                state.apply(event, &mut assistant, self.session.markdown());
            }
            if let Some(handle) = handle {
                self.session
                    .with_view(|view| view.publish_turn(handle, &assistant));
            }
            self.session.send_update(UiUpdate::TurnProgress);
        }

        if parser.malformed_lines() > 0 {
            tracing::warn!(
                %conversation_id,
                malformed = parser.malformed_lines(),
                "chat turn skipped malformed lines"
            );
        }
        if let Some(fragment) = parser.finish() {
            emit_dropped_partial_line(conversation_id, &fragment);
        }
        tracing::info!(
            %conversation_id,
            chars = state.accumulated_text().len(),
            tools = state.tool_blocks().len(),
            "chat turn complete"
        );
        Ok(())
    }
}
