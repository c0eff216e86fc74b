use super::notify::notify_if_permitted;
use super::UiUpdate;
use crate::api::logging::emit_poll_failure;
use crate::state::ChatSession;
use crate::types::Message;
use anyhow::Result;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const NOTIFICATION_BODY_CHARS: usize = 200;

/// Periodically appends messages the server has that the view does not show yet.
pub struct PollReconciler {
    session: ChatSession,
    interval: Duration,
    notification_title: String,
}

impl PollReconciler {
    pub fn new(session: ChatSession, interval: Duration, notification_title: String) -> Self {
        Self {
            session,
            interval,
            notification_title,
        }
    }

    /// One reconciliation pass; returns how many messages were appended.
    ///
    /// Skips without fetching when no conversation is active or a turn holds
    /// the gate. A result that arrives after the user switched conversation is
    /// dropped.
    pub async fn reconcile_once(&self) -> Result<usize> {
        let Some((conversation_id, epoch)) = self
            .session
            .with_view(|view| view.active_id().map(|id| (id, view.epoch())))
        else {
            return Ok(0);
        };
        let Some(permit) = self.session.gate().try_begin_reconcile() else {
            tracing::trace!(%conversation_id, "turn in flight; skipping poll");
            return Ok(0);
        };

        let messages = match self.session.service().list_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(error) => {
                emit_poll_failure(conversation_id, &error);
                return Err(error);
            }
        };

        let appended = self.session.with_view(|view| {
            if view.epoch() != epoch {
                return None;
            }
            Some(view.reconcile(&messages, self.session.markdown()))
        });
        drop(permit);

        let Some(appended) = appended else {
            tracing::debug!(%conversation_id, "conversation changed during poll; discarding");
            return Ok(0);
        };
        if appended == 0 {
            return Ok(0);
        }

        tracing::info!(%conversation_id, appended, "appended out-of-band messages");
        self.session
            .send_update(UiUpdate::MessagesAppended { count: appended });
        if let Some(newest) = messages.last() {
            self.spawn_notification(newest);
        }
        Ok(appended)
    }

    fn spawn_notification(&self, newest: &Message) {
        let notifier = self.session.notifier();
        let title = self.notification_title.clone();
        let body: String = newest.content.chars().take(NOTIFICATION_BODY_CHARS).collect();
        tokio::spawn(async move {
            notify_if_permitted(notifier.as_ref(), &title, &body).await;
        });
    }

    /// Ticks every interval until `cancel` fires. Failures are already logged by
    /// `reconcile_once` and simply retried on the next tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the view was just loaded.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let _ = self.reconcile_once().await;
                }
            }
        }
        tracing::debug!("poll reconciler stopped");
    }
}
