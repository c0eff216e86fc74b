use super::update::{PermissionRequest, UiUpdate};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

const PERMISSION_PROMPT: &str = "Show a desktop notification when new messages arrive?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Undecided,
    Granted,
    Denied,
}

/// Platform notification primitive.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Asks the user once; later calls return the remembered answer.
    fn request_permission(&self) -> BoxFuture<'_, Permission>;

    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Sends notifications as terminal escape sequences and asks for permission
/// through the UI's confirm dialog.
pub struct TerminalNotifier {
    permission: Mutex<Permission>,
    /// Held for the whole dialog so concurrent callers share one question.
    asking: AsyncMutex<()>,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
}

impl TerminalNotifier {
    pub fn new(permission: Permission, update_tx: mpsc::UnboundedSender<UiUpdate>) -> Self {
        Self {
            permission: Mutex::new(permission),
            asking: AsyncMutex::new(()),
            update_tx,
        }
    }

    fn set_permission(&self, permission: Permission) {
        *self
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = permission;
    }

    async fn ask(&self) -> Permission {
        let _asking = self.asking.lock().await;
        let current = self.permission();
        if current != Permission::Undecided {
            return current;
        }

        let (response_tx, response_rx) = oneshot::channel::<bool>();
        let request = PermissionRequest {
            prompt: PERMISSION_PROMPT.to_string(),
            response_tx,
        };
        if self
            .update_tx
            .send(UiUpdate::PermissionRequest(request))
            .is_err()
        {
            return Permission::Undecided;
        }

        // A dismissed dialog counts as a refusal so the user is not asked again.
        let answer = match response_rx.await {
            Ok(true) => Permission::Granted,
            Ok(false) | Err(_) => Permission::Denied,
        };
        self.set_permission(answer);
        tracing::info!(?answer, "notification permission decided");
        answer
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        *self
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        self.ask().boxed()
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        crate::terminal::send_desktop_notification(title, body)
    }
}

/// Runs the permission flow for one notification and sends it if allowed.
pub async fn notify_if_permitted(notifier: &dyn Notifier, title: &str, body: &str) -> bool {
    let permission = match notifier.permission() {
        Permission::Undecided => notifier.request_permission().await,
        decided => decided,
    };
    if permission != Permission::Granted {
        return false;
    }
    match notifier.notify(title, body) {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(error = %error, "desktop notification failed");
            false
        }
    }
}
