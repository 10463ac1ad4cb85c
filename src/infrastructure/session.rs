use crate::domain::ports::{CurrentUser, Identity, Notifier};
use std::sync::RwLock;

/// Identity held in memory for the lifetime of a client session.
#[derive(Default)]
pub struct SessionIdentity {
    user: RwLock<Option<CurrentUser>>,
}

impl SessionIdentity {
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    pub fn sign_in(&self, user: CurrentUser) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Identity for SessionIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Sends notifications to the log.
#[derive(Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "notify", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::warn!(target: "notify", "{message}");
    }
}
