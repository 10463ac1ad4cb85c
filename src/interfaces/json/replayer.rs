use super::scenario_reader::Step;
use crate::application::coordinator::{AddComment, MutationCoordinator};
use crate::domain::cache::CacheEntry;
use crate::domain::ports::{CacheStore, NotifierRef};
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryCacheStore;
use crate::infrastructure::scripted::ScriptedTransport;
use crate::infrastructure::session::SessionIdentity;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Drives a [`MutationCoordinator`] from scenario steps, answering each remote
/// call with the response scripted in the step.
pub struct Replayer {
    store: InMemoryCacheStore,
    transport: Arc<ScriptedTransport>,
    identity: Arc<SessionIdentity>,
    coordinator: MutationCoordinator,
}

impl Replayer {
    pub fn new(notifier: NotifierRef) -> Self {
        let store = InMemoryCacheStore::new();
        let transport = Arc::new(ScriptedTransport::new());
        let identity = Arc::new(SessionIdentity::default());
        let coordinator = MutationCoordinator::new(
            Arc::new(store.clone()),
            transport.clone(),
            identity.clone(),
            notifier,
        );
        Self {
            store,
            transport,
            identity,
            coordinator,
        }
    }

    /// Applies one step. Remote failures are returned after the cache has
    /// been restored.
    ///
    /// A step's scripted response only ever answers that step: if the step
    /// fails validation before reaching the transport, its response is
    /// discarded rather than left for the next step.
    pub async fn apply(&self, step: Step) -> Result<()> {
        let outcome = match step {
            Step::Seed { key, value } => return self.store.set(&key, value).await,
            Step::SignIn { user } => {
                self.identity.sign_in(user);
                return Ok(());
            }
            Step::SignOut => {
                self.identity.sign_out();
                return Ok(());
            }
            Step::AddComment {
                container_id,
                body,
                parent_id,
                response,
            } => {
                self.transport.push(response).await;
                self.coordinator
                    .add_comment(AddComment {
                        container_id,
                        body,
                        parent_id,
                    })
                    .await
                    .map(|_| ())
            }
            Step::DeleteComment {
                container_id,
                comment_id,
                response,
            } => {
                self.transport.push(response).await;
                self.coordinator
                    .delete_comment(&container_id, &comment_id)
                    .await
            }
            Step::ToggleReaction {
                target_id,
                kind,
                response,
            } => {
                self.transport.push(response).await;
                self.coordinator.toggle_reaction(&target_id, &kind).await
            }
            Step::ToggleLike {
                target_id,
                response,
            } => {
                self.transport.push(response).await;
                self.coordinator.toggle_like(&target_id).await
            }
        };

        let unused = self.transport.discard_unused().await;
        if unused > 0 {
            debug!(unused, "step finished without using its scripted response");
        }
        outcome
    }

    /// Consumes the replayer and returns the final cache contents.
    pub async fn into_results(self) -> BTreeMap<String, CacheEntry> {
        self.store.entries().await
    }
}
