use crate::domain::cache::{CacheEntry, CacheKey, Snapshot};
use crate::domain::comment::{
    CommentNode, is_optimistic_id, locate_and_transform, prepend, remove_node,
};
use crate::domain::ports::{CacheStore, CacheStoreRef, IdentityRef, NotifierRef, TransportRef};
use crate::domain::reaction::ReactionAggregate;
use crate::domain::response::{first_created, normalize_data};
use crate::error::{CacheError, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

/// A request to post a comment, optionally as a reply.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddComment {
    pub container_id: String,
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl AddComment {
    fn validate(&self) -> Result<()> {
        require("container id", &self.container_id)?;
        if self.body.trim().is_empty() {
            return Err(CacheError::ValidationError(
                "Comment body must not be empty".to_string(),
            ));
        }
        if let Some(parent) = &self.parent_id {
            require("parent id", parent)?;
            stable_id(parent)?;
        }
        Ok(())
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(CacheError::ValidationError(format!("Missing {what}")))
    } else {
        Ok(())
    }
}

fn stable_id(id: &str) -> Result<()> {
    if is_optimistic_id(id) {
        Err(CacheError::ValidationError(format!(
            "Comment {id} is not confirmed yet"
        )))
    } else {
        Ok(())
    }
}

/// One mutation's hold on a cache key between its optimistic write and
/// settlement. `commit` and `rollback` consume it, so exactly one of them runs.
struct InFlight<'a> {
    cache: &'a dyn CacheStore,
    key: CacheKey,
    snapshot: Option<Snapshot>,
    wrote: bool,
}

impl<'a> InFlight<'a> {
    /// Cancels in-flight reads for `key`, then snapshots it when an
    /// optimistic write may follow. The order is load-bearing: a read that
    /// resolved after the snapshot would overwrite the optimistic value.
    async fn begin(cache: &'a dyn CacheStore, key: CacheKey, optimistic: bool) -> Result<Self> {
        cache.cancel_in_flight(&key).await?;
        let snapshot = if optimistic {
            Some(match cache.get(&key).await? {
                Some(entry) => Snapshot::Present(entry),
                None if cache.needs_refetch(&key).await? => Snapshot::Stale,
                None => Snapshot::Absent,
            })
        } else {
            None
        };
        debug!(key = %key, optimistic, "mutation started");
        Ok(Self {
            cache,
            key,
            snapshot,
            wrote: false,
        })
    }

    fn prior(&self) -> Option<&CacheEntry> {
        self.snapshot.as_ref().and_then(Snapshot::entry)
    }

    async fn write(&mut self, entry: CacheEntry) -> Result<()> {
        self.cache.set(&self.key, entry).await?;
        self.wrote = true;
        Ok(())
    }

    /// The server is authoritative: drop whatever we wrote and refetch.
    async fn commit(self) {
        if let Err(e) = self.cache.invalidate(&self.key).await {
            error!(key = %self.key, error = %e, "failed to invalidate after commit");
        }
        debug!(key = %self.key, "mutation committed");
    }

    async fn rollback(mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            if self.wrote {
                let err = CacheError::RollbackInvariant(format!("no snapshot for {}", self.key));
                error!(error = %err, "cache left with optimistic value");
            }
            return;
        };
        if !self.wrote {
            return;
        }
        let restored = match snapshot {
            Snapshot::Present(entry) => self.cache.set(&self.key, entry).await,
            Snapshot::Absent => self.cache.remove(&self.key).await,
            Snapshot::Stale => self.cache.invalidate(&self.key).await,
        };
        match restored {
            Ok(()) => warn!(key = %self.key, "optimistic write rolled back"),
            Err(e) => error!(key = %self.key, error = %e, "failed to restore snapshot"),
        }
    }
}

/// Applies user actions to the cache ahead of the server, then reconciles.
///
/// Every mutation runs cancel → snapshot → optimistic write → remote call,
/// and then either commits (invalidates the key) or rolls back (restores the
/// snapshot verbatim). Mutations on the same key are expected to be serialized
/// by the caller; if they overlap, whichever settles last wins.
#[derive(Clone)]
pub struct MutationCoordinator {
    cache: CacheStoreRef,
    transport: TransportRef,
    identity: IdentityRef,
    notifier: NotifierRef,
}

impl MutationCoordinator {
    pub fn new(
        cache: CacheStoreRef,
        transport: TransportRef,
        identity: IdentityRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            cache,
            transport,
            identity,
            notifier,
        }
    }

    pub fn cache(&self) -> &CacheStoreRef {
        &self.cache
    }

    /// Posts a comment, showing it immediately as a pending node.
    ///
    /// Returns the created comment as reported by the server, or `None` when
    /// the server returned an empty creation list.
    #[tracing::instrument(skip_all, fields(container = %request.container_id))]
    pub async fn add_comment(&self, request: AddComment) -> Result<Option<CommentNode>> {
        request.validate()?;
        let key = CacheKey::Comments(request.container_id.clone());
        let user = self.identity.current_user();
        let mut mutation = InFlight::begin(self.cache.as_ref(), key, user.is_some()).await?;

        if let Some(user) = user {
            let node = CommentNode::optimistic(
                request.parent_id.clone(),
                user.id,
                request.body.clone(),
                Utc::now(),
            );
            let tree = match mutation.prior() {
                None => Some(&[][..]),
                Some(entry) => entry.as_comments(),
            };
            if let Some(tree) = tree {
                let located =
                    locate_and_transform(tree, request.parent_id.as_deref(), prepend(node));
                if located.found {
                    let tree = located.into_tree();
                    mutation.write(CacheEntry::Comments(tree)).await?;
                } else {
                    debug!("parent not in cached tree, no optimistic insert");
                }
            } else {
                warn!("cache entry is not a comment tree, no optimistic insert");
            }
        } else {
            debug!("no signed-in user, no optimistic insert");
        }

        let outcome = self.post_comment(&request).await;
        self.settle(mutation, outcome, "Could not post your comment")
            .await
    }

    async fn post_comment(&self, request: &AddComment) -> Result<Option<CommentNode>> {
        let mut body = json!({
            "containerId": request.container_id,
            "body": request.body,
        });
        if let Some(parent) = &request.parent_id {
            body["parentId"] = json!(parent);
        }
        let path = format!("/containers/{}/comments", request.container_id);
        let raw = self.transport.post(&path, body).await?;
        first_created(raw)?
            .map(serde_json::from_value::<CommentNode>)
            .transpose()
            .map_err(|e| CacheError::malformed(format!("Invalid comment in response: {e}")))
    }

    /// Deletes a comment and its replies, hiding them immediately.
    #[tracing::instrument(skip(self))]
    pub async fn delete_comment(&self, container_id: &str, comment_id: &str) -> Result<()> {
        require("container id", container_id)?;
        require("comment id", comment_id)?;
        stable_id(comment_id)?;

        let key = CacheKey::Comments(container_id.to_string());
        let signed_in = self.identity.current_user().is_some();
        let mut mutation = InFlight::begin(self.cache.as_ref(), key, signed_in).await?;

        if let Some(tree) = mutation.prior().and_then(CacheEntry::as_comments) {
            let located = remove_node(tree, comment_id);
            if located.found {
                let tree = located.into_tree();
                mutation.write(CacheEntry::Comments(tree)).await?;
            }
        }

        let outcome: Result<()> = async {
            let raw = self
                .transport
                .delete(&format!("/comments/{comment_id}"))
                .await?;
            normalize_data(raw).map(|_| ())
        }
        .await;
        self.settle(mutation, outcome, "Could not delete the comment")
            .await
    }

    /// Toggles the current user's reaction of `kind` on `target_id`.
    ///
    /// Only a cached aggregate is updated optimistically; an uncached target
    /// just sees the remote call and a refetch.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_reaction(&self, target_id: &str, kind: &str) -> Result<()> {
        require("target id", target_id)?;
        require("reaction kind", kind)?;

        let key = CacheKey::Reactions(target_id.to_string());
        let signed_in = self.identity.current_user().is_some();
        let mut mutation = InFlight::begin(self.cache.as_ref(), key, signed_in).await?;

        let next = mutation
            .prior()
            .and_then(CacheEntry::as_reactions)
            .map(|agg: &ReactionAggregate| agg.toggled(kind));
        if let Some((next, branch)) = next {
            debug!(?branch, "optimistic reaction toggle");
            mutation.write(CacheEntry::Reactions(next)).await?;
        }

        let outcome: Result<()> = async {
            let raw = self
                .transport
                .post(&format!("/reactions/{target_id}"), json!({ "kind": kind }))
                .await?;
            normalize_data(raw).map(|_| ())
        }
        .await;
        self.settle(mutation, outcome, "Could not update your reaction")
            .await
    }

    /// Likes or un-likes `target_id` depending on the cached state.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_like(&self, target_id: &str) -> Result<()> {
        require("target id", target_id)?;

        let key = CacheKey::Likes(target_id.to_string());
        let signed_in = self.identity.current_user().is_some();
        let mut mutation = InFlight::begin(self.cache.as_ref(), key.clone(), signed_in).await?;

        let prior = match mutation.prior() {
            Some(entry) => entry.as_likes().copied(),
            // Without a snapshot we still need the current state to pick the call.
            None if !signed_in => self
                .cache
                .get(&key)
                .await?
                .as_ref()
                .and_then(CacheEntry::as_likes)
                .copied(),
            None => None,
        };
        let unlike = prior.is_some_and(|p| p.has_current_user_liked);
        if signed_in && let Some(prior) = prior {
            mutation.write(CacheEntry::Likes(prior.toggled())).await?;
        }

        let path = format!("/likes/{target_id}");
        let outcome: Result<()> = async {
            let raw = if unlike {
                self.transport.delete(&path).await?
            } else {
                self.transport.post(&path, json!({})).await?
            };
            normalize_data(raw).map(|_| ())
        }
        .await;
        self.settle(mutation, outcome, "Could not update your like")
            .await
    }

    async fn settle<T>(
        &self,
        mutation: InFlight<'_>,
        outcome: Result<T>,
        failure_message: &str,
    ) -> Result<T> {
        match outcome {
            Ok(value) => {
                mutation.commit().await;
                Ok(value)
            }
            Err(e) => {
                mutation.rollback().await;
                warn!(error = %e, "mutation failed");
                self.notifier.error(failure_message);
                Err(e)
            }
        }
    }
}
