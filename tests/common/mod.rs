#![allow(dead_code)]

use chrono::DateTime;
use optimistic_cache::application::coordinator::MutationCoordinator;
use optimistic_cache::application::settlement::SettlementPoller;
use optimistic_cache::domain::comment::CommentNode;
use optimistic_cache::domain::pledge::PollSchedule;
use optimistic_cache::domain::ports::{CurrentUser, Notifier};
use optimistic_cache::infrastructure::in_memory::InMemoryCacheStore;
use optimistic_cache::infrastructure::scripted::ScriptedTransport;
use optimistic_cache::infrastructure::session::SessionIdentity;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub struct Harness {
    pub store: InMemoryCacheStore,
    pub transport: Arc<ScriptedTransport>,
    pub identity: Arc<SessionIdentity>,
    pub notifier: Arc<RecordingNotifier>,
    pub coordinator: MutationCoordinator,
    pub poller: SettlementPoller,
}

pub fn user() -> CurrentUser {
    CurrentUser {
        id: "u1".to_string(),
        display_name: "Ada".to_string(),
        avatar_url: None,
    }
}

fn build(transport: ScriptedTransport, signed_in: bool, schedule: PollSchedule) -> Harness {
    let store = InMemoryCacheStore::new();
    let transport = Arc::new(transport);
    let identity = Arc::new(SessionIdentity::new(signed_in.then(user)));
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator = MutationCoordinator::new(
        Arc::new(store.clone()),
        transport.clone(),
        identity.clone(),
        notifier.clone(),
    );
    let poller = SettlementPoller::new(
        Arc::new(store.clone()),
        transport.clone(),
        notifier.clone(),
        schedule,
    );
    Harness {
        store,
        transport,
        identity,
        notifier,
        coordinator,
        poller,
    }
}

/// Signed-in session with an instant transport.
pub fn harness() -> Harness {
    build(ScriptedTransport::new(), true, PollSchedule::default())
}

/// Signed-in session whose transport answers after `latency`.
pub fn slow_harness(latency: Duration) -> Harness {
    build(
        ScriptedTransport::new().with_latency(latency),
        true,
        PollSchedule::default(),
    )
}

pub fn anonymous_harness() -> Harness {
    build(ScriptedTransport::new(), false, PollSchedule::default())
}

pub fn comment(id: &str, children: Vec<CommentNode>) -> CommentNode {
    CommentNode {
        id: id.to_string(),
        parent_id: None,
        author_id: "u2".to_string(),
        body: format!("body of {id}"),
        created_at: DateTime::from_timestamp(1_714_557_600, 0).unwrap(),
        children,
        pending: false,
    }
}

/// Server JSON for a created comment.
pub fn created_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "authorId": "u1",
        "body": "hello",
        "createdAt": "2024-05-01T10:00:00Z",
        "replies": []
    })
}
