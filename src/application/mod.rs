//! Application layer orchestrating the cache against the remote API.
//!
//! [`coordinator::MutationCoordinator`] applies user actions optimistically and
//! reconciles them with the server; [`settlement::SettlementPoller`] observes
//! pledges until they settle. Both share one session-scoped cache store.

pub mod coordinator;
pub mod settlement;
