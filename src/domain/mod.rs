//! Domain types and the pure transforms over them.
//!
//! Nothing in this layer performs I/O; the collaborators the application layer
//! talks to are declared in [`ports`].

pub mod cache;
pub mod comment;
pub mod pledge;
pub mod ports;
pub mod reaction;
pub mod response;
