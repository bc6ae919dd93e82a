//! In-process event delivery.
//!
//! [`EventBus`] is the local [`crate::repository::Broadcaster`]: each session
//! and each player of a session gets its own topic, and subscribers only see
//! the topics they asked for.

mod bus;

pub use bus::{EventBus, Topic};
