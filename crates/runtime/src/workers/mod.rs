//! Worker tasks behind each session.
//!
//! Every session runs two tasks: the actor, which owns the state and
//! processes commands one at a time, and the outbound worker, which
//! persists and then delivers what the actor committed.

mod outbound;
mod session;

pub(crate) use outbound::{Outbound, OutboundWorker};
pub(crate) use session::{SessionContext, SpawnedSession, spawn_session};
