//! Session ownership and identity.
//!
//! A [`Session`] wraps one conversation machine together with its output sink,
//! undelivered backlog and confirmation timer. The [`SessionRegistry`] maps
//! session keys to sessions and reconciles keys that turn out to name the same
//! conversation.

mod registry;
mod session;
mod sink;

pub use registry::{KeySource, Reconciled, RegistryError, SessionRegistry};
pub use session::{DEFAULT_CONFIRM_TIMEOUT, Dispatch, MAX_BACKLOG, Session};
pub use sink::{ChannelSink, EventSink, SharedSink, SinkClosed, same_sink};

#[cfg(test)]
pub(crate) mod testing;
