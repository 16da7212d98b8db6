//! Conversation state machine.
//!
//! The machine is pure: [`transition`] maps `(state, context, event)` to the next
//! state and an ordered list of [`Effect`]s. Timers, socket writes and payment
//! calls are carried out by [`crate::core::session::Session`], which owns the
//! machine for one logical conversation.

mod effect;
mod event;
mod outbound;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Settlement};
pub use event::{Event, Risk};
pub use outbound::OutboundEvent;
pub use state::{ConversationContext, ConversationState, FriendEntry, PendingArgs};
pub use transition::{TransitionResult, transition};
