pub mod asr;
pub mod confirm;
pub mod conversation;
pub mod payments;
pub mod session;

pub use conversation::{ConversationState, Event, OutboundEvent, transition};
pub use session::{Session, SessionRegistry};
