use super::outbound::OutboundEvent;
use super::state::PendingArgs;

/// A confirmed money action, ready to hand to the payment collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub sentence: Option<String>,
    pub args: PendingArgs,
}

/// Side effects requested by a transition, executed in order by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Record the user's utterance in the context.
    StoreTranscript { text: String },
    /// Record a money proposal, replacing any previous one.
    StoreProposal {
        sentence: String,
        args: Option<PendingArgs>,
    },
    /// Start the confirmation countdown.
    ArmConfirmTimer,
    /// Cancel the confirmation countdown. Safe to repeat.
    DisarmConfirmTimer,
    /// Deliver an event to the client.
    Emit(OutboundEvent),
    /// Run the confirmed payment outside the machine.
    SettlePayment(Settlement),
}

impl Effect {
    pub fn is_emit(&self) -> bool {
        matches!(self, Effect::Emit(_))
    }
}
