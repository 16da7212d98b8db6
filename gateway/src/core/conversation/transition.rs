//! Pure transition function for the conversation machine.

use super::effect::{Effect, Settlement};
use super::event::{Event, Risk};
use super::outbound::OutboundEvent;
use super::state::{ConversationContext, ConversationState};

/// Outcome of feeding one event to the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    /// No state change and nothing to do.
    pub fn unchanged(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: Vec::new(),
        }
    }

    fn to(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: Vec::new(),
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Append the `state_change` notification. Every real transition ends with it.
    fn announced(self) -> Self {
        let state = self.new_state;
        self.with_effect(Effect::Emit(OutboundEvent::StateChange { state }))
    }

    pub fn is_transition(&self) -> bool {
        self.effects.iter().any(|e| {
            matches!(e, Effect::Emit(OutboundEvent::StateChange { .. }))
        })
    }

    /// Events this result sends to the client, in order.
    pub fn emitted(&self) -> impl Iterator<Item = &OutboundEvent> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Emit(event) => Some(event),
            _ => None,
        })
    }
}

/// Compute the next state and effects. Unmatched `(state, event)` pairs leave the
/// state unchanged and produce no effects.
pub fn transition(
    state: ConversationState,
    context: &ConversationContext,
    event: Event,
) -> TransitionResult {
    use ConversationState::*;

    match (state, event) {
        (Idle, Event::MicPress) => TransitionResult::to(Recording).announced(),

        (
            Idle | Thinking,
            Event::GptResult {
                risk: Risk::Money,
                sentence,
                args,
            },
        ) => {
            let request = OutboundEvent::confirm_request(&sentence, args.as_ref());
            TransitionResult::to(ConfirmWait)
                .with_effect(Effect::StoreProposal { sentence, args })
                .with_effect(Effect::ArmConfirmTimer)
                .with_effect(Effect::Emit(request))
                .announced()
        }

        (
            Idle | Thinking,
            Event::GptResult {
                risk: Risk::Safe,
                sentence,
                ..
            },
        ) => TransitionResult::to(Speaking)
            .with_effect(Effect::Emit(OutboundEvent::speak(sentence)))
            .announced(),

        (Recording, Event::RecordEnd { text } | Event::TranscriptFinal { text }) => {
            TransitionResult::to(Thinking)
                .with_effect(Effect::StoreTranscript { text })
                .announced()
        }

        (Thinking, Event::UserInterrupt) => TransitionResult::to(Recording).announced(),

        (Speaking, Event::UserInterrupt) => TransitionResult::to(Recording)
            .with_effect(Effect::Emit(OutboundEvent::PauseAudio))
            .announced(),

        (Speaking, Event::TtsEnd) => TransitionResult::to(Idle).announced(),

        (ConfirmWait, Event::ConfirmTimeout | Event::ConfirmRejected) => {
            TransitionResult::to(Idle)
                .with_effect(Effect::DisarmConfirmTimer)
                .with_effect(Effect::Emit(OutboundEvent::ConfirmCancelled))
                .announced()
        }

        (ConfirmWait, Event::UserInterrupt) => TransitionResult::to(Recording)
            .with_effect(Effect::DisarmConfirmTimer)
            .announced(),

        (ConfirmWait, Event::ConfirmAccepted) => TransitionResult::to(Idle)
            .with_effect(Effect::DisarmConfirmTimer)
            .with_effect(Effect::SettlePayment(Settlement {
                sentence: context.pending_sentence.clone(),
                args: context.pending_args.clone().unwrap_or_default(),
            }))
            .announced(),

        (state, _) => TransitionResult::unchanged(state),
    }
}
