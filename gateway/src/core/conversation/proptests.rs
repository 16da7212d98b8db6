//! Property-based tests for the conversation machine.

use super::*;
use proptest::prelude::*;

fn arb_state() -> impl Strategy<Value = ConversationState> {
    prop_oneof![
        Just(ConversationState::Idle),
        Just(ConversationState::Recording),
        Just(ConversationState::Thinking),
        Just(ConversationState::Speaking),
        Just(ConversationState::ConfirmWait),
    ]
}

fn arb_args() -> impl Strategy<Value = Option<PendingArgs>> {
    prop::option::of((1u64..100_000, "[a-z]{1,8}").prop_map(|(amount, name)| PendingArgs {
        amount_cents: Some(amount),
        recipient_email: Some(format!("{name}@example.com")),
        ..Default::default()
    }))
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::MicPress),
        "[a-z ]{0,20}".prop_map(|text| Event::RecordEnd { text }),
        "[a-z ]{0,20}".prop_map(|text| Event::TranscriptFinal { text }),
        ("[A-Za-z ?$0-9]{1,30}", arb_args()).prop_map(|(s, args)| Event::money(s, args)),
        "[A-Za-z ]{1,30}".prop_map(|s: String| Event::safe(s)),
        Just(Event::UserInterrupt),
        Just(Event::TtsEnd),
        Just(Event::ConfirmTimeout),
        Just(Event::ConfirmAccepted),
        Just(Event::ConfirmRejected),
        Just(Event::Unrecognized),
    ]
}

/// Whether the transition table has a row for this pair that changes state.
fn has_row(state: ConversationState, event: &Event) -> bool {
    use ConversationState::*;
    matches!(
        (state, event),
        (Idle, Event::MicPress)
            | (Idle | Thinking, Event::GptResult { .. })
            | (Recording, Event::RecordEnd { .. } | Event::TranscriptFinal { .. })
            | (Thinking | Speaking, Event::UserInterrupt)
            | (Speaking, Event::TtsEnd)
            | (
                ConfirmWait,
                Event::ConfirmTimeout
                    | Event::ConfirmRejected
                    | Event::ConfirmAccepted
                    | Event::UserInterrupt
            )
    )
}

proptest! {
    #[test]
    fn unmatched_pairs_are_inert(state in arb_state(), event in arb_event()) {
        prop_assume!(!has_row(state, &event));
        let result = transition(state, &ConversationContext::new(), event);
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn transitions_end_with_exactly_one_state_change(state in arb_state(), event in arb_event()) {
        prop_assume!(has_row(state, &event));
        let result = transition(state, &ConversationContext::new(), event);
        let changes = result
            .emitted()
            .filter(|e| matches!(e, OutboundEvent::StateChange { .. }))
            .count();
        prop_assert_eq!(changes, 1);
        prop_assert_eq!(
            result.effects.last(),
            Some(&Effect::Emit(OutboundEvent::StateChange { state: result.new_state }))
        );
    }

    #[test]
    fn timer_armed_iff_entering_confirm_wait(state in arb_state(), event in arb_event()) {
        let result = transition(state, &ConversationContext::new(), event);
        let armed = result.effects.iter().filter(|e| **e == Effect::ArmConfirmTimer).count();
        let entering = state != ConversationState::ConfirmWait
            && result.new_state == ConversationState::ConfirmWait;
        prop_assert_eq!(armed, usize::from(entering));
    }

    #[test]
    fn leaving_confirm_wait_disarms_once(event in arb_event()) {
        let result = transition(ConversationState::ConfirmWait, &ConversationContext::new(), event);
        let disarms = result
            .effects
            .iter()
            .filter(|e| **e == Effect::DisarmConfirmTimer)
            .count();
        let left = result.new_state != ConversationState::ConfirmWait;
        prop_assert_eq!(disarms, usize::from(left));
    }

    #[test]
    fn any_event_sequence_keeps_timer_balanced(events in prop::collection::vec(arb_event(), 0..40)) {
        let mut state = ConversationState::Idle;
        let context = ConversationContext::new();
        let mut armed = false;
        for event in events {
            let result = transition(state, &context, event);
            for effect in &result.effects {
                match effect {
                    Effect::ArmConfirmTimer => {
                        prop_assert!(!armed);
                        armed = true;
                    }
                    Effect::DisarmConfirmTimer => {
                        prop_assert!(armed);
                        armed = false;
                    }
                    _ => {}
                }
            }
            state = result.new_state;
            prop_assert_eq!(armed, state == ConversationState::ConfirmWait);
        }
    }
}
