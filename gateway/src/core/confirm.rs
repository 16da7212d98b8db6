//! Spoken confirmation of money proposals.
//!
//! Shared by the HTTP confirmation endpoint and the `confirm` frame of the
//! duplex relay: parse the answer, drive the session, and on acceptance run the
//! payment collaborator and announce the result.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::core::conversation::{Event, OutboundEvent, Settlement};
use crate::core::payments::{PaymentError, PaymentOutcome, PaymentService, settle};
use crate::core::session::{Dispatch, Session};

pub const REPROMPT_SENTENCE: &str = "Please say yes to continue or no to cancel.";
pub const CANCELLED_SENTENCE: &str = "Okay, cancelled.";

/// Reason reported to the client when a confirmed payment could not be created.
pub const PAYMENT_FAILED_REASON: &str = "payment_failed";

static AFFIRMATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(yes|yeah|yep|sure|affirmative)\b").expect("valid affirmative pattern")
});
static NEGATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(no|nope|nah|negative)\b").expect("valid negative pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
}

/// Read a yes/no out of free text. Affirmatives win when both appear.
pub fn parse_yes_no(answer: &str) -> Option<Decision> {
    let text = answer.trim().to_lowercase();
    if AFFIRMATIVE.is_match(&text) {
        Some(Decision::Yes)
    } else if NEGATIVE.is_match(&text) {
        Some(Decision::No)
    } else {
        None
    }
}

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("No pending confirmation for this session")]
    NoPendingConfirmation,
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Cancelled,
    Settled(PaymentOutcome),
}

/// The `speak_sentence` announcing created payment links.
pub fn announcement(outcome: &PaymentOutcome) -> OutboundEvent {
    let sentence = outcome.sentence().to_string();
    match outcome {
        PaymentOutcome::Checkout { url } => OutboundEvent::SpeakSentence {
            sentence,
            url: Some(url.clone()),
            links: None,
        },
        PaymentOutcome::Split { links } => OutboundEvent::SpeakSentence {
            sentence,
            url: None,
            links: Some(links.clone()),
        },
    }
}

/// Run a settlement and tell the session's client how it went.
pub async fn settle_and_announce(
    session: &Session,
    payments: &dyn PaymentService,
    settlement: &Settlement,
) -> Result<PaymentOutcome, PaymentError> {
    match settle(payments, &settlement.args).await {
        Ok(outcome) => {
            info!(session = %session.key(), "Payment links created");
            session.emit(announcement(&outcome));
            Ok(outcome)
        }
        Err(e) => {
            error!(session = %session.key(), error = %e, "Payment creation failed");
            session.emit(OutboundEvent::error(PAYMENT_FAILED_REASON));
            Err(e)
        }
    }
}

/// Settle in the background, for callers that do not wait on the result.
pub fn spawn_settlement(
    session: Arc<Session>,
    payments: Arc<dyn PaymentService>,
    settlement: Settlement,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _ = settle_and_announce(&session, payments.as_ref(), &settlement).await;
    })
}

/// Feed `event` to the session and settle in the background if it confirmed a
/// money proposal.
pub fn send_and_settle(
    session: &Arc<Session>,
    payments: &Arc<dyn PaymentService>,
    event: Event,
) -> Dispatch {
    let dispatch = session.send(event);
    if let Some(settlement) = dispatch.settlement.clone() {
        spawn_settlement(session.clone(), payments.clone(), settlement);
    }
    dispatch
}

/// Apply a decision to a session waiting for confirmation.
///
/// Fails with [`ConfirmError::NoPendingConfirmation`] when the session left
/// `ConfirmWait` in the meantime, for example because the timer fired.
pub async fn resolve_confirmation(
    session: &Session,
    payments: &dyn PaymentService,
    decision: Decision,
) -> Result<ConfirmOutcome, ConfirmError> {
    match decision {
        Decision::No => {
            let dispatch = session.send(Event::ConfirmRejected);
            if !dispatch.transitioned {
                return Err(ConfirmError::NoPendingConfirmation);
            }
            Ok(ConfirmOutcome::Cancelled)
        }
        Decision::Yes => {
            let settlement = session
                .send(Event::ConfirmAccepted)
                .settlement
                .ok_or(ConfirmError::NoPendingConfirmation)?;
            let outcome = settle_and_announce(session, payments, &settlement).await?;
            Ok(ConfirmOutcome::Settled(outcome))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::{ConversationState, PendingArgs};
    use crate::core::payments::{CheckoutRequest, PaymentLink, PaymentResult, SplitRequest};
    use crate::core::session::testing::RecordingSink;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubPayments {
        fail: bool,
    }

    #[async_trait]
    impl PaymentService for StubPayments {
        async fn create_checkout(&self, _request: &CheckoutRequest) -> PaymentResult<String> {
            if self.fail {
                return Err(PaymentError::RequestFailed("boom".to_string()));
            }
            Ok("https://pay/c/1".to_string())
        }

        async fn split_bill(&self, _request: &SplitRequest) -> PaymentResult<Vec<PaymentLink>> {
            Ok(vec![])
        }
    }

    fn waiting_session() -> (Arc<Session>, Arc<RecordingSink>) {
        let session = Session::new("ip", Duration::from_secs(30));
        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());
        session.send(Event::money(
            "Send $10 to Alice?",
            Some(PendingArgs {
                amount_cents: Some(1000),
                recipient_email: Some("alice@example.com".to_string()),
                ..Default::default()
            }),
        ));
        sink.clear();
        (session, sink)
    }

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("Yes."), Some(Decision::Yes));
        assert_eq!(parse_yes_no("yeah go ahead"), Some(Decision::Yes));
        assert_eq!(parse_yes_no("  SURE "), Some(Decision::Yes));
        assert_eq!(parse_yes_no("nope"), Some(Decision::No));
        assert_eq!(parse_yes_no("No, cancel that"), Some(Decision::No));
        assert_eq!(parse_yes_no("maybe later"), None);
        assert_eq!(parse_yes_no("nothing"), None);
        assert_eq!(parse_yes_no("yesterday"), None);
    }

    #[tokio::test]
    async fn test_yes_settles_and_announces() {
        let (session, sink) = waiting_session();

        let outcome = resolve_confirmation(&session, &StubPayments { fail: false }, Decision::Yes)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ConfirmOutcome::Settled(PaymentOutcome::Checkout {
                url: "https://pay/c/1".to_string()
            })
        );
        assert_eq!(session.state(), ConversationState::Idle);
        assert_eq!(
            sink.events().last(),
            Some(&OutboundEvent::SpeakSentence {
                sentence: "Payment link generated and copied to your clipboard.".to_string(),
                url: Some("https://pay/c/1".to_string()),
                links: None,
            })
        );
    }

    #[tokio::test]
    async fn test_no_cancels() {
        let (session, sink) = waiting_session();

        let outcome = resolve_confirmation(&session, &StubPayments { fail: false }, Decision::No)
            .await
            .unwrap();

        assert_eq!(outcome, ConfirmOutcome::Cancelled);
        assert_eq!(session.state(), ConversationState::Idle);
        assert_eq!(sink.events()[0], OutboundEvent::ConfirmCancelled);
    }

    #[tokio::test]
    async fn test_payment_failure_reports_error_event() {
        let (session, sink) = waiting_session();

        let err = resolve_confirmation(&session, &StubPayments { fail: true }, Decision::Yes)
            .await
            .unwrap_err();

        assert!(matches!(err, ConfirmError::Payment(_)));
        assert_eq!(
            sink.events().last(),
            Some(&OutboundEvent::error(PAYMENT_FAILED_REASON))
        );
    }

    #[tokio::test]
    async fn test_send_and_settle_spawns_settlement() {
        let (session, sink) = waiting_session();
        let payments: Arc<dyn PaymentService> = Arc::new(StubPayments { fail: false });

        let dispatch = send_and_settle(&session, &payments, Event::ConfirmAccepted);
        assert!(dispatch.transitioned);
        assert!(dispatch.settlement.is_some());

        for _ in 0..50 {
            if sink
                .events()
                .iter()
                .any(|e| matches!(e, OutboundEvent::SpeakSentence { url: Some(_), .. }))
            {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("settlement was not announced");
    }

    #[tokio::test]
    async fn test_answer_after_session_moved_on() {
        let (session, _sink) = waiting_session();
        session.send(Event::UserInterrupt);

        let err = resolve_confirmation(&session, &StubPayments { fail: false }, Decision::Yes)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::NoPendingConfirmation));
    }
}
