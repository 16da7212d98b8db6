use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::sink::{SharedSink, same_sink};
use crate::core::conversation::{
    ConversationContext, ConversationState, Effect, Event, OutboundEvent, Settlement, transition,
};

/// Confirmation window used when none is configured.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Undelivered events kept per session. Past this the oldest are dropped.
pub const MAX_BACKLOG: usize = 256;

/// What a single [`Session::send`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub previous: ConversationState,
    pub state: ConversationState,
    pub transitioned: bool,
    /// Present when the event confirmed a money proposal. The caller runs it.
    pub settlement: Option<Settlement>,
}

#[derive(Default)]
struct ConfirmTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl ConfirmTimer {
    fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the countdown. Any task already past its sleep sees a stale
    /// generation and does nothing.
    fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

struct SessionInner {
    state: ConversationState,
    context: ConversationContext,
    sink: Option<SharedSink>,
    backlog: VecDeque<OutboundEvent>,
    timer: ConfirmTimer,
}

impl SessionInner {
    fn sink_is_live(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.is_open())
    }

    /// Queue an event and push out as much of the backlog as the sink accepts.
    fn emit(&mut self, event: OutboundEvent) {
        self.backlog.push_back(event);
        self.flush();

        let overflow = self.backlog.len().saturating_sub(MAX_BACKLOG);
        if overflow > 0 {
            self.backlog.drain(..overflow);
            warn!(
                dropped = overflow,
                kept = MAX_BACKLOG,
                "Session backlog full, dropping oldest events"
            );
        }
    }

    /// Deliver queued events in FIFO order. Stops at the first failure so
    /// ordering survives a dead sink.
    fn flush(&mut self) -> usize {
        let Some(sink) = self.sink.as_ref().filter(|s| s.is_open()) else {
            return 0;
        };
        let mut delivered = 0;
        while let Some(event) = self.backlog.front() {
            if sink.deliver(event).is_err() {
                break;
            }
            self.backlog.pop_front();
            delivered += 1;
        }
        delivered
    }

    fn pending_confirm_request(&self) -> Option<OutboundEvent> {
        if self.state != ConversationState::ConfirmWait {
            return None;
        }
        let sentence = self.context.pending_sentence.as_deref()?;
        Some(OutboundEvent::confirm_request(
            sentence,
            self.context.pending_args.as_ref(),
        ))
    }
}

/// One logical conversation: machine, context, sink slot, backlog and timer.
///
/// All mutation happens under a single lock, so events for one session are
/// applied strictly one at a time and `send` never suspends.
pub struct Session {
    key: String,
    confirm_timeout: Duration,
    inner: Mutex<SessionInner>,
    this: Weak<Session>,
}

impl Session {
    pub fn new(key: impl Into<String>, confirm_timeout: Duration) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            key: key.into(),
            confirm_timeout,
            inner: Mutex::new(SessionInner {
                state: ConversationState::Idle,
                context: ConversationContext::new(),
                sink: None,
                backlog: VecDeque::new(),
                timer: ConfirmTimer::default(),
            }),
            this: this.clone(),
        })
    }

    /// Key the session was first registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> ConversationState {
        self.inner.lock().state
    }

    pub fn context(&self) -> ConversationContext {
        self.inner.lock().context.clone()
    }

    pub fn backlog_len(&self) -> usize {
        self.inner.lock().backlog.len()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.inner.lock().timer.is_armed()
    }

    pub fn has_live_sink(&self) -> bool {
        self.inner.lock().sink_is_live()
    }

    /// Feed one event to the machine and carry out its effects.
    pub fn send(&self, event: Event) -> Dispatch {
        let mut inner = self.inner.lock();
        self.apply(&mut inner, event)
    }

    /// Write an event straight to the client, bypassing the machine.
    pub fn emit(&self, event: OutboundEvent) {
        self.inner.lock().emit(event);
    }

    /// Install `sink` as the output channel. Returns false when it already is.
    ///
    /// State and context are untouched. The backlog is flushed through the new
    /// sink first, then a pending `confirm_request` is repeated so a
    /// reconnecting client sees the open question.
    pub fn attach_sink(&self, sink: SharedSink) -> bool {
        let mut inner = self.inner.lock();
        if let Some(current) = inner.sink.as_ref() {
            if same_sink(current, &sink) {
                return false;
            }
            if current.is_open() {
                warn!(
                    session = %self.key,
                    "Replacing a live sink; two connections now share one conversation"
                );
            }
        }
        inner.sink = Some(sink);
        let flushed = inner.flush();
        debug!(session = %self.key, flushed, state = %inner.state, "Session sink upgraded");

        if let Some(request) = inner.pending_confirm_request() {
            inner.emit(request);
        }
        true
    }

    /// Drop `sink` if it is still the current one. Later events go to the backlog.
    pub fn detach_sink(&self, sink: &SharedSink) {
        let mut inner = self.inner.lock();
        if inner.sink.as_ref().is_some_and(|s| same_sink(s, sink)) {
            inner.sink = None;
            debug!(session = %self.key, backlog = inner.backlog.len(), "Session sink detached");
        }
    }

    fn apply(&self, inner: &mut SessionInner, event: Event) -> Dispatch {
        let previous = inner.state;
        let name = event.name();
        let result = transition(previous, &inner.context, event);
        let transitioned = result.is_transition();

        if !transitioned {
            debug!(session = %self.key, state = %previous, event = name, "Event ignored");
        }

        inner.state = result.new_state;
        let mut settlement = None;

        for effect in result.effects {
            match effect {
                Effect::StoreTranscript { text } => inner.context.transcript = Some(text),
                Effect::StoreProposal { sentence, args } => {
                    inner.context.pending_sentence = Some(sentence);
                    inner.context.pending_args = args;
                }
                Effect::ArmConfirmTimer => self.arm_timer(inner),
                Effect::DisarmConfirmTimer => inner.timer.disarm(),
                Effect::Emit(outbound) => inner.emit(outbound),
                Effect::SettlePayment(s) => settlement = Some(s),
            }
        }

        if previous == ConversationState::ConfirmWait && inner.state != previous {
            inner.context.pending_sentence = None;
            inner.context.pending_args = None;
        }

        if transitioned {
            debug!(session = %self.key, from = %previous, to = %inner.state, event = name, "Transition");
        }

        Dispatch {
            previous,
            state: inner.state,
            transitioned,
            settlement,
        }
    }

    fn arm_timer(&self, inner: &mut SessionInner) {
        inner.timer.disarm();
        let generation = inner.timer.generation;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(session = %self.key, "No async runtime; confirmation timeout not armed");
            return;
        };

        let session = self.this.clone();
        let timeout = self.confirm_timeout;
        inner.timer.handle = Some(runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(session) = session.upgrade() {
                session.on_confirm_timeout(generation);
            }
        }));
    }

    fn on_confirm_timeout(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.timer.generation != generation || inner.timer.handle.is_none() {
            debug!(session = %self.key, "Stale confirmation timeout ignored");
            return;
        }
        // Running inside the timer task itself; release without aborting.
        inner.timer.handle = None;
        debug!(session = %self.key, "Confirmation window expired");
        self.apply(&mut inner, Event::ConfirmTimeout);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::PendingArgs;
    use crate::core::session::testing::RecordingSink;

    const TIMEOUT: Duration = Duration::from_millis(8_000);

    fn kinds(events: &[OutboundEvent]) -> Vec<&'static str> {
        events.iter().map(OutboundEvent::kind).collect()
    }

    fn money_args() -> PendingArgs {
        PendingArgs {
            amount_cents: Some(1000),
            recipient_email: Some("alice@example.com".to_string()),
            ..Default::default()
        }
    }

    fn to_confirm_wait(session: &Session) {
        session.send(Event::MicPress);
        session.send(Event::RecordEnd {
            text: "pay ten dollars to alice".to_string(),
        });
        session.send(Event::money("Send $10 to Alice?", Some(money_args())));
    }

    #[tokio::test]
    async fn test_info_path() {
        let session = Session::new("s", TIMEOUT);
        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());

        session.send(Event::MicPress);
        assert_eq!(session.state(), ConversationState::Recording);
        session.send(Event::RecordEnd {
            text: "what is my balance".to_string(),
        });
        assert_eq!(session.state(), ConversationState::Thinking);
        assert_eq!(
            session.context().transcript.as_deref(),
            Some("what is my balance")
        );
        session.send(Event::safe("Your balance is $20"));
        assert_eq!(session.state(), ConversationState::Speaking);
        session.send(Event::TtsEnd);
        assert_eq!(session.state(), ConversationState::Idle);

        assert_eq!(
            kinds(&sink.events()),
            vec![
                "state_change",
                "state_change",
                "speak_sentence",
                "state_change",
                "state_change"
            ]
        );
    }

    #[tokio::test]
    async fn test_money_path_emits_confirm_request_before_state_change() {
        let session = Session::new("s", TIMEOUT);
        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());

        to_confirm_wait(&session);

        assert_eq!(session.state(), ConversationState::ConfirmWait);
        assert!(session.is_timer_armed());
        let events = sink.events();
        let n = events.len();
        assert_eq!(
            events[n - 2],
            OutboundEvent::confirm_request("Send $10 to Alice?", Some(&money_args()))
        );
        assert_eq!(
            events[n - 1],
            OutboundEvent::StateChange {
                state: ConversationState::ConfirmWait
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_timeout_fires_once() {
        let session = Session::new("s", TIMEOUT);
        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());
        to_confirm_wait(&session);
        sink.clear();

        tokio::time::sleep(TIMEOUT + Duration::from_millis(100)).await;

        assert_eq!(session.state(), ConversationState::Idle);
        assert!(!session.is_timer_armed());
        assert_eq!(
            sink.events(),
            vec![
                OutboundEvent::ConfirmCancelled,
                OutboundEvent::StateChange {
                    state: ConversationState::Idle
                }
            ]
        );
        assert_eq!(session.context().pending_sentence, None);

        tokio::time::sleep(TIMEOUT * 3).await;
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_disarms_timer() {
        let session = Session::new("s", TIMEOUT);
        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());
        to_confirm_wait(&session);

        session.send(Event::UserInterrupt);
        assert_eq!(session.state(), ConversationState::Recording);
        assert!(!session.is_timer_armed());
        sink.clear();

        tokio::time::sleep(TIMEOUT * 2).await;
        assert_eq!(session.state(), ConversationState::Recording);
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_after_rearm_is_inert() {
        let session = Session::new("s", TIMEOUT);
        to_confirm_wait(&session);

        tokio::time::sleep(TIMEOUT / 2).await;
        session.send(Event::UserInterrupt);
        session.send(Event::RecordEnd {
            text: "again".to_string(),
        });
        session.send(Event::money("Send $10 to Alice?", Some(money_args())));

        // The first countdown would have expired here.
        tokio::time::sleep(TIMEOUT / 2 + Duration::from_millis(100)).await;
        assert_eq!(session.state(), ConversationState::ConfirmWait);

        tokio::time::sleep(TIMEOUT / 2).await;
        assert_eq!(session.state(), ConversationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_timeout_after_disarm_is_inert() {
        let session = Session::new("s", TIMEOUT);
        to_confirm_wait(&session);
        let generation = session.inner.lock().timer.generation;

        session.send(Event::ConfirmRejected);
        assert_eq!(session.state(), ConversationState::Idle);

        // A timer task that raced past its sleep before the abort landed.
        session.on_confirm_timeout(generation);
        assert_eq!(session.state(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_accept_yields_settlement_and_clears_proposal() {
        let session = Session::new("s", TIMEOUT);
        to_confirm_wait(&session);

        let dispatch = session.send(Event::ConfirmAccepted);

        assert!(dispatch.transitioned);
        assert_eq!(dispatch.previous, ConversationState::ConfirmWait);
        assert_eq!(dispatch.state, ConversationState::Idle);
        let settlement = dispatch.settlement.unwrap();
        assert_eq!(settlement.args, money_args());
        assert_eq!(settlement.sentence.as_deref(), Some("Send $10 to Alice?"));
        assert!(!session.is_timer_armed());
        assert_eq!(session.context().pending_args, None);
    }

    #[tokio::test]
    async fn test_new_proposal_overwrites_stale_args() {
        let session = Session::new("s", TIMEOUT);
        to_confirm_wait(&session);
        session.send(Event::UserInterrupt);
        session.send(Event::RecordEnd {
            text: "send five to bob".to_string(),
        });
        session.send(Event::money("Send $5 to Bob?", None));

        let context = session.context();
        assert_eq!(context.pending_sentence.as_deref(), Some("Send $5 to Bob?"));
        assert_eq!(context.pending_args, None);
    }

    #[tokio::test]
    async fn test_events_backlogged_without_sink_then_flushed_in_order() {
        let session = Session::new("s", TIMEOUT);
        session.send(Event::MicPress);
        session.send(Event::RecordEnd {
            text: "balance".to_string(),
        });
        session.send(Event::safe("Your balance is $20"));
        assert_eq!(session.backlog_len(), 4);

        let sink = RecordingSink::new();
        assert!(session.attach_sink(sink.shared()));

        assert_eq!(session.backlog_len(), 0);
        assert_eq!(
            kinds(&sink.events()),
            vec!["state_change", "state_change", "speak_sentence", "state_change"]
        );

        // Second attach of the same sink is not an upgrade and flushes nothing new.
        assert!(!session.attach_sink(sink.shared()));
        assert_eq!(sink.events().len(), 4);
    }

    #[tokio::test]
    async fn test_backlog_drops_oldest_past_cap() {
        let session = Session::new("s", TIMEOUT);
        for i in 0..MAX_BACKLOG + 10 {
            session.emit(OutboundEvent::speak(i.to_string()));
        }
        assert_eq!(session.backlog_len(), MAX_BACKLOG);

        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());
        let events = sink.events();
        assert_eq!(events.len(), MAX_BACKLOG);
        assert_eq!(events[0], OutboundEvent::speak("10"));
        assert_eq!(
            events[MAX_BACKLOG - 1],
            OutboundEvent::speak((MAX_BACKLOG + 9).to_string())
        );
    }

    #[tokio::test]
    async fn test_dead_sink_keeps_events_queued() {
        let session = Session::new("s", TIMEOUT);
        let sink = RecordingSink::new();
        session.attach_sink(sink.shared());
        sink.close();

        session.send(Event::MicPress);
        session.emit(OutboundEvent::PauseAudio);
        assert_eq!(session.backlog_len(), 2);
        assert!(sink.events().is_empty());

        let next = RecordingSink::new();
        session.attach_sink(next.shared());
        assert_eq!(kinds(&next.events()), vec!["state_change", "pause_audio"]);
    }

    #[tokio::test]
    async fn test_upgrade_preserves_state_and_repeats_confirm_request() {
        let session = Session::new("s", TIMEOUT);
        let first = RecordingSink::new();
        session.attach_sink(first.shared());
        to_confirm_wait(&session);
        let context_before = session.context();

        let second = RecordingSink::new();
        assert!(session.attach_sink(second.shared()));

        assert_eq!(session.state(), ConversationState::ConfirmWait);
        assert_eq!(session.context(), context_before);
        assert_eq!(
            second.events(),
            vec![OutboundEvent::confirm_request(
                "Send $10 to Alice?",
                Some(&money_args())
            )]
        );
    }

    #[tokio::test]
    async fn test_detach_only_removes_current_sink() {
        let session = Session::new("s", TIMEOUT);
        let first = RecordingSink::new();
        let second = RecordingSink::new();
        session.attach_sink(first.shared());
        session.attach_sink(second.shared());

        session.detach_sink(&first.shared());
        assert!(session.has_live_sink());

        session.detach_sink(&second.shared());
        assert!(!session.has_live_sink());
        session.emit(OutboundEvent::PauseAudio);
        assert_eq!(session.backlog_len(), 1);
    }

    #[test]
    fn test_arm_without_runtime_does_not_panic() {
        let session = Session::new("s", TIMEOUT);
        session.send(Event::money("Send $1?", None));
        assert_eq!(session.state(), ConversationState::ConfirmWait);
        assert!(!session.is_timer_armed());
    }
}
