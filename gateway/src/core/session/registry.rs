use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use super::session::{DEFAULT_CONFIRM_TIMEOUT, Session};
use super::sink::SharedSink;
use crate::core::conversation::ConversationState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No pending confirmation for this session")]
    NoPendingConfirmation,
}

/// Which key located the session during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Caller,
    Transport,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Caller => "caller",
            KeySource::Transport => "transport",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub session: Arc<Session>,
    pub found_via: KeySource,
}

fn is_waiting(session: &Arc<Session>) -> bool {
    session.state() == ConversationState::ConfirmWait
}

/// Maps session keys to sessions.
///
/// Creation, aliasing and sink upgrades all happen under one lock, so two
/// concurrent resolutions of a new key agree on a single session and
/// first-alias-wins is atomic with its existence check.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    confirm_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new(confirm_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            confirm_timeout,
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        self.confirm_timeout
    }

    /// Return the session for `key`, creating it if needed, and upgrade its sink
    /// when one is supplied.
    pub fn resolve(&self, key: &str, sink: Option<SharedSink>) -> Arc<Session> {
        let mut sessions = self.sessions.lock();
        let session = match sessions.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                info!(session = %key, "Creating conversation session");
                entry
                    .insert(Session::new(key, self.confirm_timeout))
                    .clone()
            }
        };
        if let Some(sink) = sink {
            session.attach_sink(sink);
        }
        session
    }

    /// Look up `key` without creating anything.
    pub fn peek(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(key).cloned()
    }

    /// Point `key` at `session` unless `key` is already mapped. Returns whether
    /// the alias was recorded.
    pub fn alias(&self, key: &str, session: &Arc<Session>) -> bool {
        Self::alias_locked(&mut self.sessions.lock(), key, session)
    }

    fn alias_locked(
        sessions: &mut HashMap<String, Arc<Session>>,
        key: &str,
        session: &Arc<Session>,
    ) -> bool {
        match sessions.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                debug!(alias = %key, session = %session.key(), "Session key aliased");
                entry.insert(session.clone());
                true
            }
        }
    }

    /// Find the session a confirmation belongs to.
    ///
    /// The caller-supplied key wins when it names a session waiting for
    /// confirmation. Otherwise the transport key is tried and, on success, the
    /// caller key is permanently aliased to that session.
    pub fn reconcile(
        &self,
        caller_key: Option<&str>,
        transport_key: &str,
    ) -> Result<Reconciled, RegistryError> {
        let mut sessions = self.sessions.lock();
        if let Some(session) = caller_key.and_then(|k| sessions.get(k)).filter(|s| is_waiting(s)) {
            return Ok(Reconciled {
                session: session.clone(),
                found_via: KeySource::Caller,
            });
        }

        let session = sessions
            .get(transport_key)
            .filter(|s| is_waiting(s))
            .cloned()
            .ok_or(RegistryError::NoPendingConfirmation)?;

        if let Some(key) = caller_key {
            Self::alias_locked(&mut sessions, key, &session);
        }

        Ok(Reconciled {
            session,
            found_via: KeySource::Transport,
        })
    }

    /// Number of keys, aliases included.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
