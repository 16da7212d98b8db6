use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversation states. Exactly one is current per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    Recording,
    Thinking,
    Speaking,
    ConfirmWait,
}

impl ConversationState {
    pub const ALL: [ConversationState; 5] = [
        ConversationState::Idle,
        ConversationState::Recording,
        ConversationState::Thinking,
        ConversationState::Speaking,
        ConversationState::ConfirmWait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "Idle",
            ConversationState::Recording => "Recording",
            ConversationState::Thinking => "Thinking",
            ConversationState::Speaking => "Speaking",
            ConversationState::ConfirmWait => "ConfirmWait",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A split participant as the agent supplied it: a bare name or a partial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FriendEntry {
    Name(String),
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
}

/// Parameters of a proposed money action, recorded when entering `ConfirmWait`.
///
/// Field names follow the agent's tool-call arguments so the JSON it produces
/// deserializes directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cents: Option<u64>,
    #[serde(
        default,
        alias = "recipient",
        skip_serializing_if = "Option::is_none"
    )]
    pub recipient_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends: Option<Vec<FriendEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl PendingArgs {
    /// True when the proposal splits a bill rather than paying one recipient.
    pub fn is_split(&self) -> bool {
        self.friends.as_ref().is_some_and(|f| !f.is_empty())
    }

    /// The amount the proposal moves, whichever field the agent used.
    pub fn amount(&self) -> Option<u64> {
        self.amount_cents.or(self.total_cents)
    }
}

/// Scratch data attached to a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    pub transcript: Option<String>,
    pub pending_sentence: Option<String>,
    pub pending_args: Option<PendingArgs>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }
}
