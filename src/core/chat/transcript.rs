// Transcript state for one chat session, and the per-exchange state
// machine that folds decoded stream frames into it.
//
// The assembler is written as a pure reducer: `reduce(state, event)`
// returns the next state without touching any transport or UI concern.
// Callers republish the transcript after every step and decide what to do
// once the exchange settles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Greeting shown when a user has no stored history yet.
pub const GREETING: &str = "Hello! How can I help you today?";

/// Fixed user-visible text substituted for the in-progress message when a
/// stream fails. Raw upstream errors never reach the displayed transcript.
pub const STREAM_FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Ai,
}

/// One unit of conversation. `text` is mutable while its exchange is
/// streaming and immutable once the transcript has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: Author,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            author: Author::Ai,
            text: text.into(),
        }
    }
}

/// Ordered sequence of messages for one user session. Persisted as a
/// single replaceable unit.
pub type Transcript = Vec<Message>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("transcript store error: {0}")]
    Store(String),
}

/// Port for the transcript persistence collaborator.
///
/// `upsert` replaces the user's entire stored transcript (keyed by user
/// identity, last write wins); `load_latest` returns the most recent
/// stored transcript, if any.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn upsert(&self, user_id: &str, messages: &[Message]) -> Result<(), PersistenceError>;

    async fn load_latest(&self, user_id: &str) -> Result<Option<Transcript>, PersistenceError>;
}

/// Lifecycle of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    AwaitingFirstFragment,
    Streaming,
    Settled {
        failed: bool,
    },
}

/// Decoded stream activity, as seen by the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentEvent {
    /// A chunk frame arrived; append its payload to the open ai message.
    Chunk(String),
    /// The stream closed without an error frame.
    StreamClosed,
    /// An error frame arrived, or the transport failed mid-stream.
    StreamFailed,
}

/// Transcript plus the phase of the exchange currently mutating it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExchangeState {
    pub transcript: Transcript,
    pub phase: ExchangePhase,
}

impl ExchangeState {
    pub fn idle(transcript: Transcript) -> Self {
        Self {
            transcript,
            phase: ExchangePhase::Idle,
        }
    }

    /// Opens a new exchange: records the user's message and an empty ai
    /// message for fragments to accumulate into.
    pub fn begin(mut self, user_text: impl Into<String>) -> Self {
        self.transcript.push(Message::user(user_text));
        self.transcript.push(Message::ai(""));
        self.phase = ExchangePhase::AwaitingFirstFragment;
        self
    }

    pub fn settled(&self) -> bool {
        matches!(self.phase, ExchangePhase::Settled { .. })
    }

    /// Whether the settled exchange should be handed to the persistence
    /// collaborator. Failed exchanges are deliberately not persisted.
    pub fn should_persist(&self) -> bool {
        matches!(self.phase, ExchangePhase::Settled { failed: false })
    }
}

/// Folds one stream event into the exchange state.
///
/// Events outside an open exchange (before `begin`, or after settling)
/// leave the state unchanged.
pub fn reduce(mut state: ExchangeState, event: &FragmentEvent) -> ExchangeState {
    let open = matches!(
        state.phase,
        ExchangePhase::AwaitingFirstFragment | ExchangePhase::Streaming
    );
    if !open {
        return state;
    }

    match event {
        FragmentEvent::Chunk(payload) => {
            if let Some(message) = state.transcript.last_mut() {
                message.text.push_str(payload);
            }
            state.phase = ExchangePhase::Streaming;
        }
        FragmentEvent::StreamClosed => {
            state.phase = ExchangePhase::Settled { failed: false };
        }
        FragmentEvent::StreamFailed => {
            // Replace, never append: partial output is dropped from view in
            // favor of the fixed failure text.
            if let Some(message) = state.transcript.last_mut() {
                message.text = STREAM_FAILURE_MESSAGE.to_string();
            }
            state.phase = ExchangePhase::Settled { failed: true };
        }
    }

    state
}
