// The client module contains the consumer-side counterparts of the relay:
// the chat session, the background action worker, and the HTTP/stream
// plumbing they share. Each consumer owns its own decoder and assembler
// state; nothing is shared across concurrent streams.

pub mod action_worker;
pub mod chat_session;
pub mod relay_client;

// Re-export for convenience
pub use action_worker::ActionWorker;
pub use chat_session::ChatSession;
pub use relay_client::{collect_text, EventOutcome, FrameStream, RelayClient, RelayError};
