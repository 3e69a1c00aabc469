// The core module contains the protocol and domain logic.
// Notice how this layer has no HTTP or vendor-specific code: it works with
// plain types and ports, so both the server and the client consumers can
// share it.

#[path = "ai/generation.rs"]
pub mod ai;

#[path = "calendar/event_service.rs"]
pub mod calendar;

#[path = "chat/transcript.rs"]
pub mod chat;

#[path = "document/text_extractor.rs"]
pub mod document;

#[path = "prompt/prompt_builder.rs"]
pub mod prompt;

#[path = "stream/wire_format.rs"]
pub mod stream;
