// The infra module contains implementations of core ports.
// Each collaborator implementation goes in its own submodule.

#[path = "ai/gemini_client.rs"]
pub mod ai;

#[path = "calendar/google_calendar_client.rs"]
pub mod calendar;

#[path = "document/utf8_extractor.rs"]
pub mod document;

#[path = "persistence/persistence_store.rs"]
pub mod persistence;
