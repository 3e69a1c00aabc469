// Streaming relay between browser extension surfaces and a generative
// backend, plus the consumer-side sessions that reassemble its streams.
//
// **Architecture Overview:**
// - `core/` = protocol and domain logic (platform-agnostic, no I/O)
// - `infra/` = implementations of core ports (Gemini, Supabase, Google Calendar)
// - `server/` = the relay HTTP surface
// - `client/` = consumer-side sessions built on the same core

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "client/client_layer.rs"]
pub mod client;
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
#[path = "server/server_layer.rs"]
pub mod server;

#[cfg(test)]
#[path = "test_support.rs"]
pub mod test_support;
