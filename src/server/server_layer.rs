// The server module is the relay's HTTP surface: the endpoint handlers,
// the stream encoder, and the error-to-status mapping.

pub mod error;
pub mod routes;
pub mod streaming;
