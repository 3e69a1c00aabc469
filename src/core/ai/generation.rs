// The boundary abstraction over the external generative-text service.
//
// The core defines WHAT it needs from a generation backend; the infra
// layer provides the actual implementation (Gemini today). Streaming calls
// yield an ordered sequence of fragments; the one-shot mode returns the
// complete text for paths that need a single structured value.

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// One ordered unit of generated text. Fragments are emitted exactly once,
/// in order, and are never retried individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub payload: String,
}

impl Fragment {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The upstream call could not be started or was rejected.
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    /// The upstream stream broke after it had started. Fragments already
    /// emitted are not retracted.
    #[error("generation stream failed: {0}")]
    StreamFailed(String),
}

/// Lazy, ordered fragment sequence. The stream ends after the first error
/// item; nothing follows a failure.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, GenerationError>> + Send>>;

#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Starts a streaming generation for the prompt. Returns an error if
    /// the upstream call cannot be established at all.
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, GenerationError>;

    /// One-shot generation returning the full response text.
    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError>;
}

// Blanket implementation so shared `Arc<dyn GenerationGateway>` handles
// satisfy generic service bounds.
#[async_trait]
impl<T: GenerationGateway + ?Sized> GenerationGateway for Arc<T> {
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, GenerationError> {
        (**self).stream_generate(prompt).await
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate_once(prompt).await
    }
}
