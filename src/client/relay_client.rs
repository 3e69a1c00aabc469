// HTTP client for the relay endpoints.
//
// Streaming endpoints hand back a `FrameStream`: the response body is read
// incrementally on a spawned task and pushed through the shared frame
// decoder, so consumers see whole frames regardless of how the network
// sliced them.

use crate::core::chat::Message;
use crate::core::prompt::ComposeContext;
use crate::core::stream::{Frame, FrameDecoder};
use futures_util::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const FRAME_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(String),

    #[error("relay endpoint returned {0}")]
    Status(StatusCode),
}

/// Decoded frames from one streaming endpoint. Ends after the transport
/// closes; a transport failure mid-stream surfaces as a final `Err` item.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, RelayError>> + Send>>;

/// Outcome of the create-event action, as reported by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn open_stream(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<FrameStream, RelayError> {
        let response = request
            .send()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))?;

        // The body is decoded whatever the status: a refused generation
        // arrives as a 500 whose body is a single error frame.
        Ok(decode_frames(response))
    }

    pub async fn stream_chat(
        &self,
        message: &str,
        context: Option<&str>,
    ) -> Result<FrameStream, RelayError> {
        let body = json!({ "message": message, "context": context });
        self.open_stream(self.client.post(self.url("/api/chat")).json(&body))
            .await
    }

    pub async fn stream_action(&self, action: &str, text: &str) -> Result<FrameStream, RelayError> {
        let body = json!({ "action": action, "text": text });
        self.open_stream(self.client.post(self.url("/api/action")).json(&body))
            .await
    }

    pub async fn stream_compose(
        &self,
        template: &str,
        context: &ComposeContext,
    ) -> Result<FrameStream, RelayError> {
        let body = json!({ "template": template, "context": context });
        self.open_stream(self.client.post(self.url("/api/compose")).json(&body))
            .await
    }

    pub async fn stream_analysis(
        &self,
        question: &str,
        context: &str,
    ) -> Result<FrameStream, RelayError> {
        let body = json!({ "question": question, "context": context });
        self.open_stream(self.client.post(self.url("/api/analyze-text")).json(&body))
            .await
    }

    pub async fn stream_document_summary(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<FrameStream, RelayError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("pdf", part);
        self.open_stream(
            self.client
                .post(self.url("/api/summarize-pdf"))
                .multipart(form),
        )
        .await
    }

    pub async fn save_transcript(
        &self,
        user_id: &str,
        messages: &[Message],
    ) -> Result<(), RelayError> {
        let body = json!({ "userId": user_id, "messages": messages });
        let response = self
            .client
            .post(self.url("/api/save_chat"))
            .json(&body)
            .send()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }
        Ok(())
    }

    /// Both the success and failure shapes are carried in the body, so the
    /// status code is not checked here.
    pub async fn create_event(&self, token: &str, text: &str) -> Result<EventOutcome, RelayError> {
        let body = json!({ "token": token, "text": text });
        let response = self
            .client
            .post(self.url("/api/create-event"))
            .json(&body)
            .send()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))?;

        response
            .json()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))
    }

    pub async fn list_events(&self, token: &str) -> Result<Vec<serde_json::Value>, RelayError> {
        let response = self
            .client
            .post(self.url("/api/get-events"))
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }

        response
            .json()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))
    }
}

/// Bridges a streaming response body into decoded frames.
fn decode_frames(response: reqwest::Response) -> FrameStream {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut bytes = response.bytes_stream();

        while let Some(next) = bytes.next().await {
            match next {
                Ok(chunk) => {
                    for frame in decoder.feed(&chunk) {
                        if tx.send(Ok(frame)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(RelayError::Http(err.to_string()))).await;
                    return;
                }
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Accumulates chunk frames into the complete response text, the way the
/// compose and analysis views consume a stream. Error frames carry no
/// text and are skipped.
pub async fn collect_text(mut frames: FrameStream) -> Result<String, RelayError> {
    let mut full = String::new();

    while let Some(item) = frames.next().await {
        match item? {
            Frame::Chunk(chunk) => full.push_str(&chunk),
            Frame::Error(message) => {
                tracing::debug!("skipping error frame: {message}");
            }
        }
    }

    Ok(full)
}
