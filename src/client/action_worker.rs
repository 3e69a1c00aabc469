// The background worker path: popup actions executed out of band.
//
// Unlike the chat session, the worker consumes its stream silently and
// publishes a single finished message into a shared slot once the stream
// ends. A transport drop mid-stream loses the exchange — delivery on this
// path is best-effort by design, with no retry or resume.

use crate::client::relay_client::RelayClient;
use crate::core::chat::Message;
use crate::core::stream::Frame;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Published when a create-event request arrives with no Google token.
pub const CONNECT_GOOGLE_MESSAGE: &str =
    "Error: Please connect to your Google Account in Settings first.";

pub struct ActionWorker {
    relay: Arc<RelayClient>,
    slot: watch::Sender<Option<Message>>,
}

impl ActionWorker {
    pub fn new(relay: Arc<RelayClient>) -> Self {
        let (slot, _) = watch::channel(None);
        Self { relay, slot }
    }

    /// Views watch this slot for the next finished message.
    pub fn subscribe(&self) -> watch::Receiver<Option<Message>> {
        self.slot.subscribe()
    }

    /// Executes one popup action. `create_event` goes through the
    /// out-of-band channel; everything else streams.
    pub async fn execute(&self, action: &str, text: &str, google_token: Option<&str>) {
        if action == "create_event" {
            self.create_event(google_token, text).await;
        } else {
            self.run_action_stream(action, text).await;
        }
    }

    async fn create_event(&self, token: Option<&str>, text: &str) {
        let Some(token) = token else {
            self.slot
                .send_replace(Some(Message::ai(CONNECT_GOOGLE_MESSAGE)));
            return;
        };

        match self.relay.create_event(token, text).await {
            Ok(outcome) => {
                let text = if outcome.success {
                    outcome.message.unwrap_or_default()
                } else {
                    format!("Error: {}", outcome.error.unwrap_or_default())
                };
                self.slot.send_replace(Some(Message::ai(text)));
            }
            Err(err) => {
                tracing::error!("Create Event Error: {err}");
            }
        }
    }

    async fn run_action_stream(&self, action: &str, text: &str) {
        let mut frames = match self.relay.stream_action(action, text).await {
            Ok(frames) => frames,
            Err(err) => {
                tracing::error!("Error in background stream handler: {err}");
                return;
            }
        };

        let mut full_response = String::new();
        while let Some(item) = frames.next().await {
            match item {
                Ok(Frame::Chunk(chunk)) => full_response.push_str(&chunk),
                Ok(Frame::Error(message)) => {
                    // Error frames carry no text; whatever accumulated is
                    // still published when the stream ends.
                    tracing::debug!("stream error frame: {message}");
                }
                Err(err) => {
                    tracing::error!("Error in background stream handler: {err}");
                    return;
                }
            }
        }

        self.slot.send_replace(Some(Message::ai(full_response)));
    }
}
