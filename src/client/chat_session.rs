// The sidebar chat view's state, without the view.
//
// A session owns one transcript and drives the per-exchange reducer from
// decoded frames. Every step republishes the transcript over a watch
// channel; when an exchange settles cleanly the whole transcript is
// upserted through the relay. Failed exchanges substitute the fixed
// failure message and skip persistence.

use crate::client::relay_client::{FrameStream, RelayClient, RelayError};
use crate::core::chat::{
    reduce, ExchangeState, FragmentEvent, Message, Transcript, TranscriptStore, GREETING,
};
use crate::core::stream::Frame;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Question used for document uploads that don't come with one.
pub const DEFAULT_DOCUMENT_QUESTION: &str = "Summarize this document.";

pub struct ChatSession {
    relay: Arc<RelayClient>,
    user_id: String,
    state: ExchangeState,
    publisher: watch::Sender<Transcript>,
}

impl ChatSession {
    /// Loads the user's most recent transcript from the persistence
    /// collaborator, falling back to the greeting when there is none (or
    /// when the load fails — history is best-effort on mount).
    pub async fn mount(
        relay: Arc<RelayClient>,
        store: &dyn TranscriptStore,
        user_id: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();

        let transcript = match store.load_latest(&user_id).await {
            Ok(Some(messages)) if !messages.is_empty() => messages,
            Ok(_) => vec![Message::ai(GREETING)],
            Err(err) => {
                tracing::error!("Error fetching history: {err}");
                vec![Message::ai(GREETING)]
            }
        };

        let (publisher, _) = watch::channel(transcript.clone());

        Self {
            relay,
            user_id,
            state: ExchangeState::idle(transcript),
            publisher,
        }
    }

    /// Observers receive the transcript after every applied event.
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.publisher.subscribe()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    /// Sends a chat message with optional page context and runs the
    /// exchange to completion.
    pub async fn send_message(&mut self, text: &str, page_context: Option<String>) {
        self.begin(text);
        let stream = self.relay.stream_chat(text, page_context.as_deref()).await;
        self.finish_exchange(stream).await;
    }

    /// Uploads a PDF for summarization.
    pub async fn summarize_document(&mut self, file_name: &str, bytes: Vec<u8>) {
        self.begin(&format!("{DEFAULT_DOCUMENT_QUESTION} ({file_name})"));
        let stream = self.relay.stream_document_summary(file_name, bytes).await;
        self.finish_exchange(stream).await;
    }

    /// Asks a question about text already extracted from a document.
    /// Extraction itself is the caller's collaborator.
    pub async fn analyze_document(&mut self, file_name: &str, question: &str, text: &str) {
        self.begin(&format!("{question} ({file_name})"));
        let stream = self.relay.stream_analysis(question, text).await;
        self.finish_exchange(stream).await;
    }

    fn begin(&mut self, user_text: &str) {
        self.state = std::mem::take(&mut self.state).begin(user_text);
        self.publish();
    }

    fn apply(&mut self, event: &FragmentEvent) {
        self.state = reduce(std::mem::take(&mut self.state), event);
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.transcript.clone());
    }

    async fn finish_exchange(&mut self, stream: Result<FrameStream, RelayError>) {
        let mut frames = match stream {
            Ok(frames) => frames,
            Err(err) => {
                tracing::error!("Error processing request: {err}");
                self.apply(&FragmentEvent::StreamFailed);
                return;
            }
        };

        while let Some(item) = frames.next().await {
            match item {
                Ok(Frame::Chunk(payload)) => self.apply(&FragmentEvent::Chunk(payload)),
                Ok(Frame::Error(message)) => {
                    tracing::error!("Stream reported terminal error: {message}");
                    self.apply(&FragmentEvent::StreamFailed);
                    break;
                }
                Err(err) => {
                    tracing::error!("Error processing request: {err}");
                    self.apply(&FragmentEvent::StreamFailed);
                    break;
                }
            }
        }

        if !self.state.settled() {
            self.apply(&FragmentEvent::StreamClosed);
        }

        if self.state.should_persist() {
            // Best-effort: a failed save still leaves the finished
            // exchange on screen.
            if let Err(err) = self
                .relay
                .save_transcript(&self.user_id, &self.state.transcript)
                .await
            {
                tracing::error!("Error saving chat: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::{Author, STREAM_FAILURE_MESSAGE};
    use crate::test_support::{spawn_app, test_state, ScriptedGateway};

    async fn session_against(
        gateway: ScriptedGateway,
    ) -> (ChatSession, Arc<crate::infra::persistence::InMemoryTranscriptStore>) {
        let (state, store, _) = test_state(Arc::new(gateway));
        let base = spawn_app(state).await;
        let relay = Arc::new(RelayClient::new(base));
        let session = ChatSession::mount(relay, store.as_ref(), "user-1").await;
        (session, store)
    }

    #[tokio::test]
    async fn test_mount_without_history_shows_greeting() {
        let (session, _) = session_against(ScriptedGateway::streaming(vec![])).await;
        assert_eq!(session.transcript(), &vec![Message::ai(GREETING)]);
    }

    #[tokio::test]
    async fn test_mount_with_history_loads_latest_transcript() {
        let (state, store, _) =
            test_state(Arc::new(ScriptedGateway::streaming(vec![])));
        let stored = vec![Message::user("earlier"), Message::ai("reply")];
        store.upsert("user-1", &stored).await.unwrap();

        let base = spawn_app(state).await;
        let session =
            ChatSession::mount(Arc::new(RelayClient::new(base)), store.as_ref(), "user-1").await;

        assert_eq!(session.transcript(), &stored);
    }

    #[tokio::test]
    async fn test_completed_exchange_updates_and_persists_transcript() {
        let (mut session, store) =
            session_against(ScriptedGateway::streaming(vec!["The ", "fox ", "jumps."])).await;

        session.send_message("summarize the page", None).await;

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1], Message::user("summarize the page"));
        assert_eq!(transcript[2].author, Author::Ai);
        assert_eq!(transcript[2].text, "The fox jumps.");

        // The whole transcript was upserted once the stream settled.
        let saved = store.load_latest("user-1").await.unwrap().unwrap();
        assert_eq!(&saved, transcript);
    }

    #[tokio::test]
    async fn test_subscribers_observe_every_fragment_step() {
        let (mut session, _) =
            session_against(ScriptedGateway::streaming(vec!["a", "b", "c"])).await;
        let subscriber = session.subscribe();

        session.send_message("question", None).await;

        // The watch channel holds the final republished transcript.
        assert_eq!(subscriber.borrow().last().unwrap().text, "abc");
    }

    #[tokio::test]
    async fn test_failed_exchange_substitutes_fixed_message_and_skips_persistence() {
        let (mut session, store) =
            session_against(ScriptedGateway::failing_after(vec!["partial ", "answer"])).await;

        session.send_message("question", None).await;

        // Partial output is replaced entirely by the fixed failure text.
        assert_eq!(
            session.transcript().last().unwrap().text,
            STREAM_FAILURE_MESSAGE
        );

        // Nothing was persisted on the error path.
        assert!(store.load_latest("user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refused_generation_also_fails_the_exchange() {
        let (mut session, store) = session_against(ScriptedGateway::refusing()).await;

        session.send_message("question", None).await;

        assert_eq!(
            session.transcript().last().unwrap().text,
            STREAM_FAILURE_MESSAGE
        );
        assert!(store.load_latest("user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_document_analysis_runs_a_normal_exchange() {
        let (mut session, store) =
            session_against(ScriptedGateway::streaming(vec!["It is a report."])).await;

        session
            .analyze_document("report.csv", "What is this file?", "col_a,col_b\n1,2")
            .await;

        let transcript = session.transcript();
        assert_eq!(
            transcript[1],
            Message::user("What is this file? (report.csv)")
        );
        assert_eq!(transcript[2].text, "It is a report.");
        assert!(store.load_latest("user-1").await.unwrap().is_some());
    }
}
