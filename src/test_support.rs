// Shared test doubles and harness helpers.
//
// Compiled only for tests. The scripted gateway and recording calendar
// implement the same core ports as the real Gemini and Google Calendar
// clients, so route and session tests can run against a real listener
// without any network.

use crate::core::ai::{Fragment, FragmentStream, GenerationError, GenerationGateway};
use crate::core::calendar::{CalendarApi, CalendarError, CreatedEvent, EventDraft};
use crate::infra::document::Utf8TextExtractor;
use crate::infra::persistence::InMemoryTranscriptStore;
use crate::server::routes::{
    router, AppState, CalendarActions, DynCalendarApi, DynGateway, DynTranscriptStore,
};
use async_trait::async_trait;
use futures_util::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum ScriptMode {
    /// Yield every chunk, then end cleanly.
    Streaming,
    /// Yield every chunk, then fail mid-stream.
    FailAfterChunks,
    /// Refuse to start streaming at all.
    Refuse,
}

/// A generation gateway that replays a fixed script.
pub struct ScriptedGateway {
    chunks: Vec<&'static str>,
    mode: ScriptMode,
    one_shot_reply: Option<&'static str>,
    pub stream_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn with_mode(chunks: Vec<&'static str>, mode: ScriptMode) -> Self {
        Self {
            chunks,
            mode,
            one_shot_reply: None,
            stream_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn streaming(chunks: Vec<&'static str>) -> Self {
        Self::with_mode(chunks, ScriptMode::Streaming)
    }

    pub fn failing_after(chunks: Vec<&'static str>) -> Self {
        Self::with_mode(chunks, ScriptMode::FailAfterChunks)
    }

    pub fn refusing() -> Self {
        Self::with_mode(Vec::new(), ScriptMode::Refuse)
    }

    pub fn one_shot(reply: &'static str) -> Self {
        let mut gateway = Self::with_mode(Vec::new(), ScriptMode::Streaming);
        gateway.one_shot_reply = Some(reply);
        gateway
    }
}

#[async_trait]
impl GenerationGateway for ScriptedGateway {
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if matches!(self.mode, ScriptMode::Refuse) {
            return Err(GenerationError::RequestFailed(
                "scripted refusal".to_string(),
            ));
        }

        self.stream_calls.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<Result<Fragment, GenerationError>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(Fragment::new(*chunk)))
            .collect();

        if matches!(self.mode, ScriptMode::FailAfterChunks) {
            items.push(Err(GenerationError::StreamFailed(
                "scripted mid-stream failure".to_string(),
            )));
        }

        Ok(Box::pin(stream::iter(items)))
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        self.one_shot_reply
            .map(str::to_string)
            .ok_or_else(|| GenerationError::RequestFailed("no scripted reply".to_string()))
    }
}

/// A calendar collaborator that records creates and serves scripted
/// upcoming events.
#[derive(Default)]
pub struct RecordingCalendar {
    pub created: Mutex<Vec<EventDraft>>,
    upcoming: Mutex<Vec<serde_json::Value>>,
}

impl RecordingCalendar {
    pub fn set_upcoming(&self, items: Vec<serde_json::Value>) {
        *self.upcoming.lock().unwrap() = items;
    }
}

#[async_trait]
impl CalendarApi for RecordingCalendar {
    async fn create_event(
        &self,
        _token: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, CalendarError> {
        self.created.lock().unwrap().push(draft.clone());
        Ok(CreatedEvent {
            summary: draft.summary.clone(),
        })
    }

    async fn list_upcoming(&self, _token: &str) -> Result<Vec<serde_json::Value>, CalendarError> {
        Ok(self.upcoming.lock().unwrap().clone())
    }
}

/// Wires an `AppState` around the scripted gateway, returning the store
/// and calendar doubles for assertions.
pub fn test_state(
    gateway: Arc<ScriptedGateway>,
) -> (
    AppState,
    Arc<InMemoryTranscriptStore>,
    Arc<RecordingCalendar>,
) {
    let store = Arc::new(InMemoryTranscriptStore::new());
    let calendar = Arc::new(RecordingCalendar::default());

    let dyn_gateway: DynGateway = gateway;
    let dyn_calendar: DynCalendarApi = Arc::clone(&calendar) as DynCalendarApi;
    let dyn_store: DynTranscriptStore = Arc::clone(&store) as DynTranscriptStore;
    let calendar_actions = Arc::new(CalendarActions::new(
        Arc::clone(&dyn_gateway),
        dyn_calendar,
    ));

    let state = AppState {
        gateway: dyn_gateway,
        transcripts: dyn_store,
        calendar_actions,
        extractor: Arc::new(Utf8TextExtractor::new()),
    };

    (state, store, calendar)
}

/// Serves the router on an ephemeral local port and returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener addr");

    tokio::spawn(async move {
        axum::serve(listener, router(state))
            .await
            .expect("test server");
    });

    format!("http://{addr}")
}
