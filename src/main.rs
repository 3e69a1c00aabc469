// This is the entry point of the relay server.
//
// This file's job is to:
// 1. Load configuration
// 2. Construct the service handles (dependency injection)
// 3. Mount the routes and serve

use omni_relay::core::ai::GenerationGateway;
use omni_relay::core::calendar::CalendarApi;
use omni_relay::core::chat::TranscriptStore;
use omni_relay::core::document::DocumentTextExtractor;
use omni_relay::infra::ai::GeminiClient;
use omni_relay::infra::calendar::GoogleCalendarClient;
use omni_relay::infra::document::Utf8TextExtractor;
use omni_relay::infra::persistence::SupabaseTranscriptStore;
use omni_relay::server::routes::{self, AppState, CalendarActions};
use std::sync::Arc;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_PORT: u16 = 3001;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Configuration is read once here; a missing credential is fatal at
    // startup rather than on the first request.
    let gemini_api_key = std::env::var("GEMINI_API_KEY")
        .expect("Missing GEMINI_API_KEY environment variable! Create a .env file with your key.");
    let supabase_url = std::env::var("SUPABASE_URL")
        .expect("Missing SUPABASE_URL environment variable! Create a .env file with your project URL.");
    let supabase_service_key = std::env::var("SUPABASE_SERVICE_KEY")
        .expect("Missing SUPABASE_SERVICE_KEY environment variable! Create a .env file with your service key.");

    let gemini_model =
        std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create the service handles with their dependencies. This is the
    // composition root where everything is wired together; handles live
    // for the process lifetime and need no teardown.

    let gateway: Arc<dyn GenerationGateway> =
        Arc::new(GeminiClient::new(gemini_api_key, gemini_model));

    let transcripts: Arc<dyn TranscriptStore> = Arc::new(SupabaseTranscriptStore::new(
        supabase_url,
        supabase_service_key,
    ));

    let calendar: Arc<dyn CalendarApi> = Arc::new(GoogleCalendarClient::new());
    let calendar_actions = Arc::new(CalendarActions::new(Arc::clone(&gateway), calendar));

    let extractor: Arc<dyn DocumentTextExtractor> = Arc::new(Utf8TextExtractor::new());

    let state = AppState {
        gateway,
        transcripts,
        calendar_actions,
        extractor,
    };

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|err| panic!("Failed to bind port {port}: {err}"));

    tracing::info!("Server listening at http://localhost:{port}");

    axum::serve(listener, app).await.expect("Server error");
}
