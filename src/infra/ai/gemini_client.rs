// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// This module provides the `GenerationGateway` implementation that
// communicates with Google's Gemini API (https://ai.google.dev/gemini-api/docs).
//
// **Authentication:** the API key is passed as a query parameter (`?key=...`)
// rather than a Bearer token in the Authorization header.
//
// **Endpoints used:**
// - `models/{model}:streamGenerateContent?alt=sse` - incremental fragments,
//   delivered as SSE `data:` lines each carrying a response JSON object.
// - `models/{model}:generateContent` - one-shot completion for the
//   calendar-extraction path.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - model id, defaults to `gemini-1.5-flash-latest`

use crate::core::ai::{Fragment, FragmentStream, GenerationError, GenerationGateway};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Buffered fragments between the upstream reader task and the consumer.
const FRAGMENT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// These structs model the subset of the generateContent request/response
// format the relay needs. See: https://ai.google.dev/api/generate-content

/// A single part of content. Gemini uses a "parts" array; the relay only
/// ever sends and reads text parts.
#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// A message in Gemini's expected format.
#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

/// Request body for both generateContent endpoints. Every relay prompt is
/// a single user turn.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn for_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

/// A candidate response from the model.
#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// The response from the generateContent endpoints. In streaming mode each
/// SSE `data:` line carries one of these with a partial text.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, with multiple parts concatenated.
    fn text(self) -> Option<String> {
        let candidate = self.candidates?.into_iter().next()?;
        let parts = candidate.content?.parts;

        let text: String = parts.into_iter().filter_map(|part| part.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Client for Google's Gemini API.
pub struct GeminiClient {
    /// HTTP client for making requests.
    client: Client,

    /// API key for authentication.
    api_key: String,

    /// Model id interpolated into every endpoint URL.
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn endpoint_url(&self, method: &str) -> String {
        format!(
            "{API_BASE_URL}/{}:{method}?key={}",
            self.model, self.api_key
        )
    }

    /// Parses one SSE line from the streaming endpoint into fragment text.
    ///
    /// Lines without the `data: ` prefix (blank keep-alives, event names)
    /// and payloads that fail to parse are skipped; Gemini sometimes emits
    /// responses with no text part (e.g. a bare finish reason), which are
    /// skipped as well.
    fn parse_sse_line(line: &str) -> Option<String> {
        let data = line.trim_end_matches('\r').strip_prefix("data: ")?;
        let response: GenerateContentResponse = serde_json::from_str(data).ok()?;
        response.text()
    }

    /// Maps a non-success upstream response into a `GenerationError`,
    /// preferring Gemini's own error message when it parses.
    async fn request_error(response: reqwest::Response) -> GenerationError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<GeminiErrorResponse>(&body) {
            return GenerationError::RequestFailed(format!(
                "Gemini API error ({status}): {}",
                parsed.error.message
            ));
        }

        GenerationError::RequestFailed(format!("Gemini API error: {status} - {body}"))
    }
}

#[async_trait]
impl GenerationGateway for GeminiClient {
    /// Starts a streaming generation.
    ///
    /// The upstream SSE body is read on a spawned task; fragments flow to
    /// the returned stream through a bounded channel, so the suspension
    /// point for consumers is the channel receive. A transport failure
    /// mid-stream surfaces as a single terminal `StreamFailed` item.
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, GenerationError> {
        let request = GenerateContentRequest::for_prompt(prompt);
        let url = format!(
            "{API_BASE_URL}/{}:streamGenerateContent?alt=sse&key={}",
            self.model, self.api_key
        );

        tracing::debug!(
            "Gemini stream request to model {}: {} chars prompt",
            self.model,
            prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| GenerationError::RequestFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::request_error(response).await);
        }

        let (tx, rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            // SSE lines split on '\n'; a multi-byte UTF-8 sequence never
            // contains that byte, so buffering raw bytes is safe.
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx
                            .send(Err(GenerationError::StreamFailed(err.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).take(pos).collect();
                    let Ok(line) = std::str::from_utf8(&line) else {
                        continue;
                    };

                    if let Some(text) = Self::parse_sse_line(line) {
                        if tx.send(Ok(Fragment::new(text))).await.is_err() {
                            // Consumer went away; stop reading upstream.
                            return;
                        }
                    }
                }
            }

            // A final line without its terminator still counts.
            if let Ok(rest) = std::str::from_utf8(&buffer) {
                if let Some(text) = Self::parse_sse_line(rest) {
                    let _ = tx.send(Ok(Fragment::new(text))).await;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// One-shot completion for paths that need the whole response at once.
    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::for_prompt(prompt);
        let url = self.endpoint_url("generateContent");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| GenerationError::RequestFailed(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::request_error(response).await);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::RequestFailed(err.to_string()))?;

        parsed.text().ok_or_else(|| {
            GenerationError::RequestFailed(
                "No content in Gemini response - the model may have been blocked by safety filters"
                    .to_string(),
            )
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
