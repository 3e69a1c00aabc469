// Calendar event creation from free text: the one relay path that needs a
// single structured value back from the model instead of a stream.
//
// The model is asked for exactly one JSON object with `title` and
// `startTime`; we pull the object out of the raw response with a greedy
// brace match (first `{` to last `}`). That contract between prompt and
// parser is fragile, and reproduced here as-is.

use crate::core::ai::{GenerationError, GenerationGateway};
use crate::core::prompt::PromptRequest;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Fixed timezone assumption baked into the extraction prompt and sent on
/// both endpoints of every created event.
pub const EVENT_TIME_ZONE: chrono_tz::Tz = chrono_tz::Asia::Kolkata;

/// Every extracted event gets this fixed duration.
pub const EVENT_DURATION_MINUTES: i64 = 60;

/// Event details parsed from the model's one-shot response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedEvent {
    pub title: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
}

/// A fully-resolved event ready for the calendar collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub summary: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// What the calendar collaborator reports back after a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub summary: String,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar API error: {0}")]
    Api(String),
}

/// Failure of the whole create-event action. Every stage maps into one
/// variant; callers see a single terminal result either way.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("model response contained no JSON object")]
    NoJsonFound,

    #[error("failed to parse event details: {0}")]
    ParseFailed(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Port for the Google Calendar collaborator.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn create_event(
        &self,
        token: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, CalendarError>;

    /// Upcoming events on the primary calendar, passed through verbatim.
    async fn list_upcoming(&self, token: &str) -> Result<Vec<serde_json::Value>, CalendarError>;
}

#[async_trait]
impl<T: CalendarApi + ?Sized> CalendarApi for Arc<T> {
    async fn create_event(
        &self,
        token: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, CalendarError> {
        (**self).create_event(token, draft).await
    }

    async fn list_upcoming(&self, token: &str) -> Result<Vec<serde_json::Value>, CalendarError> {
        (**self).list_upcoming(token).await
    }
}

/// Greedy JSON-object extraction: the slice from the first `{` to the last
/// `}`, or nothing.
pub fn extract_event_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Orchestrates the out-of-band create-event path: one-shot generation,
/// JSON extraction, end-time computation, calendar create.
pub struct CalendarActionService<G: GenerationGateway, C: CalendarApi> {
    gateway: G,
    calendar: C,
}

impl<G: GenerationGateway, C: CalendarApi> CalendarActionService<G, C> {
    pub fn new(gateway: G, calendar: C) -> Self {
        Self { gateway, calendar }
    }

    /// Turns free text into one created calendar event and returns the
    /// user-facing success message. Any stage failing surfaces as a single
    /// `ActionError` with no partial side effects reported.
    pub async fn create_from_text(
        &self,
        token: &str,
        text: &str,
        today: NaiveDate,
    ) -> Result<String, ActionError> {
        let prompt = PromptRequest::create_event(text, today).build();
        let raw = self.gateway.generate_once(&prompt).await?;

        let json = extract_event_json(&raw).ok_or(ActionError::NoJsonFound)?;
        let event: ExtractedEvent =
            serde_json::from_str(json).map_err(|err| ActionError::ParseFailed(err.to_string()))?;

        let start = DateTime::parse_from_rfc3339(&event.start_time)
            .map_err(|err| ActionError::ParseFailed(err.to_string()))?;
        let end = start + Duration::minutes(EVENT_DURATION_MINUTES);

        let created = self
            .calendar
            .create_event(
                token,
                &EventDraft {
                    summary: event.title,
                    start,
                    end,
                },
            )
            .await?;

        Ok(format!("Event '{}' created successfully!", created.summary))
    }

    pub async fn upcoming_events(
        &self,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, CalendarError> {
        self.calendar.list_upcoming(token).await
    }
}
