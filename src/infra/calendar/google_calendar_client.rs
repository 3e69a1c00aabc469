// Google Calendar REST client.
//
// The relay never holds Google credentials of its own: every call carries
// the end user's OAuth access token as a Bearer header, against the
// primary calendar's events collection.

use crate::core::calendar::{CalendarApi, CalendarError, CreatedEvent, EventDraft, EVENT_TIME_ZONE};
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// How far ahead the upcoming-events listing looks.
const LIST_WINDOW_DAYS: i64 = 7;
const LIST_MAX_RESULTS: &str = "10";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct EventResource {
    summary: String,
    start: EventDateTime,
    end: EventDateTime,
}

impl EventResource {
    fn from_draft(draft: &EventDraft) -> Self {
        let time_zone = EVENT_TIME_ZONE.name().to_string();
        Self {
            summary: draft.summary.clone(),
            start: EventDateTime {
                date_time: draft.start.to_rfc3339(),
                time_zone: time_zone.clone(),
            },
            end: EventDateTime {
                date_time: draft.end.to_rfc3339(),
                time_zone,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEventResource {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

pub struct GoogleCalendarClient {
    client: Client,
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn create_event(
        &self,
        token: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, CalendarError> {
        let resource = EventResource::from_draft(draft);

        let response = self
            .client
            .post(EVENTS_URL)
            .bearer_auth(token)
            .json(&resource)
            .send()
            .await
            .map_err(|err| CalendarError::Api(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Google API error: {body}");
            return Err(CalendarError::Api(format!("Google API failed: {status}")));
        }

        let created: CreatedEventResource = response
            .json()
            .await
            .map_err(|err| CalendarError::Api(err.to_string()))?;

        Ok(CreatedEvent {
            summary: created.summary.unwrap_or_else(|| draft.summary.clone()),
        })
    }

    async fn list_upcoming(&self, token: &str) -> Result<Vec<serde_json::Value>, CalendarError> {
        let now = Utc::now();
        let time_min = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let time_max = (now + Duration::days(LIST_WINDOW_DAYS))
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let response = self
            .client
            .get(EVENTS_URL)
            .bearer_auth(token)
            .query(&[
                ("maxResults", LIST_MAX_RESULTS),
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .map_err(|err| CalendarError::Api(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(CalendarError::Api(format!("Google API failed: {status}")));
        }

        let list: EventListResponse = response
            .json()
            .await
            .map_err(|err| CalendarError::Api(err.to_string()))?;

        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_event_resource_carries_fixed_time_zone() {
        let start = DateTime::parse_from_rfc3339("2025-08-24T15:00:00+05:30").unwrap();
        let draft = EventDraft {
            summary: "Meet John".to_string(),
            start,
            end: start + Duration::minutes(60),
        };

        let json = serde_json::to_value(EventResource::from_draft(&draft)).unwrap();
        assert_eq!(json["summary"], "Meet John");
        assert_eq!(json["start"]["dateTime"], "2025-08-24T15:00:00+05:30");
        assert_eq!(json["end"]["dateTime"], "2025-08-24T16:00:00+05:30");
        assert_eq!(json["start"]["timeZone"], "Asia/Kolkata");
        assert_eq!(json["end"]["timeZone"], "Asia/Kolkata");
    }

    #[test]
    fn test_list_response_defaults_to_empty_items() {
        let list: EventListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
    }
}
