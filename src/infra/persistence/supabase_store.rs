// Supabase-backed transcript store.
//
// Talks to the PostgREST endpoint of a Supabase project with the service
// key. Transcripts live in a `chat_history` table keyed by `user_id`, one
// row per user, with the whole message array in a JSON column. Saving is
// an upsert (`on_conflict=user_id` + merge-duplicates), so the last writer
// wins; loading reads the newest row only.
//
// **Environment Variables:**
// - `SUPABASE_URL` - project base URL
// - `SUPABASE_SERVICE_KEY` - service role key (server-side only)

use crate::core::chat::{Message, PersistenceError, Transcript, TranscriptStore};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const CHAT_HISTORY_TABLE: &str = "chat_history";

#[derive(Debug, Serialize)]
struct ChatHistoryRow<'a> {
    user_id: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatHistoryRecord {
    messages: Transcript,
}

pub struct SupabaseTranscriptStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseTranscriptStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            service_key: service_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{CHAT_HISTORY_TABLE}", self.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl TranscriptStore for SupabaseTranscriptStore {
    async fn upsert(&self, user_id: &str, messages: &[Message]) -> Result<(), PersistenceError> {
        let row = ChatHistoryRow { user_id, messages };

        let response = self
            .authed(self.client.post(self.table_url()))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await
            .map_err(|err| PersistenceError::Store(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Store(format!(
                "upsert rejected ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn load_latest(&self, user_id: &str) -> Result<Option<Transcript>, PersistenceError> {
        let user_filter = format!("eq.{user_id}");
        let response = self
            .authed(self.client.get(self.table_url()))
            .query(&[
                ("select", "messages"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|err| PersistenceError::Store(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Store(format!(
                "load rejected ({status}): {body}"
            )));
        }

        let rows: Vec<ChatHistoryRecord> = response
            .json()
            .await
            .map_err(|err| PersistenceError::Store(err.to_string()))?;

        Ok(rows.into_iter().next().map(|row| row.messages))
    }
}
