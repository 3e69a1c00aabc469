// In-memory implementation of TranscriptStore.
//
// Useful for tests and local development: it honors the same upsert
// semantics as the Supabase store (one transcript per user, last write
// wins) without any network.

use crate::core::chat::{Message, PersistenceError, Transcript, TranscriptStore};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemoryTranscriptStore {
    /// Maps user_id -> most recently saved transcript.
    transcripts: DashMap<String, Transcript>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            transcripts: DashMap::new(),
        }
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn upsert(&self, user_id: &str, messages: &[Message]) -> Result<(), PersistenceError> {
        self.transcripts
            .insert(user_id.to_string(), messages.to_vec());
        Ok(())
    }

    async fn load_latest(&self, user_id: &str) -> Result<Option<Transcript>, PersistenceError> {
        Ok(self.transcripts.get(user_id).map(|entry| entry.clone()))
    }
}
