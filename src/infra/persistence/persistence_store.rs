// Implementations of the transcript persistence port.

pub mod in_memory;
pub mod supabase_store;

// Re-export for convenience
pub use in_memory::InMemoryTranscriptStore;
pub use supabase_store::SupabaseTranscriptStore;
