// Port for the document text extraction collaborator.
//
// Format parsing itself (PDF, DOCX, CSV) is delegated: the relay only
// needs a `bytes -> text` function to feed the document summary prompt.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to extract document text: {0}")]
    Failed(String),
}

pub trait DocumentTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}
