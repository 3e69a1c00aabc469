// Plain-text document extractor.
//
// Real format parsing (PDF and friends) is an external collaborator; this
// implementation handles the text-like uploads by decoding bytes as UTF-8,
// replacing invalid sequences rather than failing.

use crate::core::document::{DocumentTextExtractor, ExtractError};

pub struct Utf8TextExtractor;

impl Utf8TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Utf8TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTextExtractor for Utf8TextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
