// src/extract.rs

/// Turns an uploaded document into plain text.
///
/// An empty or whitespace-only result means "no usable content" and is not an
/// error; callers degrade to the no-text state.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, document: &[u8]) -> String;
}

/// Accepts plain-text uploads. Invalid UTF-8 is replaced rather than rejected,
/// and NUL bytes (binary files) are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl ContentExtractor for PlainTextExtractor {
    fn extract(&self, document: &[u8]) -> String {
        String::from_utf8_lossy(document).replace('\0', "")
    }
}
