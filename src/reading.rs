//! Reading pipeline collaborator seams.
//!
//! Text extraction from chat screenshots and the oracle commentary model are
//! external services; this module defines their traits and the thin pipeline
//! that feeds one into the other.

use crate::error::Result;
use async_trait::async_trait;

/// Trait for the screenshot text-extraction collaborator.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the conversation text from one screenshot image.
    async fn extract_text(&self, image: &[u8]) -> Result<String>;
}

/// Trait for the oracle commentary collaborator.
#[async_trait]
pub trait CommentaryModel: Send + Sync {
    /// Produce oracle commentary for an extracted conversation.
    async fn commentary(&self, transcript: &str) -> Result<String>;
}

/// A completed reading: the extracted transcript and the commentary on it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Reading {
    pub transcript: String,
    pub commentary: String,
}

/// Pipes screenshot uploads through extraction and commentary.
pub struct ReadingService<E: TextExtractor, M: CommentaryModel> {
    extractor: E,
    model: M,
}

impl<E: TextExtractor, M: CommentaryModel> ReadingService<E, M> {
    #[must_use]
    pub fn new(extractor: E, model: M) -> Self {
        Self { extractor, model }
    }

    /// Run a reading over a batch of screenshots.
    pub async fn read(&self, images: &[Vec<u8>]) -> Result<Reading> {
        let mut transcript = String::new();
        for image in images {
            let text = self.extractor.extract_text(image).await?;
            transcript.push_str(&text);
            transcript.push_str("\n\n");
        }

        let commentary = self.model.commentary(&transcript).await?;
        Ok(Reading {
            transcript,
            commentary,
        })
    }
}

/// Mock collaborators for testing.
#[cfg(any(test, feature = "test-clients"))]
pub mod test {
    use super::*;

    /// Extractor that "reads" the image bytes as UTF-8.
    pub struct MockTextExtractor;

    #[async_trait]
    impl TextExtractor for MockTextExtractor {
        async fn extract_text(&self, image: &[u8]) -> Result<String> {
            Ok(String::from_utf8_lossy(image).into_owned())
        }
    }

    /// Model that echoes a canned reading.
    pub struct MockCommentaryModel;

    #[async_trait]
    impl CommentaryModel for MockCommentaryModel {
        async fn commentary(&self, transcript: &str) -> Result<String> {
            Ok(format!("The cards see {} characters of longing.", transcript.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::{MockCommentaryModel, MockTextExtractor};
    use super::*;

    #[tokio::test]
    async fn test_reading_concatenates_screenshots() {
        let service = ReadingService::new(MockTextExtractor, MockCommentaryModel);
        let images = vec![b"hey, u up?".to_vec(), b"sorry, fell asleep".to_vec()];

        let reading = service.read(&images).await.unwrap();
        assert!(reading.transcript.contains("hey, u up?"));
        assert!(reading.transcript.contains("sorry, fell asleep"));
        assert!(!reading.commentary.is_empty());
    }
}
