//! Recognition provider capability
//!
//! The external image→number service is modeled as a capability with two
//! operations: upload an image, then extract a numeric measurement from the
//! uploaded reference. Any provider implementing the trait is substitutable;
//! production uses [`crate::services::GeminiVision`], tests use scripted
//! mocks.

use async_trait::async_trait;
use thiserror::Error;

/// Recognition provider errors
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider answered, but not with a usable finite number
    #[error("Unusable recognition result: {0}")]
    InvalidResult(String),
}

/// External image→number recognition capability
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Upload image bytes to the provider; returns the provider-side image
    /// reference (URI) used for the extraction call and stored with the
    /// reading.
    async fn upload(
        &self,
        image: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, RecognitionError>;

    /// Extract the numeric measurement from a previously uploaded image.
    /// Fails with [`RecognitionError::InvalidResult`] if the provider's
    /// answer is not a finite number.
    async fn extract_number(
        &self,
        image_url: &str,
        mime_type: &str,
    ) -> Result<f64, RecognitionError>;
}
