//! Service components for umr-ri

pub mod gemini;
pub mod image_payload;
pub mod recognition;
pub mod staging;

pub use gemini::GeminiVision;
pub use image_payload::{decode_data_uri, ImageFormat, ImagePayload, PayloadError};
pub use recognition::{RecognitionError, RecognitionProvider};
pub use staging::{StagedImage, StagingArea};
