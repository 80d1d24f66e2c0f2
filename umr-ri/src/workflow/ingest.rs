//! Reading ingestion pipeline
//!
//! Drives one upload submission end to end: payload decoding, customer
//! resolution, duplicate-period check, staging, recognition, persistence.
//! The duplicate check runs before any recognition traffic — the external
//! call is the expensive step and a doomed submission must not pay for it.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{customers, readings};
use crate::error::ApiError;
use crate::models::MeasureKind;
use crate::services::image_payload::{self, PayloadError};
use crate::services::recognition::RecognitionProvider;
use crate::services::staging::StagingArea;

/// A validated upload submission (field presence and kind/timestamp shape
/// are checked at the API boundary)
#[derive(Debug)]
pub struct Submission {
    /// Base64 image data URI
    pub image: String,
    pub customer_code: String,
    pub measure_type: MeasureKind,
    pub measure_datetime: DateTime<Utc>,
}

/// Successful ingestion outcome
#[derive(Debug)]
pub struct IngestResult {
    pub image_url: String,
    pub measure_value: f64,
    pub measure_uuid: Uuid,
}

/// Run the ingestion pipeline for one submission.
pub async fn ingest_reading(
    db: &SqlitePool,
    recognition: &dyn RecognitionProvider,
    staging: &StagingArea,
    submission: Submission,
) -> Result<IngestResult, ApiError> {
    // Decode and verify the image payload before touching any collaborator
    let payload = image_payload::decode_data_uri(&submission.image).map_err(reject_payload)?;

    let customer = customers::get_or_create(db, &submission.customer_code).await?;

    // Cheap pre-check; the month-bucket unique constraint at insert time is
    // the authoritative guard.
    let window = umr_common::time::month_window(submission.measure_datetime)?;
    if readings::find_in_window(db, customer.guid, submission.measure_type, window)
        .await?
        .is_some()
    {
        return Err(ApiError::DoubleReport);
    }

    // Staged file lives only until the provider has accepted the upload
    let staged = staging
        .stage(&payload.bytes, payload.format.extension())
        .await?;
    let display_name = format!(
        "{}_{}_{}",
        submission.customer_code,
        submission.measure_type,
        staged.file_name()
    );

    let uploaded = recognition
        .upload(&payload.bytes, payload.format.mime(), &display_name)
        .await;
    drop(staged);
    let image_url = uploaded?;

    let measure_value = recognition
        .extract_number(&image_url, payload.format.mime())
        .await?;

    let reading = readings::Reading::new(
        customer.guid,
        submission.measure_type,
        submission.measure_datetime,
        image_url.clone(),
        measure_value,
    );

    match readings::insert_reading(db, &reading).await? {
        readings::InsertOutcome::Inserted => {}
        // A concurrent submission won the month bucket between the window
        // check and this insert
        readings::InsertOutcome::DuplicatePeriod => return Err(ApiError::DoubleReport),
    }

    tracing::info!(
        customer_code = %submission.customer_code,
        measure_type = %submission.measure_type,
        reading = %reading.guid,
        measure_value,
        "reading ingested"
    );

    Ok(IngestResult {
        image_url,
        measure_value,
        measure_uuid: reading.guid,
    })
}

fn reject_payload(err: PayloadError) -> ApiError {
    let description = match &err {
        PayloadError::UnsupportedFormat(_) | PayloadError::FormatMismatch { .. } => {
            "Unsupported image format"
        }
        PayloadError::MissingPrefix | PayloadError::InvalidBase64(_) => {
            "Incomplete or invalid data"
        }
    };
    tracing::warn!(error = %err, "image payload rejected");
    ApiError::InvalidData(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::recognition::RecognitionError;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    ];

    struct FakeProvider {
        value: f64,
        fail_extraction: bool,
        upload_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(value: f64) -> Self {
            Self {
                value,
                fail_extraction: false,
                upload_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                value: 0.0,
                fail_extraction: true,
                upload_calls: AtomicUsize::new(0),
            }
        }

        fn uploads(&self) -> usize {
            self.upload_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecognitionProvider for FakeProvider {
        async fn upload(
            &self,
            _image: &[u8],
            _mime_type: &str,
            display_name: &str,
        ) -> Result<String, RecognitionError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("files/{display_name}"))
        }

        async fn extract_number(
            &self,
            _image_url: &str,
            _mime_type: &str,
        ) -> Result<f64, RecognitionError> {
            if self.fail_extraction {
                Err(RecognitionError::InvalidResult("gibberish".to_string()))
            } else {
                Ok(self.value)
            }
        }
    }

    async fn setup() -> (sqlx::SqlitePool, StagingArea, tempfile::TempDir) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        let temp = tempfile::TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path().join("staging")).unwrap();
        (pool, staging, temp)
    }

    fn submission(code: &str, kind: MeasureKind, taken_at: &str) -> Submission {
        Submission {
            image: format!("data:image/png;base64,{}", BASE64.encode(PNG_BYTES)),
            customer_code: code.to_string(),
            measure_type: kind,
            measure_datetime: umr_common::time::from_db(taken_at).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_successful_ingest_persists_unconfirmed_reading() {
        let (pool, staging, _temp) = setup().await;
        let provider = FakeProvider::returning(432.1);

        let result = ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Water, "2024-08-15T10:00:00Z"),
        )
        .await
        .unwrap();

        assert_eq!(result.measure_value, 432.1);
        assert!(result.image_url.starts_with("files/C1_WATER_"));

        let stored = readings::find_by_id(&pool, result.measure_uuid)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.confirmed);
        assert_eq!(stored.measure_value, 432.1);
        assert_eq!(stored.image_url, result.image_url);
    }

    #[tokio::test]
    async fn test_duplicate_month_short_circuits_recognition() {
        let (pool, staging, _temp) = setup().await;
        let provider = FakeProvider::returning(10.0);

        ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Water, "2024-08-15T10:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(provider.uploads(), 1);

        // Same month, same kind: rejected before any provider traffic
        let err = ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Water, "2024-08-20T10:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::DoubleReport));
        assert_eq!(provider.uploads(), 1);
    }

    #[tokio::test]
    async fn test_other_kind_same_month_accepted() {
        let (pool, staging, _temp) = setup().await;
        let provider = FakeProvider::returning(10.0);

        ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Water, "2024-08-15T10:00:00Z"),
        )
        .await
        .unwrap();

        ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Gas, "2024-08-20T10:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(provider.uploads(), 2);
    }

    #[tokio::test]
    async fn test_recognition_failure_creates_no_reading_and_cleans_staging() {
        let (pool, staging, _temp) = setup().await;
        let provider = FakeProvider::failing();

        let err = ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Water, "2024-08-15T10:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Recognition(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let leftovers: Vec<_> = std::fs::read_dir(staging.dir()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_bad_payload_rejected_before_any_side_effect() {
        let (pool, staging, _temp) = setup().await;
        let provider = FakeProvider::returning(10.0);

        let mut bad = submission("C1", MeasureKind::Water, "2024-08-15T10:00:00Z");
        bad.image = "data:image/gif;base64,AAAA".to_string();

        let err = ingest_reading(&pool, &provider, &staging, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidData(_)));
        assert_eq!(provider.uploads(), 0);

        let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(customers, 0);
    }

    #[tokio::test]
    async fn test_insert_race_surfaces_as_double_report() {
        let (pool, staging, _temp) = setup().await;
        let provider = FakeProvider::returning(10.0);

        // Simulate a racing submission that won the bucket after the window
        // check would have passed: pre-insert a reading directly.
        let customer = customers::get_or_create(&pool, "C1").await.unwrap();
        let rival = readings::Reading::new(
            customer.guid,
            MeasureKind::Water,
            umr_common::time::from_db("2024-08-01T00:00:00Z").unwrap(),
            "files/rival".to_string(),
            1.0,
        );
        readings::insert_reading(&pool, &rival).await.unwrap();

        let err = ingest_reading(
            &pool,
            &provider,
            &staging,
            submission("C1", MeasureKind::Water, "2024-08-15T10:00:00Z"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::DoubleReport));
    }
}
