//! Reading confirmation
//!
//! A reading moves Unconfirmed → Confirmed exactly once. The human-supplied
//! value overwrites the recognition result in the same conditional update
//! that flips the flag; the recognition provider is never consulted again.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::readings;
use crate::error::ApiError;

/// Confirm a reading, overwriting its measured value with the supplied one.
pub async fn confirm_reading(
    db: &SqlitePool,
    id: &str,
    confirmed_value: f64,
) -> Result<(), ApiError> {
    // A malformed identifier cannot name any reading
    let guid = Uuid::parse_str(id).map_err(|_| ApiError::MeasureNotFound)?;

    let reading = readings::find_by_id(db, guid)
        .await?
        .ok_or(ApiError::MeasureNotFound)?;

    if reading.confirmed {
        return Err(ApiError::ConfirmationDuplicate);
    }

    // Conditional update keyed on the unconfirmed state; if a concurrent
    // confirmation got there first, this one loses.
    if !readings::confirm_reading(db, guid, confirmed_value).await? {
        return Err(ApiError::ConfirmationDuplicate);
    }

    tracing::info!(reading = %guid, confirmed_value, "reading confirmed");

    Ok(())
}
