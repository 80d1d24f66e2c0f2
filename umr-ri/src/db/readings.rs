//! Reading persistence
//!
//! One row per meter observation. Two constraints do the concurrency-critical
//! work at this layer rather than in request code:
//! - UNIQUE(customer_guid, measure_type, month_bucket) rejects a second
//!   reading for the same calendar month even when two submissions race past
//!   the pre-insert window check.
//! - Confirmation is a conditional UPDATE keyed on `confirmed = 0`, so two
//!   concurrent confirmations cannot both succeed.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use umr_common::time;
use uuid::Uuid;

use crate::models::MeasureKind;

/// Reading record
#[derive(Debug, Clone)]
pub struct Reading {
    pub guid: Uuid,
    pub customer_guid: Uuid,
    pub measure_type: MeasureKind,
    pub measure_datetime: DateTime<Utc>,
    pub image_url: String,
    pub measure_value: f64,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl Reading {
    /// New unconfirmed reading carrying a recognition result
    pub fn new(
        customer_guid: Uuid,
        measure_type: MeasureKind,
        measure_datetime: DateTime<Utc>,
        image_url: String,
        measure_value: f64,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            customer_guid,
            measure_type,
            measure_datetime,
            image_url,
            measure_value,
            confirmed: false,
            created_at: time::now(),
        }
    }
}

/// Outcome of an insert attempt
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Lost to an existing reading in the same customer/kind/month bucket
    DuplicatePeriod,
}

/// Insert a new reading. The month bucket is derived from the measurement
/// timestamp; a unique-constraint hit is reported as `DuplicatePeriod`, not
/// as an error.
pub async fn insert_reading(pool: &SqlitePool, reading: &Reading) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO readings (
            guid, customer_guid, measure_type, measure_datetime, month_bucket,
            image_url, measure_value, confirmed, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(reading.guid.to_string())
    .bind(reading.customer_guid.to_string())
    .bind(reading.measure_type.as_str())
    .bind(time::to_db(&reading.measure_datetime))
    .bind(time::month_bucket(reading.measure_datetime))
    .bind(&reading.image_url)
    .bind(reading.measure_value)
    .bind(reading.confirmed)
    .bind(time::to_db(&reading.created_at))
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Ok(InsertOutcome::DuplicatePeriod)
        }
        Err(e) => Err(e.into()),
    }
}

/// The reading, if any, for this customer/kind whose measurement timestamp
/// falls in the half-open window `[start, end)`
pub async fn find_in_window(
    pool: &SqlitePool,
    customer_guid: Uuid,
    kind: MeasureKind,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Option<Reading>> {
    let row = sqlx::query(
        r#"
        SELECT guid, customer_guid, measure_type, measure_datetime,
               image_url, measure_value, confirmed, created_at
        FROM readings
        WHERE customer_guid = ? AND measure_type = ?
          AND measure_datetime >= ? AND measure_datetime < ?
        LIMIT 1
        "#,
    )
    .bind(customer_guid.to_string())
    .bind(kind.as_str())
    .bind(time::to_db(&window.0))
    .bind(time::to_db(&window.1))
    .fetch_optional(pool)
    .await?;

    row.map(|row| reading_from_row(&row)).transpose()
}

/// Load a reading by identifier
pub async fn find_by_id(pool: &SqlitePool, guid: Uuid) -> Result<Option<Reading>> {
    let row = sqlx::query(
        r#"
        SELECT guid, customer_guid, measure_type, measure_datetime,
               image_url, measure_value, confirmed, created_at
        FROM readings WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| reading_from_row(&row)).transpose()
}

/// Confirm a reading, overwriting its value, in a single conditional update.
///
/// Returns false when no unconfirmed row matched: the reading is absent or a
/// concurrent confirmation already won.
pub async fn confirm_reading(pool: &SqlitePool, guid: Uuid, value: f64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE readings SET confirmed = 1, measure_value = ? WHERE guid = ? AND confirmed = 0",
    )
    .bind(value)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All readings for a customer, optionally filtered by kind, most recently
/// created first.
pub async fn list_for_customer(
    pool: &SqlitePool,
    customer_guid: Uuid,
    kind: Option<MeasureKind>,
) -> Result<Vec<Reading>> {
    let rows = match kind {
        Some(kind) => {
            sqlx::query(
                r#"
                SELECT guid, customer_guid, measure_type, measure_datetime,
                       image_url, measure_value, confirmed, created_at
                FROM readings
                WHERE customer_guid = ? AND measure_type = ?
                ORDER BY created_at DESC, rowid DESC
                "#,
            )
            .bind(customer_guid.to_string())
            .bind(kind.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT guid, customer_guid, measure_type, measure_datetime,
                       image_url, measure_value, confirmed, created_at
                FROM readings
                WHERE customer_guid = ?
                ORDER BY created_at DESC, rowid DESC
                "#,
            )
            .bind(customer_guid.to_string())
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(reading_from_row).collect()
}

fn reading_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Reading> {
    let guid: String = row.get("guid");
    let customer_guid: String = row.get("customer_guid");
    let measure_type: String = row.get("measure_type");
    let measure_datetime: String = row.get("measure_datetime");
    let created_at: String = row.get("created_at");

    let Some(measure_type) = MeasureKind::parse_exact(&measure_type) else {
        bail!("unknown measure_type in readings row: {measure_type}");
    };

    Ok(Reading {
        guid: Uuid::parse_str(&guid).context("malformed reading guid")?,
        customer_guid: Uuid::parse_str(&customer_guid).context("malformed customer guid")?,
        measure_type,
        measure_datetime: time::from_db(&measure_datetime)?,
        image_url: row.get("image_url"),
        measure_value: row.get("measure_value"),
        confirmed: row.get("confirmed"),
        created_at: time::from_db(&created_at)?,
    })
}
