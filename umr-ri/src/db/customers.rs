//! Customer persistence
//!
//! Customers are created lazily on first reading submission. The upsert is
//! atomic on the unique code column, so concurrent submissions for a new
//! customer cannot create duplicate rows.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Customer record
#[derive(Debug, Clone)]
pub struct Customer {
    pub guid: Uuid,
    pub code: String,
}

/// Look up a customer by external code
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Customer>> {
    let row = sqlx::query("SELECT guid, code FROM customers WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;

    row.map(|row| customer_from_row(&row)).transpose()
}

/// Fetch the customer with this code, creating it if absent.
///
/// INSERT .. ON CONFLICT DO NOTHING followed by a SELECT: when two identical
/// submissions race, one insert wins and both selects see the same row.
pub async fn get_or_create(pool: &SqlitePool, code: &str) -> Result<Customer> {
    sqlx::query(
        "INSERT INTO customers (guid, code, created_at) VALUES (?, ?, ?)
         ON CONFLICT(code) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(code)
    .bind(umr_common::time::to_db(&umr_common::time::now()))
    .execute(pool)
    .await?;

    let row = sqlx::query("SELECT guid, code FROM customers WHERE code = ?")
        .bind(code)
        .fetch_one(pool)
        .await?;

    customer_from_row(&row)
}

fn customer_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
    let guid: String = row.get("guid");
    Ok(Customer {
        guid: Uuid::parse_str(&guid).context("malformed customer guid")?,
        code: row.get("code"),
    })
}
