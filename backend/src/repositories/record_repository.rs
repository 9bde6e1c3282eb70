//! Repository for parking records

use crate::error::RepositoryError;
use crate::models::ParkingRecord;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct RecordRow {
    id: Uuid,
    plate_number: String,
    entry_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
    fee: String,
}

impl TryFrom<RecordRow> for ParkingRecord {
    type Error = RepositoryError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let fee = Decimal::from_str(&row.fee)
            .map_err(|e| RepositoryError::Corrupt(format!("record {} fee: {}", row.id, e)))?;

        Ok(ParkingRecord {
            id: row.id,
            plate_number: row.plate_number,
            entry_time: row.entry_time,
            exit_time: row.exit_time,
            fee,
        })
    }
}

pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All records, oldest entry first
    pub async fn find_all(&self) -> Result<Vec<ParkingRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, plate_number, entry_time, exit_time, fee
            FROM parking_records
            ORDER BY entry_time, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ParkingRecord::try_from).collect()
    }

    /// Find a record by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ParkingRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, plate_number, entry_time, exit_time, fee
            FROM parking_records
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ParkingRecord::try_from).transpose()
    }

    /// Insert a new record inside `conn`'s transaction
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        record: &ParkingRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO parking_records (id, plate_number, entry_time, exit_time, fee)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(&record.plate_number)
        .bind(record.entry_time)
        .bind(record.exit_time)
        .bind(record.fee.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Write exit time and fee of a still-open record
    pub async fn close(
        &self,
        conn: &mut SqliteConnection,
        record: &ParkingRecord,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE parking_records
            SET exit_time = ?, fee = ?
            WHERE id = ? AND exit_time IS NULL
            "#,
        )
        .bind(record.exit_time)
        .bind(record.fee.to_string())
        .bind(record.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("open record {}", record.id)));
        }
        Ok(())
    }

    /// Delete a record. Returns false when nothing was deleted.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM parking_records WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
