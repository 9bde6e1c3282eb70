//! Repository for parking spaces

use crate::error::RepositoryError;
use crate::models::{ParkingSpace, SpaceId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;

#[derive(Debug, FromRow)]
struct SpaceRow {
    id: i64,
    occupied: bool,
    plate_number: Option<String>,
    charging: bool,
    charging_started_at: Option<DateTime<Utc>>,
    charging_cost: String,
}

impl TryFrom<SpaceRow> for ParkingSpace {
    type Error = RepositoryError;

    fn try_from(row: SpaceRow) -> Result<Self, Self::Error> {
        let id = SpaceId::try_from(row.id)
            .map_err(|_| RepositoryError::Corrupt(format!("space id {} out of range", row.id)))?;
        let charging_cost = Decimal::from_str(&row.charging_cost).map_err(|e| {
            RepositoryError::Corrupt(format!("space {} charging_cost: {}", id, e))
        })?;

        Ok(ParkingSpace {
            id,
            occupied: row.occupied,
            plate_number: row.plate_number,
            charging: row.charging,
            charging_started_at: row.charging_started_at,
            charging_cost,
        })
    }
}

pub struct SpaceRepository {
    pool: SqlitePool,
}

impl SpaceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create spaces `1..=total` that do not exist yet. Returns how many were created.
    pub async fn ensure_spaces(&self, total: SpaceId) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut created = 0;

        for id in 1..=total {
            let result = sqlx::query("INSERT OR IGNORE INTO parking_spaces (id) VALUES (?)")
                .bind(i64::from(id))
                .execute(&mut *tx)
                .await?;
            created += result.rows_affected();
        }

        tx.commit().await?;
        Ok(created)
    }

    /// All spaces ordered by id
    pub async fn find_all(&self) -> Result<Vec<ParkingSpace>, RepositoryError> {
        let rows = sqlx::query_as::<_, SpaceRow>(
            r#"
            SELECT id, occupied, plate_number, charging, charging_started_at, charging_cost
            FROM parking_spaces
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ParkingSpace::try_from).collect()
    }

    /// Find a space by id
    pub async fn find_by_id(&self, id: SpaceId) -> Result<Option<ParkingSpace>, RepositoryError> {
        let row = sqlx::query_as::<_, SpaceRow>(
            r#"
            SELECT id, occupied, plate_number, charging, charging_started_at, charging_cost
            FROM parking_spaces
            WHERE id = ?
            "#,
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(ParkingSpace::try_from).transpose()
    }

    /// Overwrite a space's occupancy and charging columns inside `conn`'s transaction
    pub async fn save(
        &self,
        conn: &mut SqliteConnection,
        space: &ParkingSpace,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE parking_spaces
            SET occupied = ?, plate_number = ?, charging = ?, charging_started_at = ?, charging_cost = ?
            WHERE id = ?
            "#,
        )
        .bind(space.occupied)
        .bind(space.plate_number.as_deref())
        .bind(space.charging)
        .bind(space.charging_started_at)
        .bind(space.charging_cost.to_string())
        .bind(i64::from(space.id))
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("space {}", space.id)));
        }
        Ok(())
    }
}
