use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One vehicle's stay, from entry to exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingRecord {
    pub id: Uuid,
    pub plate_number: String,
    pub entry_time: DateTime<Utc>,
    /// None while the vehicle is still parked
    pub exit_time: Option<DateTime<Utc>>,
    /// Zero until the exit is recorded
    pub fee: Decimal,
}

impl ParkingRecord {
    /// Create an open record
    pub fn new(plate_number: String, entry_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            plate_number,
            entry_time,
            exit_time: None,
            fee: Decimal::ZERO,
        }
    }

    /// Check if the vehicle is still parked
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// The same record closed at `exit_time` with `fee`
    pub(crate) fn closed(&self, exit_time: DateTime<Utc>, fee: Decimal) -> Self {
        Self {
            exit_time: Some(exit_time),
            fee,
            ..self.clone()
        }
    }
}

/// What an open stay would cost if the vehicle left now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub plate_number: String,
    pub entry_time: DateTime<Utc>,
    pub estimated_fee: Decimal,
}
