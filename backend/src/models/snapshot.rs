use super::{ParkingRecord, ParkingSpace, SpaceId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Space as shown to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpaceView {
    pub id: SpaceId,
    pub occupied: bool,
    pub plate_number: Option<String>,
    pub charging: bool,
    pub charging_started_at: Option<DateTime<Utc>>,
    pub charging_cost: Decimal,
}

impl From<&ParkingSpace> for ParkingSpaceView {
    fn from(space: &ParkingSpace) -> Self {
        Self {
            id: space.id,
            occupied: space.occupied,
            plate_number: space.plate_number.clone(),
            charging: space.charging,
            charging_started_at: space.charging_started_at,
            charging_cost: space.charging_cost,
        }
    }
}

/// Record as shown to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingRecordView {
    pub id: Uuid,
    pub plate_number: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub fee: Decimal,
    pub open: bool,
}

impl From<&ParkingRecord> for ParkingRecordView {
    fn from(record: &ParkingRecord) -> Self {
        Self {
            id: record.id,
            plate_number: record.plate_number.clone(),
            entry_time: record.entry_time,
            exit_time: record.exit_time,
            fee: record.fee,
            open: record.is_open(),
        }
    }
}

/// Full point-in-time view of the facility. Broadcast whole, never as a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Ordered by space id
    pub spaces: Vec<ParkingSpaceView>,
    /// Ordered by entry time
    pub records: Vec<ParkingRecordView>,
}

impl LedgerSnapshot {
    pub fn space(&self, id: SpaceId) -> Option<&ParkingSpaceView> {
        self.spaces.iter().find(|s| s.id == id)
    }

    pub fn record(&self, id: Uuid) -> Option<&ParkingRecordView> {
        self.records.iter().find(|r| r.id == id)
    }
}
